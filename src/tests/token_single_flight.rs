// A slow token endpoint and an echo api behind the authorized client:
//  - concurrent requests on a cold cache share one token fetch
//  - a failed fetch reaches the caller, is not cached, the next request fetches again

#[cfg(test)]
mod test {

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use futures::future::join_all;

    use crate::cache::token_cache::SlotState;
    use crate::error::AuthorizationErrorCode;
    use crate::tests::common::{build_reqwest_client, spawn_axum, test_credentials, token_body};
    use crate::AuthorizedClient;

    /// Echoes the authorization header it received.
    fn echo_router() -> Router {
        Router::new().route(
            "/whoami",
            get(|headers: HeaderMap| async move {
                headers
                    .get("authorization")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default()
                    .to_owned()
            }),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_share_one_token_fetch() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let token_router = Router::new().route(
            "/token",
            post(move || {
                let c = counter_clone.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                    tokio::time::sleep(Duration::from_millis(150)).await;
                    Json(token_body(&format!("tok-{n}"), 3600))
                }
            }),
        );
        let (token_h, token_addr) = spawn_axum(token_router).await;
        let (api_h, api_addr) = spawn_axum(echo_router()).await;

        let client = AuthorizedClient::new(
            test_credentials(format!("http://{}/token", token_addr)),
            build_reqwest_client(),
        );
        assert_eq!(client.token_state(), SlotState::Empty);

        let url = format!("http://{}/whoami", api_addr);
        let responses = join_all((0..16).map(|_| {
            let client = client.clone();
            let url = url.clone();
            async move {
                let response = client.get(&url).await.expect("authorized request");
                response.text().await.expect("body")
            }
        }))
        .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(responses.iter().all(|auth| auth == "Bearer tok-1"), "{:?}", responses);
        assert_eq!(client.token_state(), SlotState::Valid);

        token_h.abort();
        api_h.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn failed_fetch_is_not_cached() {
        // token endpoint fails the first attempt then succeeds
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let token_router = Router::new().route(
            "/token",
            post(move || {
                let c = counter_clone.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        (StatusCode::INTERNAL_SERVER_ERROR, "transient".to_owned())
                    } else {
                        (StatusCode::OK, token_body("tok-ok", 3600).to_string())
                    }
                }
            }),
        );
        let (token_h, token_addr) = spawn_axum(token_router).await;
        let (api_h, api_addr) = spawn_axum(echo_router()).await;

        let client = AuthorizedClient::new(
            test_credentials(format!("http://{}/token", token_addr)),
            build_reqwest_client(),
        );
        let url = format!("http://{}/whoami", api_addr);

        // several callers waiting on the failing fetch all see the failure
        let first = join_all((0..4).map(|_| client.get(&url))).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        for outcome in &first {
            let err = outcome.as_ref().unwrap_err();
            assert_eq!(
                err.authorization().map(|e| e.code),
                Some(AuthorizationErrorCode::CredentialsError)
            );
        }
        assert_eq!(client.token_state(), SlotState::Empty);

        let response = client.get(&url).await.expect("second attempt");
        assert_eq!(response.text().await.unwrap(), "Bearer tok-ok");
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        token_h.abort();
        api_h.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn expired_on_use_refresh_stays_single_flight() {
        // every token is already expired on arrival: each caller refreshes once before use
        let fetches = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));
        let (f, i, m) = (fetches.clone(), in_flight.clone(), max_in_flight.clone());
        let token_router = Router::new().route(
            "/token",
            post(move || {
                let (f, i, m) = (f.clone(), i.clone(), m.clone());
                async move {
                    let n = f.fetch_add(1, Ordering::SeqCst) + 1;
                    let now = i.fetch_add(1, Ordering::SeqCst) + 1;
                    m.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(150)).await;
                    i.fetch_sub(1, Ordering::SeqCst);
                    Json(token_body(&format!("tok-{n}"), 0))
                }
            }),
        );
        let (token_h, token_addr) = spawn_axum(token_router).await;
        let (api_h, api_addr) = spawn_axum(echo_router()).await;

        let client = AuthorizedClient::new(
            test_credentials(format!("http://{}/token", token_addr)),
            build_reqwest_client(),
        );
        let url = format!("http://{}/whoami", api_addr);
        let responses = join_all((0..8).map(|_| {
            let client = client.clone();
            let url = url.clone();
            async move { client.get(&url).await.expect("authorized request").text().await.expect("body") }
        }))
        .await;

        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        assert!(responses.iter().all(|auth| auth == "Bearer tok-2"), "{:?}", responses);

        token_h.abort();
        api_h.abort();
    }
}
