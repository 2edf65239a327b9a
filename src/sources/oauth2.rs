use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, Method};
use reqwest::{Body, Request, Url};
use tracing::{debug, info, warn};

use crate::cache::token::{TokenRecord, TokenResponse};
use crate::client::HttpClient;
use crate::config::credentials::Credentials;
use crate::error::AuthorizationError;
use crate::helpers::time::{get_instant, Clock};
use crate::observability::metrics::get_metrics;
use crate::sources::FetchToken;
use crate::utils::constants::{FORM_CONTENT_TYPE, JSON_CONTENT_TYPE};

/// Client credentials grant against `credentials.token_url`.
///
/// Never retries: every failure goes straight back to the caller.
pub struct OAuth2Source<C> {
    credentials: Arc<Credentials>,
    client: Arc<C>,
    clock: Arc<dyn Clock>,
}

impl<C: HttpClient> OAuth2Source<C> {
    pub fn new(credentials: Arc<Credentials>, client: Arc<C>, clock: Arc<dyn Clock>) -> Self {
        Self { credentials, client, clock }
    }

    /// `POST token_url` with the form fields and basic auth of the grant.
    pub fn token_request(&self) -> Result<Request, AuthorizationError> {
        let credentials = &self.credentials;
        let url = Url::parse(&credentials.token_url).map_err(|err| {
            AuthorizationError::client(format!("invalid token url '{}': {}", credentials.token_url, err))
        })?;
        let form = serde_urlencoded::to_string(&credentials.token_form()[..])
            .map_err(|err| AuthorizationError::client(format!("cannot encode token request: {}", err)))?;

        let basic = STANDARD.encode(format!(
            "{}:{}",
            credentials.client_id,
            credentials.client_secret.expose()
        ));
        let mut authorization = HeaderValue::from_str(&format!("Basic {}", basic))
            .map_err(|_| AuthorizationError::client("client id or secret is not a valid header value"))?;
        authorization.set_sensitive(true);

        let mut request = Request::new(Method::POST, url);
        let headers = request.headers_mut();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
        *request.body_mut() = Some(Body::from(form));
        Ok(request)
    }

    async fn request_token(&self) -> Result<TokenRecord, AuthorizationError> {
        let request = self.token_request()?;
        info!("fetching token from '{}'", self.credentials.token_url);

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|err| AuthorizationError::client(format!("token request failed: {}", err)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| AuthorizationError::client(format!("reading token response failed: {}", err)))?;

        if !status.is_success() {
            return Err(AuthorizationError::credentials(format!(
                "token endpoint answered {}: {}",
                status,
                body.chars().take(256).collect::<String>()
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|err| {
            AuthorizationError::credentials(format!("unexpected token response: {}", err))
        })?;
        let record = TokenRecord::from_response(
            token,
            self.clock.now(),
            self.credentials.ttl(),
            self.credentials.expiry_buffer(),
        );
        debug!("token of type '{}' valid until {}", record.token_type, record.expires_at);
        Ok(record)
    }
}

impl<C: HttpClient> FetchToken for OAuth2Source<C> {
    async fn fetch_token(&self) -> Result<TokenRecord, AuthorizationError> {
        let metrics = get_metrics().await;
        let start = get_instant();
        metrics.token_fetch_requests.inc();

        let result = self.request_token().await;
        metrics.token_fetch_duration.observe(start.elapsed().as_secs_f64());
        if let Err(err) = &result {
            warn!("token fetch from '{}' failed: {}", self.credentials.token_url, err);
            metrics.token_fetch_failures.with_label_values(&[err.code.as_str()]).inc();
        }
        result
    }
}
