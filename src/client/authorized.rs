use std::fmt;
use std::sync::Arc;

use http::header::{ACCEPT, AUTHORIZATION};
use http::{HeaderValue, Method, StatusCode};
use reqwest::{Request, Response, Url};
use tracing::{debug, warn};

use crate::cache::token_cache::{SlotState, TokenCache};
use crate::client::HttpClient;
use crate::config::credentials::Credentials;
use crate::error::{AuthorizationError, ClientError};
use crate::helpers::time::{Clock, SystemClock};
use crate::observability::metrics::get_metrics;
use crate::sources::oauth2::OAuth2Source;
use crate::utils::constants::JSON_CONTENT_TYPE;

/// HTTP client that sends every request with a bearer token.
///
/// Tokens come from the client credentials grant and are cached until
/// `min(expires_in, ttl) - expiry_buffer` has passed. A 401 answer is turned
/// into [`AuthorizationError`] with code `unauthorized`; the token is not
/// invalidated and the request is not retried. Other non-success statuses
/// become [`ClientError::Status`].
///
/// Clones share the same token cache.
pub struct AuthorizedClient<C: HttpClient> {
    inner: Arc<C>,
    cache: Arc<TokenCache<OAuth2Source<C>>>,
    clock: Arc<dyn Clock>,
}

impl<C: HttpClient> AuthorizedClient<C> {
    pub fn new(credentials: Credentials, client: C) -> Self {
        Self::with_clock(credentials, client, Arc::new(SystemClock))
    }

    pub fn with_clock(credentials: Credentials, client: C, clock: Arc<dyn Clock>) -> Self {
        Self::from_shared(Arc::new(credentials), Arc::new(client), clock)
    }

    /// Token requests and authorized requests go through the same `client`.
    pub fn from_shared(credentials: Arc<Credentials>, client: Arc<C>, clock: Arc<dyn Clock>) -> Self {
        let source = OAuth2Source::new(credentials, client.clone(), clock.clone());
        Self {
            inner: client,
            cache: Arc::new(TokenCache::new(Arc::new(source), clock.clone())),
            clock,
        }
    }

    /// Attach `Authorization: Bearer <token>` and `Accept: application/json`.
    pub async fn authorize(&self, mut request: Request) -> Result<Request, AuthorizationError> {
        let token = self.cache.read().await?;
        let record = if token.record.is_valid_at(self.clock.now()) {
            if token.from_cache {
                get_metrics().await.token_cache_hits.inc();
            }
            token.record
        } else {
            // expired between the read and now (long queueing, clock drift)
            debug!("token expired at {} before use, refreshing", token.record.expires_at);
            self.cache.invalidate_stale(&token);
            self.cache.get_or_refresh().await?
        };

        let headers = request.headers_mut();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers.insert(AUTHORIZATION, record.bearer_header()?);
        Ok(request)
    }

    pub async fn get(&self, url: &str) -> Result<Response, ClientError> {
        self.send(Method::GET, url).await
    }

    pub async fn send(&self, method: Method, url: &str) -> Result<Response, ClientError> {
        let url = Url::parse(url).map_err(|err| ClientError::Transport(Box::new(err)))?;
        HttpClient::execute(self, Request::new(method, url)).await
    }

    pub fn token_state(&self) -> SlotState {
        self.cache.state()
    }

    /// Forget the cached token.
    pub fn invalidate_token(&self) {
        self.cache.invalidate();
    }
}

impl<C: HttpClient> HttpClient for AuthorizedClient<C> {
    type Error = ClientError;

    async fn execute(&self, request: Request) -> Result<Response, ClientError> {
        let request = self.authorize(request).await?;
        let response = self
            .inner
            .execute(request)
            .await
            .map_err(|err| ClientError::Transport(Box::new(err)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("request to '{}' answered 401", response.url());
            get_metrics().await.unauthorized_responses.inc();
            return Err(AuthorizationError::unauthorized().into());
        }
        if !status.is_success() {
            return Err(ClientError::Status {
                status,
                url: response.url().to_string(),
            });
        }
        Ok(response)
    }
}

impl<C: HttpClient> Clone for AuthorizedClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            cache: self.cache.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<C: HttpClient> fmt::Debug for AuthorizedClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedClient")
            .field("token_state", &self.token_state())
            .finish_non_exhaustive()
    }
}
