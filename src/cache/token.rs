use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use http::HeaderValue;
use serde::Deserialize;

use crate::error::AuthorizationError;
use crate::helpers::time::add_millis;

/// Body of a successful client credentials token response.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: f64,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Cached access token with the instant it stops being usable.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenRecord {
    access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn new(access_token: String, token_type: String, expires_at: DateTime<Utc>) -> Self {
        Self { access_token, token_type, expires_at }
    }

    /// expires_at = issued_at + min(expires_in, ttl) - expiry_buffer
    pub fn from_response(
        response: TokenResponse,
        issued_at: DateTime<Utc>,
        ttl: Duration,
        expiry_buffer: Duration,
    ) -> Self {
        let declared_ms = if response.expires_in.is_finite() && response.expires_in > 0.0 {
            (response.expires_in * 1000.0).min(i64::MAX as f64) as i64
        } else {
            0
        };
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let buffer_ms = i64::try_from(expiry_buffer.as_millis()).unwrap_or(i64::MAX);
        let lifetime_ms = declared_ms.min(ttl_ms).saturating_sub(buffer_ms);

        Self::new(
            response.access_token,
            response.token_type,
            add_millis(issued_at, lifetime_ms),
        )
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub(crate) fn access_token(&self) -> &str {
        &self.access_token
    }

    /// `Authorization` header value for this token.
    pub(crate) fn bearer_header(&self) -> Result<HeaderValue, AuthorizationError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.access_token))
            .map_err(|_| AuthorizationError::credentials("access token is not a valid header value"))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
