use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::utils::constants::{EXPIRY_BUFFER_SECONDS_DEFAULT, TTL_SECONDS_DEFAULT};

/// Value that never shows up in logs. Deserializable, never serializable.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Redacted<T = String>(T);

impl<T> Redacted<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> fmt::Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> fmt::Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl From<String> for Redacted<String> {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Redacted<String> {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// ================================
/// Client credentials grant configuration
/// ================================
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: Redacted<String>,
    pub token_url: String,
    pub scope: Option<String>,
    pub audience: Option<String>,
    /// upper bound for the token lifetime, whatever the server declares
    #[serde(default, rename = "ttl_seconds", deserialize_with = "seconds")]
    pub ttl: Option<Duration>,
    /// token is treated as expired this long before it really is
    #[serde(default, rename = "expiry_buffer_seconds", deserialize_with = "seconds")]
    pub expiry_buffer: Option<Duration>,
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<Redacted<String>>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: token_url.into(),
            scope: None,
            audience: None,
            ttl: None,
            expiry_buffer: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_expiry_buffer(mut self, expiry_buffer: Duration) -> Self {
        self.expiry_buffer = Some(expiry_buffer);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl.unwrap_or(Duration::from_secs(TTL_SECONDS_DEFAULT))
    }

    pub fn expiry_buffer(&self) -> Duration {
        self.expiry_buffer
            .unwrap_or(Duration::from_secs(EXPIRY_BUFFER_SECONDS_DEFAULT))
    }

    /// Form fields of the token request, unset values sent as empty strings.
    pub fn token_form(&self) -> [(&'static str, &str); 3] {
        [
            ("grant_type", crate::utils::constants::GRANT_TYPE_CLIENT_CREDENTIALS),
            ("scope", self.scope.as_deref().unwrap_or("")),
            ("audience", self.audience.as_deref().unwrap_or("")),
        ]
    }
}

/// Whole seconds in YAML, `Duration` once loaded.
fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
}
