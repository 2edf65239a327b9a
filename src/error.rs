use std::fmt;

use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Why an authorization failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationErrorCode {
    /// The token endpoint answered with something that is not a token.
    CredentialsError,
    /// The token endpoint could not be reached or its response could not be read.
    ClientError,
    /// The authorized request came back with 401.
    Unauthorized,
}

impl AuthorizationErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationErrorCode::CredentialsError => "credentials_error",
            AuthorizationErrorCode::ClientError => "client_error",
            AuthorizationErrorCode::Unauthorized => "unauthorized",
        }
    }
}

impl fmt::Display for AuthorizationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("authorization failed ({code}): {message}")]
pub struct AuthorizationError {
    pub code: AuthorizationErrorCode,
    pub message: String,
}

impl AuthorizationError {
    pub fn new(code: AuthorizationErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn credentials(message: impl Into<String>) -> Self {
        Self::new(AuthorizationErrorCode::CredentialsError, message)
    }

    pub fn client(message: impl Into<String>) -> Self {
        Self::new(AuthorizationErrorCode::ClientError, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(AuthorizationErrorCode::Unauthorized, "Unauthorized")
    }
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of a request sent through [`crate::AuthorizedClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    /// The wrapped client failed; the original error is kept as is.
    #[error("request failed: {0}")]
    Transport(#[source] BoxError),
    #[error("request to {url} failed with status {status}")]
    Status { status: StatusCode, url: String },
}

impl ClientError {
    /// The authorization failure behind this error, if that is what it is.
    pub fn authorization(&self) -> Option<&AuthorizationError> {
        match self {
            ClientError::Authorization(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_authorization_error(&self) -> bool {
        self.authorization().is_some()
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Authorization(AuthorizationError {
                code: AuthorizationErrorCode::Unauthorized,
                ..
            }) => Some(StatusCode::UNAUTHORIZED),
            _ => None,
        }
    }
}
