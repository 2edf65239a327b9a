//! # OAuth Lambda Library
//!
//! Provides an HTTP client decorator that authorizes every outgoing request
//! with a client-credentials OAuth2 token (cached, refreshed single-flight),
//! and adapters turning serverless events into plain async programs.
//!
//! Modules:
//! - `config`: credentials, settings and YAML loading
//! - `cache`: token record and the single-flight token cache
//! - `sources`: OAuth2 client-credentials token source
//! - `client`: HTTP client capability and the authorized decorator
//! - `lambda`: event adapters, handler lifecycle, batch processing

pub mod config;
pub mod cache;
pub mod sources;
pub mod client;
pub mod error;
pub mod lambda;
pub mod observability;
pub mod helpers;
pub mod utils;
#[cfg(test)]
mod tests;


pub use crate::client::authorized::AuthorizedClient;
pub use crate::client::HttpClient;
pub use crate::config::credentials::{Credentials, Redacted};
pub use crate::error::{AuthorizationError, AuthorizationErrorCode, ClientError};
