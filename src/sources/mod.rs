use std::future::Future;

use crate::cache::token::TokenRecord;
use crate::error::AuthorizationError;

pub mod oauth2;

/// Something able to produce a fresh token.
pub trait FetchToken: Send + Sync + 'static {
    fn fetch_token(
        &self,
    ) -> impl Future<Output = Result<TokenRecord, AuthorizationError>> + Send;
}
