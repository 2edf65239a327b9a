//! HTTP client capability
//!
//! Anything able to execute a `reqwest::Request`. `reqwest::Client` is the
//! production implementation; the authorized decorator implements it too, so
//! decorated clients compose with everything expecting a plain one.

use std::future::Future;

use reqwest::{Request, Response};

pub mod authorized;

pub trait HttpClient: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, Self::Error>> + Send;
}

impl HttpClient for reqwest::Client {
    type Error = reqwest::Error;

    async fn execute(&self, request: Request) -> Result<Response, reqwest::Error> {
        reqwest::Client::execute(self, request).await
    }
}
