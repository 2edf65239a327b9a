//! API Gateway HTTP API proxy integration (payload format 2.0).

use std::collections::HashMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::lambda::context::HandlerContext;
use crate::lambda::handler::LambdaHandler;
use crate::lambda::lifecycle::{Lifecycle, Resources};
use crate::lambda::request::ProxyRequest;
use crate::lambda::serde_ext::nullable;
use crate::utils::constants::{INTERNAL_SERVER_ERROR_MESSAGE, JSON_CONTENT_TYPE};

pub const TRIGGER: &str = "http_api";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayV2HttpRequest {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub route_key: String,
    #[serde(default)]
    pub raw_path: String,
    #[serde(default)]
    pub raw_query_string: String,
    #[serde(default)]
    pub cookies: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub path_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub stage_variables: Option<HashMap<String, String>>,
    #[serde(default)]
    pub request_context: Value,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub is_base64_encoded: bool,
}

impl ApiGatewayV2HttpRequest {
    /// HTTP method from the request context.
    pub fn method(&self) -> Option<&str> {
        self.request_context.pointer("/http/method").and_then(Value::as_str)
    }
}

impl ProxyRequest for ApiGatewayV2HttpRequest {
    fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.headers
    }

    fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    fn is_base64_encoded(&self) -> bool {
        self.is_base64_encoded
    }

    fn path_parameters(&self) -> Option<&HashMap<String, String>> {
        self.path_parameters.as_ref()
    }

    fn query_string_parameters(&self) -> Option<&HashMap<String, String>> {
        self.query_string_parameters.as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayV2HttpResponse {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cookies: Vec<String>,
    pub body: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_base64_encoded: bool,
}

impl ApiGatewayV2HttpResponse {
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn json<T: Serialize>(status_code: u16, body: &T) -> serde_json::Result<Self> {
        Ok(Self::new(status_code, serde_json::to_string(body)?)
            .with_header("content-type", JSON_CONTENT_TYPE))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn internal_server_error() -> Self {
        Self::new(500, json!({ "message": INTERNAL_SERVER_ERROR_MESSAGE }).to_string())
    }
}

pub type Handler<R, F> = LambdaHandler<ApiGatewayV2HttpRequest, ApiGatewayV2HttpResponse, R, F>;

/// HTTP API handler; a panicking program answers 500 with a generic message.
pub fn to_handler<R, F, Fut>(program: F, lifecycle: Lifecycle<R>) -> Handler<R, F>
where
    R: Resources,
    F: Fn(HandlerContext<ApiGatewayV2HttpRequest, R>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<ApiGatewayV2HttpResponse>> + Send,
{
    LambdaHandler::new(TRIGGER, program, lifecycle)
        .with_defect_fallback(ApiGatewayV2HttpResponse::internal_server_error)
}
