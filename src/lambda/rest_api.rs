//! API Gateway REST API proxy integration (payload format 1.0).

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

pub const TRIGGER: &str = "rest_api";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayProxyRequest {
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub http_method: String,
    #[serde(default, deserialize_with = "nullable")]
    pub headers: HashMap<String, String>,
    #[serde(default, deserialize_with = "nullable")]
    pub multi_value_headers: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub multi_value_query_string_parameters: Option<HashMap<String, Vec<String>>>,
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

impl ProxyRequest for ApiGatewayProxyRequest {
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
pub struct ApiGatewayProxyResponse {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub multi_value_headers: HashMap<String, Vec<String>>,
    pub body: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_base64_encoded: bool,
}

impl ApiGatewayProxyResponse {
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
            ..Self::default()
        }
    }

    /// JSON body with a matching `content-type`.
    pub fn json<T: Serialize>(status_code: u16, body: &T) -> serde_json::Result<Self> {
        Ok(Self::new(status_code, serde_json::to_string(body)?)
            .with_header("content-type", JSON_CONTENT_TYPE))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// What the caller sees when the program panics.
    pub fn internal_server_error() -> Self {
        Self::new(500, json!({ "message": INTERNAL_SERVER_ERROR_MESSAGE }).to_string())
    }
}

pub type Handler<R, F> = LambdaHandler<ApiGatewayProxyRequest, ApiGatewayProxyResponse, R, F>;

/// REST API handler; a panicking program answers 500 with a generic message.
pub fn to_handler<R, F, Fut>(program: F, lifecycle: Lifecycle<R>) -> Handler<R, F>
where
    R: Resources,
    F: Fn(HandlerContext<ApiGatewayProxyRequest, R>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<ApiGatewayProxyResponse>> + Send,
{
    LambdaHandler::new(TRIGGER, program, lifecycle)
        .with_defect_fallback(ApiGatewayProxyResponse::internal_server_error)
}
