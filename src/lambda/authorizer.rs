//! API Gateway custom (Lambda) authorizer.

use std::collections::HashMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::lambda::context::HandlerContext;
use crate::lambda::handler::LambdaHandler;
use crate::lambda::lifecycle::{Lifecycle, Resources};
use crate::lambda::serde_ext::nullable;

pub const TRIGGER: &str = "authorizer";

/// Fail an authorizer program with this to deny with 401.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Error)]
#[error("Unauthorized")]
pub struct Unauthorized;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ApiGatewayAuthorizerEvent {
    Token(TokenAuthorizerEvent),
    Request(RequestAuthorizerEvent),
}

impl ApiGatewayAuthorizerEvent {
    pub fn method_arn(&self) -> &str {
        match self {
            ApiGatewayAuthorizerEvent::Token(event) => &event.method_arn,
            ApiGatewayAuthorizerEvent::Request(event) => &event.method_arn,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAuthorizerEvent {
    pub authorization_token: String,
    pub method_arn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestAuthorizerEvent {
    pub method_arn: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub http_method: String,
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
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerResponse {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<HashMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_identifier_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub action: String,
    pub effect: Effect,
    pub resource: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

impl AuthorizerResponse {
    pub fn allow(principal_id: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::with_effect(principal_id, Effect::Allow, resource)
    }

    pub fn deny(principal_id: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::with_effect(principal_id, Effect::Deny, resource)
    }

    fn with_effect(principal_id: impl Into<String>, effect: Effect, resource: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            policy_document: PolicyDocument {
                version: "2012-10-17".to_owned(),
                statement: vec![Statement {
                    action: "execute-api:Invoke".to_owned(),
                    effect,
                    resource: vec![resource.into()],
                }],
            },
            context: None,
            usage_identifier_key: None,
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Authorizer handler; failing with [`Unauthorized`] reports the platform's
/// `Unauthorized` signal.
pub fn to_handler<R, F, Fut>(
    program: F,
    lifecycle: Lifecycle<R>,
) -> LambdaHandler<ApiGatewayAuthorizerEvent, AuthorizerResponse, R, F>
where
    R: Resources,
    F: Fn(HandlerContext<ApiGatewayAuthorizerEvent, R>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<AuthorizerResponse>> + Send,
{
    LambdaHandler::new(TRIGGER, program, lifecycle)
}
