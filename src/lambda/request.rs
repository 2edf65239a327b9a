use std::collections::HashMap;
use std::string::FromUtf8Error;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::lambda::body::parse_json_body;
use crate::lambda::headers::{normalize, normalize_headers};

/// Parsing failure of request data, surfaced to the program.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("request body is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("request body is not valid utf-8: {0}")]
    Utf8(#[from] FromUtf8Error),
    #[error("request body is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("{target} does not match the expected shape: {source}")]
    Schema {
        target: &'static str,
        source: serde_json::Error,
    },
}

/// Common view over HTTP proxy events (REST API v1 and HTTP API v2).
pub trait ProxyRequest: Clone {
    fn headers(&self) -> &HashMap<String, String>;
    fn headers_mut(&mut self) -> &mut HashMap<String, String>;
    fn body(&self) -> Option<&str>;
    fn is_base64_encoded(&self) -> bool;
    fn path_parameters(&self) -> Option<&HashMap<String, String>>;
    fn query_string_parameters(&self) -> Option<&HashMap<String, String>>;

    /// Header value, whatever the casing of its name.
    fn header(&self, name: &str) -> Option<&str> {
        self.headers()
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Headers with lowercased names.
    fn normalized_headers(&self) -> HashMap<String, String> {
        normalize_headers(self.headers())
    }
}

/// Normalize headers, parse the JSON body and deserialize it into `T`.
/// A missing body deserializes from `null`, a non-JSON body from its text.
pub fn schema_body_json<T, Req>(event: &Req) -> Result<T, ParseError>
where
    T: DeserializeOwned,
    Req: ProxyRequest,
{
    let normalized = normalize(event);
    let body = parse_json_body(&normalized.event)?.into_value();
    serde_json::from_value(body).map_err(|source| ParseError::Schema { target: "body", source })
}

pub fn schema_path_params<T, Req>(event: &Req) -> Result<T, ParseError>
where
    T: DeserializeOwned,
    Req: ProxyRequest,
{
    decode_params("path parameters", event.path_parameters())
}

pub fn schema_query_params<T, Req>(event: &Req) -> Result<T, ParseError>
where
    T: DeserializeOwned,
    Req: ProxyRequest,
{
    decode_params("query parameters", event.query_string_parameters())
}

fn decode_params<T: DeserializeOwned>(
    target: &'static str,
    params: Option<&HashMap<String, String>>,
) -> Result<T, ParseError> {
    let object: serde_json::Map<String, Value> = params
        .into_iter()
        .flatten()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    serde_json::from_value(Value::Object(object)).map_err(|source| ParseError::Schema { target, source })
}
