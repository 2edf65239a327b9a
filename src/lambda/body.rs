use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

use crate::lambda::request::{ParseError, ProxyRequest};

/// Request body after JSON parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Absent,
    /// Not JSON: the body exactly as received.
    Raw(String),
    /// JSON: the parsed value and the body exactly as received.
    Json { value: Value, raw: String },
}

impl ParsedBody {
    pub fn json(&self) -> Option<&Value> {
        match self {
            ParsedBody::Json { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn raw(&self) -> Option<&str> {
        match self {
            ParsedBody::Absent => None,
            ParsedBody::Raw(raw) | ParsedBody::Json { raw, .. } => Some(raw),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            ParsedBody::Absent => Value::Null,
            ParsedBody::Raw(raw) => Value::String(raw),
            ParsedBody::Json { value, .. } => value,
        }
    }
}

/// `application/json` and any media type with a `+json` suffix, whatever its top-level type.
pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    match content_type.trim().parse::<mime::Mime>() {
        Ok(media) => {
            (media.type_() == mime::APPLICATION && media.subtype() == mime::JSON)
                || media.suffix() == Some(mime::JSON)
        }
        Err(_) => false,
    }
}

/// Parse the body as JSON when the content type says so, decoding base64
/// first when the event is flagged as such. Other bodies pass through as is.
pub fn parse_json_body<T: ProxyRequest>(event: &T) -> Result<ParsedBody, ParseError> {
    let Some(body) = event.body() else {
        return Ok(ParsedBody::Absent);
    };
    if !is_json_content_type(event.header("content-type")) {
        return Ok(ParsedBody::Raw(body.to_owned()));
    }

    let text = if event.is_base64_encoded() {
        String::from_utf8(STANDARD.decode(body)?)?
    } else {
        body.to_owned()
    };
    let value = serde_json::from_str(&text).map_err(ParseError::Json)?;
    Ok(ParsedBody::Json {
        value,
        raw: body.to_owned(),
    })
}
