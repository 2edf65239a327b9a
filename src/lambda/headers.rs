use std::collections::HashMap;

use crate::lambda::request::ProxyRequest;

/// Copy of `headers` with lowercased keys.
pub fn normalize_headers(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(key, value)| (key.to_lowercase(), value.clone()))
        .collect()
}

/// Event whose headers were lowercased, original headers kept aside.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub event: T,
    pub raw_headers: HashMap<String, String>,
}

/// Lowercase the header keys of a copy of `event`; `event` is left untouched.
pub fn normalize<T: ProxyRequest>(event: &T) -> Normalized<T> {
    let mut normalized = event.clone();
    *normalized.headers_mut() = normalize_headers(event.headers());
    Normalized {
        event: normalized,
        raw_headers: event.headers().clone(),
    }
}
