//! Shared constants and defaults

pub const TTL_SECONDS_DEFAULT: u64 = 3600;
pub const EXPIRY_BUFFER_SECONDS_DEFAULT: u64 = 300;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;

pub const GRANT_TYPE_CLIENT_CREDENTIALS: &str = "client_credentials";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const JSON_CONTENT_TYPE: &str = "application/json";

pub const INTERNAL_SERVER_ERROR_MESSAGE: &str = "Internal Server Error";
