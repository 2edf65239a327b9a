//! Configuration validation with aggregated issues.
//! - Errors make the config unusable, warnings are only logged
//! - Covers credentials identity, token endpoint url, lifetime invariants
//!   and logging settings

use std::time::Duration;

use reqwest::Url;

use crate::config::credentials::Credentials;
use crate::config::settings::SettingsConfig;
use crate::config::types::ServiceConfig;

const ALLOWED_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Public entrypoint: collects every issue instead of stopping at the first one.
pub fn validate_service_config(cfg: &ServiceConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    validate_settings(&cfg.settings, &mut report);
    validate_credentials(&cfg.credentials, &mut report);

    report
}

pub fn validate_credentials(credentials: &Credentials, report: &mut ValidationReport) {
    if credentials.client_id.trim().is_empty() {
        report.errors.push("credentials.client_id must not be empty".to_string());
    }
    if credentials.client_secret.expose().is_empty() {
        report.warnings.push("credentials.client_secret is empty".to_string());
    }

    match Url::parse(&credentials.token_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => report.errors.push(format!(
            "credentials.token_url has unsupported scheme '{}'",
            url.scheme()
        )),
        Err(err) => report.errors.push(format!(
            "credentials.token_url '{}' is not a valid url: {}",
            credentials.token_url, err
        )),
    }

    if credentials.ttl == Some(Duration::ZERO) {
        report.errors.push("credentials.ttl_seconds must be greater than 0".to_string());
    }
    if credentials.expiry_buffer() >= credentials.ttl() {
        report.warnings.push(format!(
            "credentials.expiry_buffer_seconds ({:?}) >= ttl_seconds ({:?}); a token will be fetched for every request",
            credentials.expiry_buffer(),
            credentials.ttl()
        ));
    }
}

fn validate_settings(settings: &SettingsConfig, report: &mut ValidationReport) {
    if settings.http_timeout_ms == Some(0) {
        report.errors.push("settings.http_timeout_ms must be greater than 0".to_string());
    }
    if let Some(logging) = &settings.logging {
        if !ALLOWED_LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            report.errors.push(format!(
                "settings.logging.level '{}' is not one of {:?}",
                logging.level, ALLOWED_LOG_LEVELS
            ));
        }
    }
}
