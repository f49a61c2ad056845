//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the log level, header names and panic status
//! - Validate addresses and the upstream url
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TelemetryConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderName, StatusCode, Uri};
use thiserror::Error;

use crate::config::schema::TelemetryConfig;
use crate::event::Severity;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &TelemetryConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.app_name.trim().is_empty() {
        errors.push(ValidationError::new("app_name", "must not be empty"));
    }

    if config.log.level.parse::<Severity>().is_err() {
        errors.push(ValidationError::new(
            "log.level",
            format!("unknown level {:?}", config.log.level),
        ));
    }

    for (field, name) in [
        ("correlation.header", &config.correlation.header),
        ("correlation.user_header", &config.correlation.user_header),
    ] {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::new(field, format!("invalid header name {:?}", name)));
        }
    }
    if config.correlation.header.eq_ignore_ascii_case(&config.correlation.user_header) {
        errors.push(ValidationError::new(
            "correlation.user_header",
            "must differ from correlation.header",
        ));
    }

    let panic_status = config.middleware.panic_status;
    if panic_status != 0 && StatusCode::from_u16(panic_status).is_err() {
        errors.push(ValidationError::new(
            "middleware.panic_status",
            format!("{} is not a valid status code", panic_status),
        ));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("invalid socket address {:?}", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.metrics.enabled && config.metrics.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "metrics.address",
            format!("invalid socket address {:?}", config.metrics.address),
        ));
    }

    if let Some(url) = &config.upstream.url {
        match url.parse::<Uri>() {
            Ok(uri) if uri.scheme_str() == Some("http") && uri.host().is_some() => {}
            _ => errors.push(ValidationError::new(
                "upstream.url",
                format!("expected an absolute http url, got {:?}", url),
            )),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
