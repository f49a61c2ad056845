//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files,
//! and every section falls back to its defaults when omitted.

use serde::{Deserialize, Serialize};

use crate::correlation::{CORRELATION_ID_HEADER, USER_CORRELATION_ID_HEADER};
use crate::observability::logging::LogFormat;
use crate::redaction::RedactionPolicy;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Name used in lifecycle events.
    pub app_name: String,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Log threshold and output style.
    pub log: LogConfig,

    /// Correlation header names and minting.
    pub correlation: CorrelationConfig,

    /// Cookie blacklist and anonymized query parameters.
    pub redaction: RedactionPolicy,

    /// Access-log middleware settings.
    pub middleware: MiddlewareConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Metrics exporter settings.
    pub metrics: MetricsConfig,

    /// Upstream called by the demo `/upstream` route.
    pub upstream: UpstreamConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            app_name: "http-telemetry".to_string(),
            listener: ListenerConfig::default(),
            log: LogConfig::default(),
            correlation: CorrelationConfig::default(),
            redaction: RedactionPolicy::default(),
            middleware: MiddlewareConfig::default(),
            timeouts: TimeoutConfig::default(),
            metrics: MetricsConfig::default(),
            upstream: UpstreamConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Minimum severity (debug, info, warning, error).
    pub level: String,

    /// Output style: human-readable text or JSON lines.
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

/// Correlation header configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Header carrying the request correlation id.
    pub header: String,

    /// Header carrying the user correlation id.
    pub user_header: String,

    /// Mint a request correlation id when the header is missing.
    pub mint_missing: bool,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            header: CORRELATION_ID_HEADER.to_string(),
            user_header: USER_CORRELATION_ID_HEADER.to_string(),
            mint_missing: false,
        }
    }
}

/// Access-log middleware configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MiddlewareConfig {
    /// Status answered after a handler panic (0 = leave the response alone).
    pub panic_status: u16,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the Prometheus endpoint.
    pub enabled: bool,

    /// Metrics endpoint bind address.
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Outbound call target.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Absolute http url, e.g. "http://127.0.0.1:3000/status".
    pub url: Option<String>,
}
