//! Crate-level error types.

use thiserror::Error;

/// Errors raised while setting up telemetry.
///
/// Request handling never returns these; they surface synchronously at
/// startup so a misconfigured service fails fast.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The severity string is not one of debug, info, warning or error.
    #[error("invalid log level: {0:?}")]
    InvalidLevel(String),

    /// The log output style is not `text` or `json`.
    #[error("invalid log format: {0:?}")]
    InvalidFormat(String),

    /// A correlation header name is not a valid HTTP header name.
    #[error("invalid header name: {0:?}")]
    InvalidHeader(String),

    /// A global tracing subscriber was already installed.
    #[error("failed to install log subscriber: {0}")]
    Subscriber(String),
}
