//! HTTP access telemetry.
//!
//! Structured access, call, cache-info, application and lifecycle events
//! for axum/tower services, with correlation-id propagation, cookie and
//! query-parameter redaction, and panic recovery that still produces a
//! well-formed access event.

pub mod client;
pub mod config;
pub mod correlation;
pub mod emit;
pub mod error;
pub mod event;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod redaction;
pub mod telemetry;

pub use config::TelemetryConfig;
pub use correlation::{CorrelationHeaders, CorrelationIds};
pub use emit::{CaptureEmitter, Emitter, TracingEmitter};
pub use error::TelemetryError;
pub use event::{LogEvent, Severity, Stopwatch};
pub use http::{AccessLogLayer, HttpServer};
pub use redaction::{RedactionHandle, RedactionPolicy};
pub use telemetry::{EventContext, Telemetry};
