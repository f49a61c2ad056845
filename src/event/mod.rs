//! Structured event model.
//!
//! # Data Flow
//! ```text
//! request snapshot + timing + status/error
//!     → builder.rs (access, call, cache-info, application fields)
//!     → lifecycle.rs (start/stop fields)
//!     → url.rs (redacted path, full url, remote ip, cookies)
//!     → LogEvent { fields, severity, message }
//!     → Emitter
//! ```
//!
//! # Design Decisions
//! - Builders are pure: they read a policy snapshot and return a value
//! - Redaction happens while fields are built, before any emitter sees them
//! - Durations use a monotonic clock, timestamps use wall-clock UTC

pub mod builder;
pub mod lifecycle;
pub mod severity;
pub mod url;

use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

pub use builder::{CallResponse, EventBuilder};
pub use lifecycle::BuildInfo;
pub use severity::Severity;

/// Field mapping of one event.
pub type Fields = Map<String, Value>;

/// A fully built event, ready for an emitter.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub fields: Fields,
    pub severity: Severity,
    pub message: String,
}

impl LogEvent {
    pub fn new(fields: Fields, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            fields,
            severity,
            message: message.into(),
        }
    }

    /// Field value as a string, if present and a string.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Field value as an unsigned integer, if present and numeric.
    pub fn u64_field(&self, name: &str) -> Option<u64> {
        self.fields.get(name).and_then(Value::as_u64)
    }
}

/// Start of a timed operation.
///
/// Keeps both a wall-clock timestamp for `@timestamp` and a monotonic
/// instant so `duration` can never go negative.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started_at: DateTime<Utc>,
    started: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// A stopwatch that was started `elapsed` ago.
    pub fn started_ago(elapsed: Duration) -> Self {
        let now = Instant::now();
        let offset = chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            started_at: Utc::now() - offset,
            started: now.checked_sub(elapsed).unwrap_or(now),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// RFC 3339 start timestamp with millisecond precision.
    pub fn timestamp(&self) -> String {
        self.started_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whole milliseconds since start.
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::start()
    }
}
