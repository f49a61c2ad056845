//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Telemetry events:
//!     → emit::TracingEmitter
//!     → logging.rs (subscriber: level filter, text or JSON)
//!
//! Middleware and client layers:
//!     → metrics.rs (counters, histograms)
//!     → Prometheus scrape endpoint
//! ```

pub mod logging;
pub mod metrics;
