//! Event emitters.
//!
//! # Responsibilities
//! - Define the sink contract events are handed to
//! - Forward events to `tracing` in production
//! - Capture events in memory for tests
//!
//! # Design Decisions
//! - Emitting never fails from the caller's point of view; sink problems
//!   stay inside the sink and never block request handling
//! - Severity filtering and output style belong to the sink

pub mod capture;
pub mod tracing_sink;

use std::sync::Arc;

use crate::event::{Fields, Severity};

pub use capture::CaptureEmitter;
pub use tracing_sink::TracingEmitter;

/// Destination for built events.
pub trait Emitter: Send + Sync {
    fn emit(&self, fields: &Fields, severity: Severity, message: &str);
}

impl<E: Emitter + ?Sized> Emitter for Arc<E> {
    fn emit(&self, fields: &Fields, severity: Severity, message: &str) {
        (**self).emit(fields, severity, message)
    }
}

impl<E: Emitter + ?Sized> Emitter for Box<E> {
    fn emit(&self, fields: &Fields, severity: Severity, message: &str) {
        (**self).emit(fields, severity, message)
    }
}
