//! Response status capture.
//!
//! # Responsibilities
//! - Record the status code a handler ultimately answered with
//! - Build the fallback response after a recovered panic
//!
//! # Design Decisions
//! - A response that never set a status counts as 200
//! - The first observed status wins; later observations are ignored

use axum::http::{Response, StatusCode};

/// Per-request record of the written status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseCapture {
    status: StatusCode,
    observed: bool,
}

impl Default for ResponseCapture {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            observed: false,
        }
    }
}

impl ResponseCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a status explicitly set by the handler.
    pub fn set_status(&mut self, status: StatusCode) {
        if !self.observed {
            self.status = status;
            self.observed = true;
        }
    }

    /// Record the status of the response the handler returned.
    pub fn observe<B>(&mut self, response: &Response<B>) {
        self.set_status(response.status());
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_observed(&self) -> bool {
        self.observed
    }
}

/// Response sent after a handler panic.
///
/// `panic_status` of 0 (or an invalid code) leaves the status at the
/// default 200 with an empty body.
pub fn fallback_response<B: Default>(panic_status: u16) -> Response<B> {
    let mut response = Response::new(B::default());
    if panic_status != 0 {
        match StatusCode::from_u16(panic_status) {
            Ok(status) => *response.status_mut() = status,
            Err(_) => tracing::warn!(panic_status, "Ignoring invalid panic status"),
        }
    }
    response
}
