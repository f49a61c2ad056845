//! HTTP interception subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → middleware.rs (correlation id, stopwatch, snapshot)
//!     → handler (may panic)
//!     → response.rs (status capture, panic fallback)
//!     → panic.rs (fault message + origin)
//!     → Telemetry (access event)
//!     → Send to client
//! ```

pub mod extract;
pub mod middleware;
pub mod panic;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::{AccessLog, AccessLogLayer};
pub use panic::HandlerFault;
pub use request::RequestSnapshot;
pub use response::ResponseCapture;
pub use server::HttpServer;
