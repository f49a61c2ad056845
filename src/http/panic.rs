//! Handler panic classification.
//!
//! # Responsibilities
//! - Turn a caught panic payload into a typed fault with a message
//! - Report where the panic was raised as `file:line`
//!
//! # Design Decisions
//! - A process-wide panic hook records the panic location in a
//!   thread-local slot; the hook chains to the previously installed one
//! - The boundary that catches the unwind reads the slot on the same
//!   thread right after the catch, so the location belongs to that panic
//! - Panics raised while a [`BoundaryGuard`] is alive are reported only
//!   through the access-error event; the previous hook (which prints to
//!   stderr) is skipped for them

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic;
use std::sync::Once;

thread_local! {
    static LAST_ORIGIN: RefCell<Option<String>> = const { RefCell::new(None) };
    static BOUNDARY_DEPTH: Cell<usize> = const { Cell::new(0) };
}

static HOOK: Once = Once::new();

/// Origin reported when the panic location could not be determined.
pub const UNKNOWN_ORIGIN: &str = "unknown";

/// Install the origin-recording hook. Idempotent.
pub fn install_origin_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let origin = info
                .location()
                .map(|loc| format!("{}:{}", loc.file(), loc.line()));
            LAST_ORIGIN.with(|slot| *slot.borrow_mut() = origin);
            if !in_boundary() {
                previous(info);
            }
        }));
    });
}

/// Take the origin recorded for the most recent panic on this thread.
pub fn take_origin() -> Option<String> {
    LAST_ORIGIN.with(|slot| slot.borrow_mut().take())
}

/// Put back an origin taken earlier on another poll of the same request.
pub(crate) fn restore_origin(origin: String) {
    LAST_ORIGIN.with(|slot| *slot.borrow_mut() = Some(origin));
}

/// Marks the current thread as running recovered handler code.
///
/// Guards nest; the mark is cleared when the outermost guard drops.
#[derive(Debug)]
pub struct BoundaryGuard {
    _private: (),
}

impl BoundaryGuard {
    pub fn enter() -> Self {
        BOUNDARY_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self { _private: () }
    }
}

impl Drop for BoundaryGuard {
    fn drop(&mut self) {
        BOUNDARY_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Whether a [`BoundaryGuard`] is alive on this thread.
pub fn in_boundary() -> bool {
    BOUNDARY_DEPTH.with(|depth| depth.get() > 0)
}

/// A handler panic recovered at the middleware boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFault {
    pub message: String,
    pub origin: String,
}

impl HandlerFault {
    /// Classify a caught payload, consuming the recorded origin.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Self {
            message: panic_message(payload.as_ref()),
            origin: take_origin().unwrap_or_else(|| UNKNOWN_ORIGIN.to_string()),
        }
    }
}

impl fmt::Display for HandlerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PANIC ({}): {}", self.origin, self.message)
    }
}

impl std::error::Error for HandlerFault {}

/// Text of a panic payload; `panic!` produces `&str` or `String`.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
