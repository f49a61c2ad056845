//! In-memory emitter for assertions.

use std::sync::{Arc, Mutex};

use crate::emit::Emitter;
use crate::event::{Fields, LogEvent, Severity};

/// Records every emitted event; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CaptureEmitter {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl CaptureEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events captured so far.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Drain the captured events.
    pub fn take(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<LogEvent> {
        self.events.lock().ok().and_then(|e| e.last().cloned())
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events whose `type` field matches.
    pub fn of_type(&self, kind: &str) -> Vec<LogEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.str_field("type") == Some(kind))
            .collect()
    }
}

impl Emitter for CaptureEmitter {
    fn emit(&self, fields: &Fields, severity: Severity, message: &str) {
        let event = LogEvent::new(fields.clone(), severity, message);
        self.events.lock().map(|mut events| events.push(event)).ok();
    }
}
