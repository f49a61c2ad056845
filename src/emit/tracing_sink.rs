//! Emitter backed by the `tracing` crate.

use serde_json::Value;

use crate::emit::Emitter;
use crate::event::{Fields, Severity};

/// Target used for every forwarded event, so it can be filtered on its own.
pub const EVENT_TARGET: &str = "http_telemetry::event";

/// Forwards events to the installed `tracing` subscriber.
///
/// The keys most often filtered on (`event_type`, correlation ids, `url`,
/// `method`, `response_status`, `duration`, `error`) are recorded as
/// top-level tracing fields, so the JSON formatter writes them as plain
/// keys. The complete field mapping is recorded as a JSON string under
/// `fields`. The subscriber decides the threshold and the output style.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEmitter;

impl TracingEmitter {
    pub fn new() -> Self {
        Self
    }
}

macro_rules! forward {
    ($level:expr, $fields:expr, $message:expr) => {{
        let fields: &Fields = $fields;
        tracing::event!(
            target: EVENT_TARGET,
            $level,
            event_type = str_field(fields, "type"),
            correlation_id = str_field(fields, "correlation_id"),
            user_correlation_id = str_field(fields, "user_correlation_id"),
            url = str_field(fields, "url"),
            method = str_field(fields, "method"),
            response_status = u64_field(fields, "response_status"),
            duration = u64_field(fields, "duration"),
            error = str_field(fields, "error"),
            fields = %serde_json::Value::Object(fields.clone()),
            "{}",
            $message
        )
    }};
}

impl Emitter for TracingEmitter {
    fn emit(&self, fields: &Fields, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => forward!(tracing::Level::DEBUG, fields, message),
            Severity::Info => forward!(tracing::Level::INFO, fields, message),
            Severity::Warning => forward!(tracing::Level::WARN, fields, message),
            Severity::Error => forward!(tracing::Level::ERROR, fields, message),
        }
    }
}

fn str_field<'a>(fields: &'a Fields, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str)
}

fn u64_field(fields: &Fields, key: &str) -> Option<u64> {
    fields.get(key).and_then(Value::as_u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` under a JSON subscriber and return the written lines.
    fn json_lines(f: impl FnOnce()) -> Vec<Value> {
        let buffer = Buffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .flatten_event(true)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, f);

        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn access_fields() -> Fields {
        let Value::Object(fields) = json!({
            "type": "access",
            "correlation_id": "correlation-123",
            "url": "/foo?q=*****",
            "method": "GET",
            "response_status": 201,
            "duration": 12,
            "cookies": {"foo": "bar"},
        }) else {
            unreachable!()
        };
        fields
    }

    #[test]
    fn test_severity_maps_to_level() {
        let fields = access_fields();
        let lines = json_lines(|| {
            let emitter = TracingEmitter::new();
            emitter.emit(&fields, Severity::Debug, "one");
            emitter.emit(&fields, Severity::Info, "two");
            emitter.emit(&fields, Severity::Warning, "three");
            emitter.emit(&fields, Severity::Error, "four");
        });

        let levels: Vec<_> = lines.iter().map(|l| l["level"].as_str().unwrap()).collect();
        assert_eq!(levels, ["DEBUG", "INFO", "WARN", "ERROR"]);
        let messages: Vec<_> = lines.iter().map(|l| l["message"].as_str().unwrap()).collect();
        assert_eq!(messages, ["one", "two", "three", "four"]);
        assert!(lines.iter().all(|l| l["target"] == EVENT_TARGET));
    }

    #[test]
    fn test_fields_are_carried() {
        let fields = access_fields();
        let lines = json_lines(|| {
            TracingEmitter::new().emit(&fields, Severity::Info, "201 ->GET /foo?...");
        });
        let line = &lines[0];

        // Common keys are top-level values.
        assert_eq!(line["event_type"], "access");
        assert_eq!(line["correlation_id"], "correlation-123");
        assert_eq!(line["url"], "/foo?q=*****");
        assert_eq!(line["method"], "GET");
        assert_eq!(line["response_status"], 201);
        assert_eq!(line["duration"], 12);
        assert!(line.get("user_correlation_id").is_none());
        assert!(line.get("error").is_none());

        // The full mapping, nested values included, is a JSON string.
        let full: Value = serde_json::from_str(line["fields"].as_str().unwrap()).unwrap();
        assert_eq!(full, Value::Object(fields));
    }
}
