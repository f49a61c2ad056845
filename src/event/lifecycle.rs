//! Application start and stop events.

use std::env;

use serde::Serialize;
use serde_json::Value;

use crate::event::{Fields, LogEvent, Severity};

/// Environment variables copied onto lifecycle events, as lower-cased fields.
pub const LIFECYCLE_ENV_VARS: [&str; 3] = ["BUILD_NUMBER", "BUILD_HASH", "BUILD_DATE"];

/// Build metadata read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildInfo {
    /// `(field name, value)` pairs, only for non-empty variables.
    entries: Vec<(String, String)>,
}

impl BuildInfo {
    /// Read [`LIFECYCLE_ENV_VARS`] from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read [`LIFECYCLE_ENV_VARS`] through an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let entries = LIFECYCLE_ENV_VARS
            .iter()
            .filter_map(|name| {
                lookup(name)
                    .filter(|v| !v.is_empty())
                    .map(|v| (name.to_lowercase(), v))
            })
            .collect();
        Self { entries }
    }

    pub fn build_number(&self) -> Option<&str> {
        self.get("build_number")
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    fn attach(&self, fields: &mut Fields) {
        for (name, value) in &self.entries {
            fields.insert(name.clone(), value.clone().into());
        }
    }
}

/// Start event, with the configuration flattened into top-level fields.
///
/// Flattening failures are recorded as `parse_error` rather than aborting.
pub fn lifecycle_start<T>(app_name: &str, args: &T, build: &BuildInfo) -> LogEvent
where
    T: Serialize + ?Sized,
{
    let mut fields = Fields::new();

    match serde_json::to_value(args) {
        Ok(Value::Object(map)) => fields.extend(map),
        Ok(Value::Null) => {}
        Ok(other) => {
            fields.insert(
                "parse_error".into(),
                format!("cannot flatten {} into fields", value_kind(&other)).into(),
            );
        }
        Err(e) => {
            fields.insert("parse_error".into(), e.to_string().into());
        }
    }

    fields.insert("type".into(), "lifecycle".into());
    fields.insert("event".into(), "start".into());
    build.attach(&mut fields);

    LogEvent::new(
        fields,
        Severity::Info,
        format!("starting application: {}", app_name),
    )
}

/// Stop event, carrying the signal or error that ended the process.
pub fn lifecycle_stop(
    app_name: &str,
    signal: Option<&str>,
    error: Option<&str>,
    build: &BuildInfo,
) -> LogEvent {
    let mut fields = Fields::new();
    fields.insert("type".into(), "lifecycle".into());
    fields.insert("event".into(), "stop".into());
    if let Some(signal) = signal {
        fields.insert("signal".into(), signal.into());
    }
    if let Some(build_number) = build.build_number() {
        fields.insert("build_number".into(), build_number.into());
    }

    match error {
        Some(error) => {
            fields.insert("error".into(), error.into());
            LogEvent::new(
                fields,
                Severity::Error,
                format!("stopping application: {} ({})", app_name, error),
            )
        }
        None => LogEvent::new(
            fields,
            Severity::Info,
            format!("stopping application: {} ({})", app_name, signal.unwrap_or("none")),
        ),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
