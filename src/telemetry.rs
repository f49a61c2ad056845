//! The telemetry handle shared by middleware, clients and handlers.
//!
//! Bundles the emitter, the live redaction policy, the correlation header
//! names and the build metadata. Cloning is cheap; all clones share state.

use std::fmt;
use std::sync::Arc;

use axum::http::HeaderMap;
use serde::Serialize;
use serde_json::Value;

use crate::config::TelemetryConfig;
use crate::correlation::CorrelationHeaders;
use crate::emit::Emitter;
use crate::error::TelemetryError;
use crate::event::builder::cache_info;
use crate::event::lifecycle::{lifecycle_start, lifecycle_stop};
use crate::event::{BuildInfo, CallResponse, EventBuilder, Fields, LogEvent, Severity, Stopwatch};
use crate::http::request::RequestSnapshot;
use crate::redaction::{RedactionHandle, RedactionPolicy};

#[derive(Clone)]
pub struct Telemetry {
    inner: Arc<Inner>,
}

struct Inner {
    emitter: Arc<dyn Emitter>,
    redaction: RedactionHandle,
    correlation: CorrelationHeaders,
    build: BuildInfo,
}

impl fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telemetry")
            .field("redaction", &self.inner.redaction)
            .field("correlation", &self.inner.correlation)
            .field("build", &self.inner.build)
            .finish_non_exhaustive()
    }
}

impl Telemetry {
    /// Telemetry with default header names, an empty policy and build
    /// metadata from the environment.
    pub fn new<E: Emitter + 'static>(emitter: E) -> Self {
        Self::builder(emitter).build()
    }

    pub fn builder<E: Emitter + 'static>(emitter: E) -> TelemetryBuilder {
        TelemetryBuilder {
            emitter: Arc::new(emitter),
            redaction: RedactionPolicy::default(),
            correlation: CorrelationHeaders::default(),
            build: None,
        }
    }

    /// Telemetry configured from the `correlation` and `redaction` sections.
    pub fn from_config<E: Emitter + 'static>(
        config: &TelemetryConfig,
        emitter: E,
    ) -> Result<Self, TelemetryError> {
        let correlation =
            CorrelationHeaders::new(&config.correlation.header, &config.correlation.user_header)?
                .with_minting(config.correlation.mint_missing);

        Ok(Self::builder(emitter)
            .redaction(config.redaction.clone())
            .correlation(correlation)
            .build())
    }

    pub fn redaction(&self) -> &RedactionHandle {
        &self.inner.redaction
    }

    pub fn correlation(&self) -> &CorrelationHeaders {
        &self.inner.correlation
    }

    pub fn build_info(&self) -> &BuildInfo {
        &self.inner.build
    }

    /// Hand a built event to the emitter.
    pub fn emit(&self, event: &LogEvent) {
        self.inner.emitter.emit(&event.fields, event.severity, &event.message);
    }

    /// Access event for a completed request.
    pub fn access(&self, req: &RequestSnapshot, start: &Stopwatch, status: u16) {
        let policy = self.inner.redaction.current();
        let event = EventBuilder::new(&policy, &self.inner.correlation).access(req, start, status);
        self.emit(&event);
    }

    /// Access event for a request that ended in an error or panic.
    pub fn access_error(&self, req: &RequestSnapshot, start: &Stopwatch, error: &str) {
        let policy = self.inner.redaction.current();
        let event =
            EventBuilder::new(&policy, &self.inner.correlation).access_error(req, start, error);
        self.emit(&event);
    }

    /// Report an outbound call. Never fails.
    pub fn call(
        &self,
        req: &RequestSnapshot,
        response: Option<&CallResponse>,
        start: &Stopwatch,
        error: Option<&dyn fmt::Display>,
    ) {
        let policy = self.inner.redaction.current();
        let error = error.map(|e| e.to_string());
        let event = EventBuilder::new(&policy, &self.inner.correlation).call(
            req,
            response,
            start,
            error.as_deref(),
        );
        self.emit(&event);
    }

    pub fn cache_info(&self, url: &str, hit: bool) {
        self.emit(&cache_info(url, hit));
    }

    /// Event context for application logs of the request with these headers.
    pub fn application(&self, headers: &HeaderMap) -> EventContext {
        let policy = self.inner.redaction.current();
        let fields = EventBuilder::new(&policy, &self.inner.correlation).application(headers);
        EventContext {
            fields,
            emitter: self.inner.emitter.clone(),
        }
    }

    pub fn lifecycle_start<T: Serialize + ?Sized>(&self, app_name: &str, args: &T) {
        self.emit(&lifecycle_start(app_name, args, &self.inner.build));
    }

    pub fn lifecycle_stop(
        &self,
        app_name: &str,
        signal: Option<&str>,
        error: Option<&dyn fmt::Display>,
    ) {
        let error = error.map(|e| e.to_string());
        self.emit(&lifecycle_stop(
            app_name,
            signal,
            error.as_deref(),
            &self.inner.build,
        ));
    }
}

pub struct TelemetryBuilder {
    emitter: Arc<dyn Emitter>,
    redaction: RedactionPolicy,
    correlation: CorrelationHeaders,
    build: Option<BuildInfo>,
}

impl TelemetryBuilder {
    pub fn redaction(mut self, policy: RedactionPolicy) -> Self {
        self.redaction = policy;
        self
    }

    pub fn correlation(mut self, headers: CorrelationHeaders) -> Self {
        self.correlation = headers;
        self
    }

    pub fn build_info(mut self, build: BuildInfo) -> Self {
        self.build = Some(build);
        self
    }

    pub fn build(self) -> Telemetry {
        Telemetry {
            inner: Arc::new(Inner {
                emitter: self.emitter,
                redaction: RedactionHandle::new(self.redaction),
                correlation: self.correlation,
                build: self.build.unwrap_or_else(BuildInfo::from_env),
            }),
        }
    }
}

/// Pre-populated fields for application logs, emitted at any severity.
#[derive(Clone)]
pub struct EventContext {
    fields: Fields,
    emitter: Arc<dyn Emitter>,
}

impl fmt::Debug for EventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventContext")
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl EventContext {
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn log(&self, severity: Severity, message: &str) {
        self.emitter.emit(&self.fields, severity, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(Severity::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(Severity::Info, message);
    }

    pub fn warning(&self, message: &str) {
        self.log(Severity::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.log(Severity::Error, message);
    }
}
