//! Field builders for access, call, cache-info and application events.

use axum::http::{header, Response};
use serde_json::{Map, Value};

use crate::correlation::CorrelationHeaders;
use crate::event::url::{build_full_url, build_redacted_path, remote_ip, request_cookies};
use crate::event::{Fields, LogEvent, Severity, Stopwatch};
use crate::http::request::RequestSnapshot;
use crate::redaction::RedactionPolicy;

/// Status and content type of a received outbound response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResponse {
    pub status: u16,
    pub content_type: String,
}

impl CallResponse {
    pub fn new(status: u16, content_type: impl Into<String>) -> Self {
        Self {
            status,
            content_type: content_type.into(),
        }
    }

    pub fn from_response<B>(response: &Response<B>) -> Self {
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        Self::new(response.status().as_u16(), content_type)
    }
}

/// Builds event fields against one redaction policy snapshot.
#[derive(Debug, Clone, Copy)]
pub struct EventBuilder<'a> {
    pub policy: &'a RedactionPolicy,
    pub correlation: &'a CorrelationHeaders,
}

impl<'a> EventBuilder<'a> {
    pub fn new(policy: &'a RedactionPolicy, correlation: &'a CorrelationHeaders) -> Self {
        Self { policy, correlation }
    }

    /// Access event for a request that produced a status code.
    pub fn access(&self, req: &RequestSnapshot, start: &Stopwatch, status: u16) -> LogEvent {
        let mut fields = self.access_fields(req, start);
        fields.insert("response_status".into(), status.into());

        let message = if req.has_query() {
            format!("{} ->{} {}?...", status, req.method, req.path())
        } else {
            format!("{} ->{} {}", status, req.method, req.path())
        };

        LogEvent::new(fields, Severity::from_status(status), message)
    }

    /// Access event for a request that failed without a status code.
    pub fn access_error(&self, req: &RequestSnapshot, start: &Stopwatch, error: &str) -> LogEvent {
        let mut fields = self.access_fields(req, start);
        fields.insert("error".into(), error.into());

        let message = format!("ERROR ->{} {}", req.method, req.path());
        LogEvent::new(fields, Severity::Error, message)
    }

    fn access_fields(&self, req: &RequestSnapshot, start: &Stopwatch) -> Fields {
        let mut fields = Fields::new();
        fields.insert("type".into(), "access".into());
        fields.insert("@timestamp".into(), start.timestamp().into());
        fields.insert(
            "remote_ip".into(),
            remote_ip(&req.headers, req.peer_addr.as_deref()).into(),
        );
        fields.insert("host".into(), req.host().into());
        fields.insert("url".into(), build_redacted_path(&req.uri, self.policy).into());
        fields.insert("method".into(), req.method.as_str().into());
        fields.insert("proto".into(), req.proto().into());
        fields.insert("duration".into(), start.elapsed_ms().into());
        fields.insert("User_Agent".into(), req.header(header::USER_AGENT).into());

        self.correlation.extract(&req.headers).attach(&mut fields);

        let cookies: Map<String, Value> = request_cookies(&req.headers)
            .into_iter()
            .filter(|(name, _)| !self.policy.is_cookie_blacklisted(name))
            .map(|(name, value)| (name, Value::String(value)))
            .collect();
        if !cookies.is_empty() {
            fields.insert("cookies".into(), Value::Object(cookies));
        }

        fields
    }

    /// Event for an outbound call.
    ///
    /// An error wins over a response; neither yields a warning.
    pub fn call(
        &self,
        req: &RequestSnapshot,
        response: Option<&CallResponse>,
        start: &Stopwatch,
        error: Option<&str>,
    ) -> LogEvent {
        let full_url = build_full_url(&req.uri, &req.headers, self.policy);

        let mut fields = Fields::new();
        fields.insert("type".into(), "call".into());
        fields.insert("@timestamp".into(), start.timestamp().into());
        fields.insert("host".into(), req.host().into());
        fields.insert("url".into(), build_redacted_path(&req.uri, self.policy).into());
        fields.insert("full_url".into(), full_url.clone().into());
        fields.insert("method".into(), req.method.as_str().into());
        fields.insert("duration".into(), start.elapsed_ms().into());

        self.correlation.extract(&req.headers).attach(&mut fields);

        if let Some(error) = error {
            fields.insert("error".into(), error.into());
            return LogEvent::new(fields, Severity::Error, error);
        }

        match response {
            Some(resp) => {
                fields.insert("response_status".into(), resp.status.into());
                fields.insert("content_type".into(), resp.content_type.clone().into());
                let message = format!("{} {}-> {}", resp.status, req.method, full_url);
                LogEvent::new(fields, Severity::from_status(resp.status), message)
            }
            None => LogEvent::new(fields, Severity::Warning, "call, but no response given"),
        }
    }

    /// Fields every application event of a request starts with.
    pub fn application(&self, headers: &axum::http::HeaderMap) -> Fields {
        let mut fields = Fields::new();
        fields.insert("type".into(), "application".into());
        self.correlation.extract(headers).attach(&mut fields);
        fields
    }
}

/// Debug event recording a cache lookup.
pub fn cache_info(url: &str, hit: bool) -> LogEvent {
    let mut fields = Fields::new();
    fields.insert("type".into(), "cacheinfo".into());
    fields.insert("url".into(), url.into());
    fields.insert("hit".into(), hit.into());

    let message = if hit {
        format!("cache hit: {}", url)
    } else {
        format!("cache miss: {}", url)
    };
    LogEvent::new(fields, Severity::Debug, message)
}
