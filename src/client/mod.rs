//! Outbound call reporting.
//!
//! # Responsibilities
//! - Report one call event per outbound request
//! - Provide a tower layer that times client calls automatically
//!
//! # Design Decisions
//! - Reporting never fails and never retries
//! - Correlation ids are read from the outbound request's own headers;
//!   copy them over with `CorrelationIds::apply_to` before sending

use std::fmt;
use std::task::{Context, Poll};

use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use crate::event::{CallResponse, Stopwatch};
use crate::http::request::RequestSnapshot;
use crate::observability::metrics;
use crate::telemetry::Telemetry;

/// Emit the call event for a finished outbound request.
pub fn report_call<B, R>(
    telemetry: &Telemetry,
    req: &Request<B>,
    response: Option<&Response<R>>,
    start: &Stopwatch,
    error: Option<&dyn fmt::Display>,
) {
    let snapshot = RequestSnapshot::from_request(req);
    let response = response.map(CallResponse::from_response);
    record(telemetry, &snapshot, response.as_ref(), start, error);
}

fn record(
    telemetry: &Telemetry,
    snapshot: &RequestSnapshot,
    response: Option<&CallResponse>,
    start: &Stopwatch,
    error: Option<&dyn fmt::Display>,
) {
    telemetry.call(snapshot, response, start, error);

    let outcome = match (error, response) {
        (Some(_), _) => "error".to_string(),
        (None, Some(resp)) => resp.status.to_string(),
        (None, None) => "no_response".to_string(),
    };
    metrics::record_call(snapshot.method.as_str(), &outcome, start.elapsed());
}

/// Layer wrapping HTTP clients in [`CallLog`].
#[derive(Debug, Clone)]
pub struct CallLogLayer {
    telemetry: Telemetry,
}

impl CallLogLayer {
    pub fn new(telemetry: Telemetry) -> Self {
        Self { telemetry }
    }
}

impl<S> Layer<S> for CallLogLayer {
    type Service = CallLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CallLog {
            inner,
            telemetry: self.telemetry.clone(),
        }
    }
}

/// Client service emitting one call event per request.
#[derive(Debug, Clone)]
pub struct CallLog<S> {
    inner: S,
    telemetry: Telemetry,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CallLog<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let telemetry = self.telemetry.clone();
        let snapshot = RequestSnapshot::from_request(&req);
        let start = Stopwatch::start();

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let result = inner.call(req).await;
            match &result {
                Ok(response) => {
                    let response = CallResponse::from_response(response);
                    record(&telemetry, &snapshot, Some(&response), &start, None);
                }
                Err(err) => record(&telemetry, &snapshot, None, &start, Some(err)),
            }
            result
        })
    }
}
