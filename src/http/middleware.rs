//! Access-log middleware.
//!
//! # Responsibilities
//! - Propagate (or mint) the correlation id before the handler runs
//! - Time the request and capture the status it was answered with
//! - Recover handler panics and still emit a well-formed access event
//! - Expose correlation ids and the telemetry handle to handlers
//!
//! # Design Decisions
//! - Panics are caught by `tower_http`'s `CatchPanic` around the inner
//!   service; its panic response carries the [`HandlerFault`] back out
//! - Exactly one access event per request
//! - After a panic the response is the configured fallback status, or
//!   an empty 200 when none is configured

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes, HttpBody};
use axum::http::{Request, Response};
use axum::BoxError;
use futures_util::future::{poll_fn, BoxFuture};
use tower::{Layer, Service};
use tower_http::catch_panic::{CatchPanic, CatchPanicLayer, ResponseForPanic};

use crate::event::Stopwatch;
use crate::http::panic::{
    install_origin_hook, restore_origin, take_origin, BoundaryGuard, HandlerFault,
};
use crate::http::request::RequestSnapshot;
use crate::http::response::{fallback_response, ResponseCapture};
use crate::observability::metrics;
use crate::telemetry::Telemetry;

/// Layer wrapping services in [`AccessLog`].
#[derive(Debug, Clone)]
pub struct AccessLogLayer {
    telemetry: Telemetry,
    panic_status: u16,
}

impl AccessLogLayer {
    /// Create the layer. Installs the panic origin hook on first use.
    pub fn new(telemetry: Telemetry) -> Self {
        install_origin_hook();
        Self {
            telemetry,
            panic_status: 0,
        }
    }

    /// Answer with `status` when a handler panics (0 disables).
    pub fn with_panic_status(mut self, status: u16) -> Self {
        self.panic_status = status;
        self
    }
}

impl<S> Layer<S> for AccessLogLayer {
    type Service = AccessLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        let responder = PanicResponder {
            panic_status: self.panic_status,
        };
        AccessLog {
            inner: CatchPanicLayer::custom(responder).layer(inner),
            telemetry: self.telemetry.clone(),
        }
    }
}

/// Builds the fallback response for a caught panic and tags it with the fault.
#[derive(Debug, Clone, Copy)]
pub struct PanicResponder {
    panic_status: u16,
}

impl ResponseForPanic for PanicResponder {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response<Body> {
        let fault = HandlerFault::from_panic(err);
        let mut response = fallback_response::<Body>(self.panic_status);
        response.extensions_mut().insert(fault);
        response
    }
}

/// Service emitting one access event per request.
#[derive(Debug, Clone)]
pub struct AccessLog<S> {
    inner: CatchPanic<S, PanicResponder>,
    telemetry: Telemetry,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for AccessLog<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    ReqBody: Send + 'static,
    ResBody: HttpBody<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    type Response = <CatchPanic<S, PanicResponder> as Service<Request<ReqBody>>>::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let telemetry = self.telemetry.clone();

        let correlation = telemetry.correlation();
        correlation.ensure_correlation_id(req.headers_mut());
        let ids = correlation.extract(req.headers());
        req.extensions_mut().insert(ids);
        req.extensions_mut().insert(telemetry.clone());

        let start = Stopwatch::start();
        let snapshot = RequestSnapshot::from_request(&req);

        // Use the service that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        // A panic while building the future is answered on the first poll,
        // possibly on another thread; carry its origin over.
        let (future, mut early_origin) = {
            let _boundary = BoundaryGuard::enter();
            take_origin();
            let future = inner.call(req);
            (future, take_origin())
        };

        Box::pin(async move {
            let mut future = std::pin::pin!(future);
            let result = poll_fn(|cx| {
                let _boundary = BoundaryGuard::enter();
                if let Some(origin) = early_origin.take() {
                    restore_origin(origin);
                }
                future.as_mut().poll(cx)
            })
            .await;

            match result {
                Ok(mut response) => {
                    if let Some(fault) = response.extensions_mut().remove::<HandlerFault>() {
                        telemetry.access_error(&snapshot, &start, &fault.to_string());
                        metrics::record_panic();
                        return Ok(response);
                    }

                    let mut capture = ResponseCapture::new();
                    capture.observe(&response);
                    let status = capture.status().as_u16();

                    telemetry.access(&snapshot, &start, status);
                    metrics::record_request(snapshot.method.as_str(), status, start.elapsed());
                    Ok(response)
                }
                Err(err) => {
                    telemetry.access_error(&snapshot, &start, &err.to_string());
                    Err(err)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::CaptureEmitter;
    use crate::event::{BuildInfo, Severity};
    use std::convert::Infallible;
    use tower::{service_fn, ServiceExt};

    fn telemetry() -> (Telemetry, CaptureEmitter) {
        let capture = CaptureEmitter::new();
        let telemetry = Telemetry::builder(capture.clone())
            .build_info(BuildInfo::default())
            .build();
        (telemetry, capture)
    }

    #[tokio::test]
    async fn test_logs_status_of_plain_service() {
        let (telemetry, capture) = telemetry();
        let svc = AccessLogLayer::new(telemetry).layer(service_fn(|_req: Request<String>| async {
            Ok::<_, Infallible>(Response::builder().status(204).body(String::new()).unwrap())
        }));

        let resp = svc
            .oneshot(Request::get("/items").body(String::new()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), 204);
        let event = capture.last().unwrap();
        assert_eq!(event.message, "204 ->GET /items");
        assert_eq!(event.severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_panic_while_building_future() {
        let (telemetry, capture) = telemetry();
        let svc = AccessLogLayer::new(telemetry)
            .with_panic_status(500)
            .layer(service_fn(|_req: Request<String>| -> futures_util::future::Ready<Result<Response<String>, Infallible>> {
                panic!("sync boom")
            }));

        let resp = svc
            .oneshot(Request::get("/sync").body(String::new()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), 500);
        let event = capture.last().unwrap();
        assert_eq!(event.message, "ERROR ->GET /sync");
        let error = event.str_field("error").unwrap();
        assert!(error.starts_with("PANIC ("), "{error}");
        assert!(error.ends_with("): sync boom"), "{error}");
        assert!(error.contains("middleware.rs:"), "{error}");
    }

    #[tokio::test]
    async fn test_panic_while_polling_future() {
        let (telemetry, capture) = telemetry();
        let svc = AccessLogLayer::new(telemetry).layer(service_fn(|_req: Request<String>| async {
            if true {
                panic!("async boom");
            }
            Ok::<_, Infallible>(Response::new(String::new()))
        }));

        let resp = svc
            .oneshot(Request::get("/async").body(String::new()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        assert!(resp.extensions().get::<HandlerFault>().is_none());
        assert_eq!(capture.len(), 1);
        let event = capture.last().unwrap();
        assert_eq!(event.message, "ERROR ->GET /async");
        let error = event.str_field("error").unwrap();
        assert!(error.ends_with("): async boom"), "{error}");
        assert!(error.contains("middleware.rs:"), "{error}");
    }

    #[tokio::test]
    async fn test_service_error_is_logged_and_propagated() {
        let (telemetry, capture) = telemetry();
        let svc = AccessLogLayer::new(telemetry).layer(service_fn(|_req: Request<String>| async {
            Err::<Response<String>, _>(std::io::Error::other("backend gone"))
        }));

        let err = svc
            .oneshot(Request::post("/orders").body(String::new()).unwrap())
            .await
            .err().unwrap();

        assert_eq!(err.to_string(), "backend gone");
        let event = capture.last().unwrap();
        assert_eq!(event.severity, Severity::Error);
        assert_eq!(event.message, "ERROR ->POST /orders");
        assert_eq!(event.str_field("error"), Some("backend gone"));
    }

    #[tokio::test]
    async fn test_minted_id_visible_to_handler_and_event() {
        let capture = CaptureEmitter::new();
        let telemetry = Telemetry::builder(capture.clone())
            .correlation(crate::correlation::CorrelationHeaders::default().with_minting(true))
            .build_info(BuildInfo::default())
            .build();

        let svc = AccessLogLayer::new(telemetry).layer(service_fn(|req: Request<String>| async move {
            let id = req
                .headers()
                .get("x-correlation-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            Ok::<_, Infallible>(
                Response::builder()
                    .header("x-seen-id", id)
                    .body(String::new())
                    .unwrap(),
            )
        }));

        let resp = svc
            .oneshot(Request::get("/").body(String::new()).unwrap())
            .await
            .unwrap();

        let handler_id = resp.headers()["x-seen-id"].to_str().unwrap().to_string();
        assert_eq!(handler_id.len(), 10);
        assert_eq!(
            capture.last().unwrap().str_field("correlation_id"),
            Some(handler_id.as_str())
        );
    }
}
