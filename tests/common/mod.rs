//! Shared utilities for integration tests.

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use http_telemetry::event::BuildInfo;
use http_telemetry::{CaptureEmitter, RedactionPolicy, Telemetry};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// Telemetry writing into a fresh capture buffer.
pub fn capture_telemetry(policy: RedactionPolicy) -> (Telemetry, CaptureEmitter) {
    let capture = CaptureEmitter::new();
    let telemetry = Telemetry::builder(capture.clone())
        .redaction(policy)
        .build_info(BuildInfo::default())
        .build();
    (telemetry, capture)
}

/// The blacklist used throughout the scenarios.
pub fn blacklist(anonymized: &[&str]) -> RedactionPolicy {
    RedactionPolicy::new(
        vec!["ignore".into(), "user_id".into()],
        anonymized.iter().map(|s| s.to_string()).collect(),
    )
}

/// Routes exercising every middleware path.
pub fn app_routes() -> Router {
    Router::new()
        .route("/foo", get(|| async { (StatusCode::CREATED, "created") }))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route("/broken", get(|| async { StatusCode::BAD_GATEWAY }))
        .route("/panic", get(panicking))
}

async fn panicking() -> &'static str {
    panic!("boom")
}

#[allow(dead_code)]
pub fn get_request(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

/// Start a raw TCP backend that answers every request with `status`.
#[allow(dead_code)]
pub async fn start_mock_backend(status: u16, content_type: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let body = "mock";
                        let response = format!(
                            "HTTP/1.1 {} Mock\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            content_type,
                            body.len(),
                            body
                        );
                        let mut buf = [0u8; 1024];
                        let _ = tokio::io::AsyncReadExt::read(&mut socket, &mut buf).await;
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
