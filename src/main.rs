//! http-telemetry demo service.
//!
//! Serves a small router behind the access-log middleware:
//!
//! ```text
//! GET /             application event + 200
//! GET /health       200
//! GET /cache/{key}  cache-info event (miss first, hit afterwards)
//! GET /panic        handler panic, recovered by the middleware
//! GET /upstream     outbound call to `upstream.url`, reported as a call event
//! ```

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Router,
};
use clap::Parser;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tower::{Layer, ServiceExt};

use http_telemetry::client::{CallLog, CallLogLayer};
use http_telemetry::config::{load_config, watcher};
use http_telemetry::lifecycle::{signals, Shutdown};
use http_telemetry::observability::{logging, metrics};
use http_telemetry::{
    CorrelationIds, EventContext, HttpServer, Telemetry, TelemetryConfig, TracingEmitter,
};

#[derive(Debug, Parser)]
#[command(name = "http-telemetry", about = "Access telemetry demo service")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the redaction policy when the config file changes.
    #[arg(long, requires = "config")]
    watch: bool,
}

#[derive(Clone)]
struct DemoState {
    client: CallLog<Client<HttpConnector, Body>>,
    upstream: Option<Uri>,
    cache: Arc<Mutex<HashSet<String>>>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => TelemetryConfig::default(),
    };

    logging::init_logging(&config.log.level, config.log.format)?;
    let telemetry = Telemetry::from_config(&config, TracingEmitter::new())?;
    telemetry.lifecycle_start(&config.app_name, &config);

    if config.metrics.enabled {
        match config.metrics.address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.metrics.address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the process.
    let _watcher = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (config_watcher, updates) = watcher::ConfigWatcher::new(path);
            let handle = config_watcher.run()?;
            tokio::spawn(watcher::apply_updates(telemetry.clone(), config.clone(), updates));
            Some(handle)
        }
        _ => None,
    };

    let listener = match TcpListener::bind(&config.listener.bind_address).await {
        Ok(l) => l,
        Err(e) => {
            telemetry.lifecycle_stop(&config.app_name, None, Some(&e));
            return Err(e.into());
        }
    };

    let shutdown = Shutdown::new();
    let server = HttpServer::new(
        demo_routes(&config, telemetry.clone()),
        config.clone(),
        telemetry.clone(),
    );
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let (signal, outcome) = tokio::select! {
        signal = signals::wait_for_signal() => {
            shutdown.trigger();
            (Some(signal), (&mut server_task).await)
        }
        outcome = &mut server_task => (None, outcome),
    };

    let error: Option<String> = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(e) => Some(e.to_string()),
    };
    telemetry.lifecycle_stop(
        &config.app_name,
        signal,
        error.as_ref().map(|e| e as &dyn fmt::Display),
    );

    Ok(())
}

fn demo_routes(config: &TelemetryConfig, telemetry: Telemetry) -> Router {
    let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
    let upstream = config.upstream.url.as_deref().and_then(|u| u.parse().ok());

    let state = DemoState {
        client: CallLogLayer::new(telemetry.clone()).layer(client),
        upstream,
        cache: Arc::new(Mutex::new(HashSet::new())),
    };

    Router::new()
        .route("/", get(index))
        .route("/health", get(|| async { StatusCode::OK }))
        .route("/cache/{key}", get(cached))
        .route("/panic", get(panicking))
        .route("/upstream", get(call_upstream))
        .with_state(state)
}

async fn index(log: EventContext) -> &'static str {
    log.info("serving index");
    "http-telemetry demo\n"
}

async fn cached(
    State(state): State<DemoState>,
    Extension(telemetry): Extension<Telemetry>,
    Path(key): Path<String>,
) -> String {
    let hit = match state.cache.lock() {
        Ok(mut cache) => !cache.insert(key.clone()),
        Err(_) => false,
    };
    telemetry.cache_info(&format!("/cache/{}", key), hit);
    format!("{}\n", if hit { "hit" } else { "miss" })
}

async fn panicking() -> &'static str {
    panic!("boom")
}

async fn call_upstream(
    State(state): State<DemoState>,
    Extension(telemetry): Extension<Telemetry>,
    ids: CorrelationIds,
    log: EventContext,
) -> Response {
    let Some(uri) = state.upstream.clone() else {
        return (StatusCode::NOT_FOUND, "No upstream configured").into_response();
    };

    let mut req = match Request::get(uri).body(Body::empty()) {
        Ok(r) => r,
        Err(e) => {
            log.error(&format!("cannot build upstream request: {}", e));
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    ids.apply_to(req.headers_mut(), telemetry.correlation());

    match state.client.clone().oneshot(req).await {
        Ok(response) => (response.status(), "Upstream answered\n").into_response(),
        Err(_) => (StatusCode::BAD_GATEWAY, "Upstream request failed\n").into_response(),
    }
}
