//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap an application router in the access-log middleware
//! - Apply the request timeout
//! - Bind server to listener with peer address information
//! - Shut down gracefully on the shutdown signal

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::timeout::TimeoutLayer;

use crate::config::TelemetryConfig;
use crate::http::middleware::AccessLogLayer;
use crate::telemetry::Telemetry;

/// HTTP server serving an application router with access logging.
pub struct HttpServer {
    router: Router,
    config: TelemetryConfig,
}

impl HttpServer {
    /// Create a new HTTP server around `routes`.
    pub fn new(routes: Router, config: TelemetryConfig, telemetry: Telemetry) -> Self {
        let router = Self::build_router(routes, &config, telemetry);
        Self { router, config }
    }

    /// Build the router with all middleware layers.
    ///
    /// The access log is the outermost layer so timeouts are logged too.
    #[allow(deprecated)]
    fn build_router(routes: Router, config: &TelemetryConfig, telemetry: Telemetry) -> Router {
        routes
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(
                AccessLogLayer::new(telemetry).with_panic_status(config.middleware.panic_status),
            )
    }

    /// The fully layered router, e.g. for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}
