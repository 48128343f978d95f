//! HTTP server setup.
//!
//! # Responsibilities
//! - Wrap the application router with server-wide layers
//!   (timeout, request ID, tracing)
//! - Serve it on a bound listener with client addresses attached
//! - Stop gracefully when the shutdown channel fires

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AutoRouterConfig;
use crate::lifecycle::ShutdownSignal;

/// HTTP server for an auto router application.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Wrap `app` with the server-wide middleware stack.
    pub fn new(config: &AutoRouterConfig, app: Router) -> Self {
        Self {
            router: Self::build_router(config, app),
        }
    }

    #[allow(deprecated)]
    fn build_router(config: &AutoRouterConfig, app: Router) -> Router {
        app.layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight
    /// connections.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
