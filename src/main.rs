//! auto-router demo server.
//!
//! Discovers route modules from a directory, serves them with request
//! tracking, and exposes the stats endpoints next to them.
//!
//! ```text
//!   Client ──▶ request id / trace / timeout ──▶ tracked module routes
//!                                         └──▶ {prefix}/metrics, /daily, ...
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use auto_router::config::{load_config, AutoRouterConfig};
use auto_router::lifecycle::wait_for_signal;
use auto_router::observability::{logging, metrics};
use auto_router::{AutoRouter, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "auto-router")]
#[command(about = "Serve auto-discovered route modules", long_about = None)]
struct Args {
    /// Configuration file (TOML). Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Route module directory. Overrides the configuration.
    #[arg(short, long)]
    modules: Option<String>,

    /// Bind address. Overrides the configuration.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => AutoRouterConfig::default(),
    };
    if let Some(modules) = args.modules {
        config.modules_path = modules;
    }
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "auto-router starting");

    if config.observability.prometheus_enabled {
        match config.observability.prometheus_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                prometheus_address = %config.observability.prometheus_address,
                "Failed to parse Prometheus address"
            ),
        }
    }

    let auto_router = AutoRouter::initialize(config.clone())?;

    let mut app = auto_router.router();
    if let Some(admin) = auto_router.admin_router() {
        tracing::info!(prefix = %config.admin.path_prefix, "Stats endpoints enabled");
        app = app.merge(admin);
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config, app);
    let server_task = tokio::spawn(server.run(listener, shutdown.signal()));

    wait_for_signal().await;
    shutdown.trigger();
    server_task.await??;

    if let Some(report) = auto_router.generate_report() {
        tracing::info!(
            total_requests = report.snapshot.summary.total_requests,
            unique_routes = report.snapshot.summary.unique_routes,
            "Final metrics report written"
        );
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
