//! Prometheus exposition of request traffic.
//!
//! # Metrics
//! - `autorouter_requests_total` (counter): completed requests by method, route, status
//! - `autorouter_request_duration_seconds` (histogram): latency distribution by method, route
//! - `autorouter_modules_loaded` (gauge): modules mounted by the last discovery pass
//! - `autorouter_module_failures_total` (counter): discovery failures by kind
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so the tracker can
//!   call these unconditionally
//! - Route labels use the matched pattern, never the raw path

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install Prometheus exporter"),
    }
}

/// Record one completed request.
pub fn record_request(method: &str, route: &str, status: u16, latency: Duration) {
    metrics::counter!(
        "autorouter_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "autorouter_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(latency.as_secs_f64());
}

/// Record the outcome of a discovery pass.
pub fn record_discovery(loaded: usize, failures: &[&'static str]) {
    metrics::gauge!("autorouter_modules_loaded").set(loaded as f64);
    for kind in failures {
        metrics::counter!("autorouter_module_failures_total", "kind" => *kind).increment(1);
    }
}
