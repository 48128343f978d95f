//! Stats endpoints.
//!
//! # Routes (under the configured prefix)
//! - `GET  /metrics` live tracker snapshot
//! - `POST /report` build and persist a metrics report
//! - `GET  /daily?date=YYYY-MM-DD` daily breakdown (default: today, UTC)
//! - `GET  /summary?days=N` multi-day summary (default: 7)
//! - `POST /clean?days=N` apply retention (default: configured days)

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::statistics::StatisticsManager;
use crate::tracking::MetricsTracker;
use self::auth::require_api_key;
use self::handlers::*;

/// Shared state for the stats endpoints.
#[derive(Clone)]
pub struct AdminState {
    pub tracker: Arc<MetricsTracker>,
    pub statistics: StatisticsManager,
    pub default_retention_days: u32,
    pub api_key: Option<Arc<str>>,
}

impl AdminState {
    pub fn new(
        tracker: Arc<MetricsTracker>,
        statistics: StatisticsManager,
        default_retention_days: u32,
        api_key: Option<String>,
    ) -> Self {
        Self {
            tracker,
            statistics,
            default_retention_days,
            api_key: api_key.map(Arc::from),
        }
    }
}

/// Build the stats router nested under `prefix`.
pub fn router(prefix: &str, state: AdminState) -> Router {
    let routes = Router::new()
        .route("/metrics", get(get_metrics))
        .route("/report", post(post_report))
        .route("/daily", get(get_daily))
        .route("/summary", get(get_summary))
        .route("/clean", post(post_clean))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state);

    Router::new().nest(prefix, routes)
}
