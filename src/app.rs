//! Composition root.
//!
//! # Responsibilities
//! - Validate configuration and prepare log locations
//! - Run route discovery and mount the result on one router
//! - Wrap that router with request tracking
//! - Expose tracker and statistics operations to the host application
//!
//! # Design Decisions
//! - Tracking is applied with `Router::layer` after discovery, so every
//!   discovered route is tracked and later merges are not
//! - Discovery failures are reported, never fatal; modules that loaded keep
//!   serving
//! - With metrics disabled no tracker or statistics manager exists and the
//!   metrics accessors return `None`

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{middleware, Router};
use chrono::NaiveDate;
use thiserror::Error;

use crate::admin::{self, AdminState};
use crate::config::validation::validate_config;
use crate::config::{AutoRouterConfig, ConfigError};
use crate::discovery::{LoadResult, ManifestLoader, ModuleLoader, RouteDiscovery};
use crate::observability::{LogSink, TrailLevel};
use crate::statistics::{DailyReport, StatisticsManager, StatsError, SummaryReport};
use crate::tracking::{track, MetricsReport, MetricsSnapshot, MetricsTracker};

/// Fatal initialization errors.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot prepare log location {path}: {source}")]
    LogPath {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A discovered, tracked router plus its metrics and statistics handles.
pub struct AutoRouter {
    config: AutoRouterConfig,
    router: Router,
    load_result: LoadResult,
    tracker: Option<Arc<MetricsTracker>>,
    statistics: Option<StatisticsManager>,
}

impl AutoRouter {
    /// Initialize with declarative `*.route.toml` modules.
    pub fn initialize(config: AutoRouterConfig) -> Result<Self, InitError> {
        Self::initialize_with(config, ManifestLoader)
    }

    /// Initialize with a custom module loader.
    pub fn initialize_with(
        config: AutoRouterConfig,
        loader: impl ModuleLoader + 'static,
    ) -> Result<Self, InitError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let trail = Arc::new(LogSink::new(&config.operational_log_path));
        prepare(&trail)?;

        let metrics_sink = if config.enable_metrics {
            let sink = Arc::new(LogSink::new(&config.metrics_log_path));
            prepare(&sink)?;
            Some(sink)
        } else {
            None
        };

        trail.write_log(TrailLevel::Info, "Initializing auto router", None);
        tracing::info!(
            modules_path = %config.modules_path,
            metrics = config.enable_metrics,
            "Initializing auto router"
        );

        let modules_root = Path::new(&config.modules_path);
        let mut router = Router::new();
        let load_result = RouteDiscovery::new(loader)
            .with_trail(Arc::clone(&trail))
            .load_routes(modules_root, &mut router);

        let (tracker, statistics) = match metrics_sink {
            Some(sink) => {
                let tracker = Arc::new(MetricsTracker::new(Arc::clone(&sink)));
                router = router.layer(middleware::from_fn_with_state(Arc::clone(&tracker), track));
                let statistics = StatisticsManager::new(sink).with_trail(Arc::clone(&trail));
                (Some(tracker), Some(statistics))
            }
            None => (None, None),
        };

        report_outcome(&load_result, modules_root, &trail);

        if config.retention.clean_on_startup {
            if let Some(statistics) = &statistics {
                if let Err(e) = statistics.clean_old_logs(config.retention.days_to_keep) {
                    tracing::warn!(error = %e, "Startup log cleanup failed");
                }
            }
        }

        if let Some(tracker) = &tracker {
            tracker.log_summary();
        }

        Ok(Self {
            config,
            router,
            load_result,
            tracker,
            statistics,
        })
    }

    /// The tracked router holding every discovered route.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }

    /// Stats endpoints nested under the configured prefix. `None` when the
    /// endpoints or metrics are disabled.
    pub fn admin_router(&self) -> Option<Router> {
        if !self.config.admin.enabled {
            return None;
        }
        let tracker = self.tracker.as_ref()?;
        let statistics = self.statistics.as_ref()?;

        let state = AdminState::new(
            Arc::clone(tracker),
            statistics.clone(),
            self.config.retention.days_to_keep,
            self.config.admin.api_key.clone(),
        );
        Some(admin::router(&self.config.admin.path_prefix, state))
    }

    pub fn config(&self) -> &AutoRouterConfig {
        &self.config
    }

    pub fn load_result(&self) -> &LoadResult {
        &self.load_result
    }

    pub fn tracker(&self) -> Option<&Arc<MetricsTracker>> {
        self.tracker.as_ref()
    }

    pub fn statistics(&self) -> Option<&StatisticsManager> {
        self.statistics.as_ref()
    }

    pub fn get_metrics(&self) -> Option<MetricsSnapshot> {
        self.tracker.as_ref().map(|t| t.get_metrics())
    }

    /// Build a report and append it to the event log.
    pub fn generate_report(&self) -> Option<MetricsReport> {
        self.tracker.as_ref().map(|t| t.generate_report())
    }

    pub fn get_daily_report(&self, date: NaiveDate) -> Option<Result<DailyReport, StatsError>> {
        self.statistics
            .as_ref()
            .map(|s| s.generate_daily_report(date))
    }

    pub fn get_summary_report(&self, days: u32) -> Option<Result<SummaryReport, StatsError>> {
        self.statistics
            .as_ref()
            .map(|s| s.generate_summary_report(days))
    }

    pub fn clean_old_logs(&self, days_to_keep: u32) -> Option<Result<usize, StatsError>> {
        self.statistics
            .as_ref()
            .map(|s| s.clean_old_logs(days_to_keep))
    }
}

fn prepare(sink: &LogSink) -> Result<(), InitError> {
    sink.ensure_parent_dir().map_err(|source| InitError::LogPath {
        path: sink.path().to_path_buf(),
        source,
    })
}

fn report_outcome(result: &LoadResult, root: &Path, trail: &LogSink) {
    for warning in &result.warnings {
        tracing::warn!(path = %warning.display(), "Route module exports no router");
    }

    if result.has_errors {
        tracing::error!(
            failures = result.failures.len(),
            loaded = result.loaded_routes.len(),
            "Auto router initialization failed"
        );
        for failure in &result.failures {
            tracing::error!(
                path = %failure.path.display(),
                kind = failure.kind.as_str(),
                reason = %failure.reason,
                "Route module failed"
            );
        }
        let details = result
            .failures
            .iter()
            .map(|f| format!("{} ({}): {}", f.path.display(), f.kind.as_str(), f.reason))
            .collect::<Vec<_>>()
            .join("\n");
        trail.write_log(TrailLevel::Error, "Auto router initialization failed", Some(&details));
        return;
    }

    tracing::info!(
        loaded = result.loaded_routes.len(),
        modules = ?result.relative_uris(root),
        "Auto router initialized"
    );
    trail.write_log(
        TrailLevel::Success,
        &format!("Auto router initialized with {} route modules", result.loaded_routes.len()),
        Some(&result.loaded_routes.join(", ")),
    );
}
