//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files, and
//! every section has defaults so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for the auto router.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AutoRouterConfig {
    /// Directory scanned for route modules.
    pub modules_path: String,

    /// Install the metrics tracker and statistics manager.
    pub enable_metrics: bool,

    /// Completion event log (one JSON object per line).
    pub metrics_log_path: String,

    /// Operational trail written during discovery and maintenance.
    pub operational_log_path: String,

    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Event log retention.
    pub retention: RetentionConfig,

    /// Statistics endpoints.
    pub admin: AdminConfig,
}

impl Default for AutoRouterConfig {
    fn default() -> Self {
        Self {
            modules_path: "modules".to_string(),
            enable_metrics: true,
            metrics_log_path: "autorouter-metrics.log".to_string(),
            operational_log_path: "autorouter.log".to_string(),
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            retention: RetentionConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable the Prometheus scrape endpoint.
    pub prometheus_enabled: bool,

    /// Prometheus endpoint bind address.
    pub prometheus_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            prometheus_enabled: false,
            prometheus_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Event log retention.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Events older than this many days are dropped on cleanup.
    pub days_to_keep: u32,

    /// Run a cleanup pass during initialization.
    pub clean_on_startup: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            days_to_keep: 30,
            clean_on_startup: false,
        }
    }
}

/// Statistics endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Expose metrics and report endpoints.
    pub enabled: bool,

    /// Path prefix for the endpoints, e.g. "/__autorouter".
    pub path_prefix: String,

    /// When set, requests must carry `Authorization: Bearer <api_key>`.
    pub api_key: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path_prefix: "/__autorouter".to_string(),
            api_key: None,
        }
    }
}
