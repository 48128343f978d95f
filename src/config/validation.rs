//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and address formats
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Pure function: AutoRouterConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AutoRouterConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &AutoRouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.modules_path.trim().is_empty() {
        errors.push(ValidationError::new("modules_path", "must not be empty"));
    }

    if config.metrics_log_path.trim().is_empty() {
        errors.push(ValidationError::new("metrics_log_path", "must not be empty"));
    }

    if config.operational_log_path.trim().is_empty() {
        errors.push(ValidationError::new("operational_log_path", "must not be empty"));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("invalid socket address '{}'", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("expected 'pretty' or 'json', got '{}'", config.observability.log_format),
        ));
    }

    if config.observability.prometheus_enabled
        && config.observability.prometheus_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.prometheus_address",
            format!("invalid socket address '{}'", config.observability.prometheus_address),
        ));
    }

    let prefix = &config.admin.path_prefix;
    if config.admin.enabled && (!prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/')) {
        errors.push(ValidationError::new(
            "admin.path_prefix",
            "must start with '/', must not be '/' and must not end with '/'",
        ));
    }

    if matches!(&config.admin.api_key, Some(key) if key.trim().is_empty()) {
        errors.push(ValidationError::new("admin.api_key", "must not be empty when set"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
