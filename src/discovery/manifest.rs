//! Declarative route modules.
//!
//! A `*.route.toml` module lists canned endpoints:
//!
//! ```toml
//! [[routes]]
//! method = "GET"
//! path = "/users/{id}"
//! json = { success = true }
//!
//! [[routes]]
//! method = "POST"
//! path = "/users"
//! status = 201
//! delay_ms = 100
//! body = "created"
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter};
use axum::{Json, Router};
use serde::Deserialize;

use crate::discovery::plugin::{LoadError, ModuleLoader};

/// Parsed contents of a route module file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

/// One endpoint of a manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteSpec {
    pub method: String,
    pub path: String,
    #[serde(default = "default_status")]
    pub status: u16,
    pub json: Option<serde_json::Value>,
    pub body: Option<String>,
    #[serde(default)]
    pub delay_ms: u64,
}

fn default_status() -> u16 {
    200
}

#[derive(Debug)]
struct CannedResponse {
    status: StatusCode,
    json: Option<serde_json::Value>,
    body: String,
    delay: Duration,
}

impl CannedResponse {
    async fn respond(&self) -> Response {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.json {
            Some(value) => (self.status, Json(value.clone())).into_response(),
            None => (self.status, self.body.clone()).into_response(),
        }
    }
}

impl Manifest {
    /// Parse manifest text.
    pub fn parse(content: &str) -> Result<Self, LoadError> {
        Ok(toml::from_str(content)?)
    }

    /// Build the router for this manifest. `None` when it declares no routes.
    pub fn into_router(self) -> Result<Option<Router>, LoadError> {
        if self.routes.is_empty() {
            return Ok(None);
        }

        let mut seen = HashSet::new();
        let mut by_path: BTreeMap<String, Vec<(MethodFilter, CannedResponse)>> = BTreeMap::new();

        for spec in self.routes {
            if !spec.path.starts_with('/') {
                return Err(LoadError::Invalid(format!("path '{}' must start with '/'", spec.path)));
            }

            let method = Method::from_bytes(spec.method.to_ascii_uppercase().as_bytes())
                .map_err(|_| LoadError::Invalid(format!("unknown method '{}'", spec.method)))?;
            let filter = MethodFilter::try_from(method.clone())
                .map_err(|_| LoadError::Invalid(format!("unsupported method '{}'", method)))?;

            if !seen.insert((method.clone(), spec.path.clone())) {
                return Err(LoadError::Invalid(format!("duplicate route {} {}", method, spec.path)));
            }

            let status = StatusCode::from_u16(spec.status)
                .map_err(|_| LoadError::Invalid(format!("invalid status {}", spec.status)))?;

            if spec.json.is_some() && spec.body.is_some() {
                return Err(LoadError::Invalid(format!(
                    "route {} {} sets both 'json' and 'body'",
                    method, spec.path
                )));
            }

            let response = CannedResponse {
                status,
                json: spec.json,
                body: spec.body.unwrap_or_default(),
                delay: Duration::from_millis(spec.delay_ms),
            };
            by_path.entry(spec.path).or_default().push((filter, response));
        }

        // axum panics on malformed path syntax
        panic::catch_unwind(AssertUnwindSafe(|| build_router(by_path)))
            .map(Some)
            .map_err(|_| LoadError::Invalid("router rejected a route path".to_string()))
    }
}

fn build_router(by_path: BTreeMap<String, Vec<(MethodFilter, CannedResponse)>>) -> Router {
    let mut router = Router::new();
    for (path, endpoints) in by_path {
        let mut method_router = MethodRouter::new();
        for (filter, response) in endpoints {
            let response = Arc::new(response);
            method_router = method_router.on(filter, move || {
                let response = response.clone();
                async move { response.respond().await }
            });
        }
        router = router.route(&path, method_router);
    }
    router
}

/// Loads `*.route.toml` manifests from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestLoader;

impl ModuleLoader for ManifestLoader {
    fn load(&self, path: &Path) -> Result<Option<Router>, LoadError> {
        let content = fs::read_to_string(path)?;
        Manifest::parse(&content)?.into_router()
    }
}
