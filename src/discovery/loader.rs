//! Recursive route module discovery.
//!
//! # Responsibilities
//! - Walk a directory tree in pre-order
//! - Hand every file matching the naming convention to a [`ModuleLoader`]
//! - Merge exported routers into one target router
//! - Record every failure without aborting the walk
//!
//! # Design Decisions
//! - One [`LoadResult`] is owned by the top-level call and threaded through
//!   the recursion by `&mut`
//! - Directory entries are visited in file name order, so mount order is
//!   deterministic across platforms
//! - axum panics when merged routes overlap; that panic is caught and recorded
//!   as a mount failure for the offending module

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use serde::Serialize;

use crate::discovery::plugin::ModuleLoader;
use crate::observability::metrics;
use crate::observability::{LogSink, TrailLevel};

/// Where in the walk a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A directory (or one of its entries) could not be read.
    Directory,
    /// The module loader returned an error.
    Module,
    /// The module's router conflicts with one already mounted.
    Mount,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Directory => "directory",
            FailureKind::Module => "module",
            FailureKind::Mount => "mount",
        }
    }
}

/// A single failure encountered during discovery.
#[derive(Debug, Clone, Serialize)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub reason: String,
}

/// Outcome of one discovery pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadResult {
    /// True iff any directory read, module load, or mount failed.
    pub has_errors: bool,
    /// File names of modules mounted on the router, in mount order.
    pub loaded_routes: Vec<String>,
    /// Full paths of every discovered module file, in discovery order.
    pub loaded_route_uris: Vec<PathBuf>,
    /// Modules that loaded but exported no router.
    pub warnings: Vec<PathBuf>,
    pub failures: Vec<LoadFailure>,
}

impl LoadResult {
    /// Discovered module paths relative to `root` where possible.
    pub fn relative_uris(&self, root: &Path) -> Vec<String> {
        self.loaded_route_uris
            .iter()
            .map(|p| p.strip_prefix(root).unwrap_or(p).display().to_string())
            .collect()
    }

    fn fail(&mut self, path: &Path, kind: FailureKind, reason: impl Into<String>) {
        self.has_errors = true;
        self.failures.push(LoadFailure {
            path: path.to_path_buf(),
            kind,
            reason: reason.into(),
        });
    }
}

/// Walks module directories and mounts what it finds.
pub struct RouteDiscovery {
    loader: Arc<dyn ModuleLoader>,
    trail: Option<Arc<LogSink>>,
}

impl RouteDiscovery {
    pub fn new(loader: impl ModuleLoader + 'static) -> Self {
        Self {
            loader: Arc::new(loader),
            trail: None,
        }
    }

    /// Also write the operational trail to `sink`.
    pub fn with_trail(mut self, sink: Arc<LogSink>) -> Self {
        self.trail = Some(sink);
        self
    }

    /// Discover every module under `root` and merge it into `router`.
    pub fn load_routes(&self, root: &Path, router: &mut Router) -> LoadResult {
        let mut result = LoadResult::default();
        self.visit_dir(root, router, &mut result);

        let failure_kinds: Vec<&'static str> =
            result.failures.iter().map(|f| f.kind.as_str()).collect();
        metrics::record_discovery(result.loaded_routes.len(), &failure_kinds);

        result
    }

    fn visit_dir(&self, dir: &Path, router: &mut Router, result: &mut LoadResult) {
        self.note(TrailLevel::Info, &format!("Scanning directory: {}", dir.display()), None);
        tracing::debug!(dir = %dir.display(), "Scanning directory");

        let entries = match read_sorted(dir) {
            Ok(entries) => entries,
            Err(e) => {
                let message = format!("Error reading directory \"{}\"", dir.display());
                tracing::error!(dir = %dir.display(), error = %e, "Error reading directory");
                self.note(TrailLevel::Error, &message, Some(&e.to_string()));
                result.fail(dir, FailureKind::Directory, e.to_string());
                return;
            }
        };

        self.note(
            TrailLevel::Info,
            &format!("Found {} items in {}", entries.len(), dir.display()),
            None,
        );

        for (name, path) in entries {
            let metadata = match fs::metadata(&path) {
                Ok(m) => m,
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Cannot stat entry");
                    self.note(
                        TrailLevel::Error,
                        &format!("Cannot stat \"{}\"", path.display()),
                        Some(&e.to_string()),
                    );
                    result.fail(&path, FailureKind::Directory, e.to_string());
                    continue;
                }
            };

            if metadata.is_dir() {
                self.note(
                    TrailLevel::Info,
                    &format!("Entering subdirectory: {}", path.display()),
                    None,
                );
                self.visit_dir(&path, router, result);
            } else if metadata.is_file() && self.loader.matches(&name) {
                self.visit_module(name, path, router, result);
            }
        }
    }

    fn visit_module(&self, name: String, path: PathBuf, router: &mut Router, result: &mut LoadResult) {
        result.loaded_route_uris.push(path.clone());
        self.note(
            TrailLevel::Info,
            &format!("Processing route file: {}", path.display()),
            None,
        );

        let module = match self.loader.load(&path) {
            Ok(Some(module)) => module,
            Ok(None) => {
                let message = format!("Route file \"{}\" has no exported router", path.display());
                tracing::warn!(path = %path.display(), "Route file has no exported router");
                self.note(TrailLevel::Warn, &message, None);
                result.warnings.push(path);
                return;
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to load route");
                self.note(
                    TrailLevel::Error,
                    &format!("Failed to load route: {}", path.display()),
                    Some(&e.to_string()),
                );
                result.fail(&path, FailureKind::Module, e.to_string());
                return;
            }
        };

        let candidate = router.clone();
        match panic::catch_unwind(AssertUnwindSafe(move || candidate.merge(module))) {
            Ok(merged) => {
                *router = merged;
                tracing::info!(path = %path.display(), "Route loaded");
                self.note(
                    TrailLevel::Success,
                    &format!("Route loaded successfully: {}", path.display()),
                    None,
                );
                result.loaded_routes.push(name);
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                tracing::error!(path = %path.display(), reason = %reason, "Failed to mount route");
                self.note(
                    TrailLevel::Error,
                    &format!("Failed to mount route: {}", path.display()),
                    Some(&reason),
                );
                result.fail(&path, FailureKind::Mount, reason);
            }
        }
    }

    fn note(&self, level: TrailLevel, message: &str, details: Option<&str>) {
        if let Some(trail) = &self.trail {
            trail.write_log(level, message, details);
        }
    }
}

/// Directory entries as (file name, path), sorted by file name.
fn read_sorted(dir: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        entries.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "router merge panicked".to_string()
    }
}
