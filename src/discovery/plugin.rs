//! Module loading interface.
//!
//! A [`ModuleLoader`] turns one discovered file into a mountable router. The
//! traversal in `loader.rs` never looks inside files itself; everything it
//! knows about a module comes through this trait.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::Router;
use thiserror::Error;

/// File name suffix of route modules.
pub const ROUTE_MODULE_SUFFIX: &str = "route.toml";

/// Why a module could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read module: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse module: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid module: {0}")]
    Invalid(String),
    #[error("module factory failed: {0}")]
    Factory(String),
}

/// Resolves route modules by naming convention and loads them.
pub trait ModuleLoader: Send + Sync {
    /// True if a file with this name is a route module.
    fn matches(&self, file_name: &str) -> bool {
        file_name.ends_with(ROUTE_MODULE_SUFFIX)
    }

    /// Load the module at `path`.
    ///
    /// `Ok(None)` means the module exists but exports no router.
    fn load(&self, path: &Path) -> Result<Option<Router>, LoadError>;
}

type Factory = Box<dyn Fn() -> Result<Router, String> + Send + Sync>;

/// Loader for modules defined in code.
///
/// Files on disk mark where a module is mounted; the router itself comes from
/// a factory registered under the file's path relative to the root, with the
/// module suffix removed (`users/index.route.toml` → `users/index`).
pub struct RegistryLoader {
    root: PathBuf,
    factories: HashMap<String, Factory>,
}

impl RegistryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            factories: HashMap::new(),
        }
    }

    /// Register an infallible router factory.
    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Router + Send + Sync + 'static,
    {
        self.factories
            .insert(name.into(), Box::new(move || Ok(factory())));
        self
    }

    /// Register a factory that may fail at load time.
    pub fn register_fallible<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Router, String> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    /// Registry key for a discovered file.
    pub fn module_name(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        name.strip_suffix(ROUTE_MODULE_SUFFIX)
            .map(|s| s.trim_end_matches('.').to_string())
            .unwrap_or(name)
    }
}

impl ModuleLoader for RegistryLoader {
    fn load(&self, path: &Path) -> Result<Option<Router>, LoadError> {
        match self.factories.get(&self.module_name(path)) {
            Some(factory) => factory().map(Some).map_err(LoadError::Factory),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    #[test]
    fn test_default_naming_convention() {
        let loader = RegistryLoader::new("/srv/modules");
        assert!(loader.matches("index.route.toml"));
        assert!(loader.matches("login.route.toml"));
        assert!(!loader.matches("index.toml"));
        assert!(!loader.matches("route.toml.bak"));
    }

    #[test]
    fn test_module_name() {
        let loader = RegistryLoader::new("/srv/modules");
        assert_eq!(
            loader.module_name(Path::new("/srv/modules/users/index.route.toml")),
            "users/index"
        );
        assert_eq!(
            loader.module_name(Path::new("/srv/modules/status.route.toml")),
            "status"
        );
    }

    #[test]
    fn test_registry_outcomes() {
        let loader = RegistryLoader::new("/srv/modules")
            .register("status", || Router::new().route("/status", get(|| async { "ok" })))
            .register_fallible("broken", || Err("database unavailable".to_string()));

        assert!(loader
            .load(Path::new("/srv/modules/status.route.toml"))
            .unwrap()
            .is_some());
        assert!(loader
            .load(Path::new("/srv/modules/unknown.route.toml"))
            .unwrap()
            .is_none());
        assert!(matches!(
            loader.load(Path::new("/srv/modules/broken.route.toml")),
            Err(LoadError::Factory(_))
        ));
    }
}
