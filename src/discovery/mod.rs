//! Route module discovery subsystem.
//!
//! # Data Flow
//! ```text
//! modules directory
//!     → loader.rs (pre-order walk, sorted entries)
//!     → plugin.rs (ModuleLoader: path → Option<Router> | LoadError)
//!         → manifest.rs (declarative *.route.toml modules)
//!         → RegistryLoader (code-defined modules)
//!     → merged into one axum Router
//!     → LoadResult (loaded, discovered, warnings, failures)
//! ```
//!
//! # Design Decisions
//! - Runs once at startup; the resulting router is immutable afterwards
//! - Failures are isolated to the module or subtree that caused them

pub mod loader;
pub mod manifest;
pub mod plugin;

pub use loader::{FailureKind, LoadFailure, LoadResult, RouteDiscovery};
pub use manifest::{Manifest, ManifestLoader};
pub use plugin::{LoadError, ModuleLoader, RegistryLoader, ROUTE_MODULE_SUFFIX};
