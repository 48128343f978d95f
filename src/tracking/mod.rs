//! Request metrics subsystem.
//!
//! # Data Flow
//! ```text
//! request
//!     → middleware.rs (begin: request id, route key, client info)
//!     → handler (may complete early via CompletionHandle)
//!     → middleware.rs (complete with response status)
//!     → tracker.rs (aggregate once, append CompletionEvent)
//! ```

pub mod middleware;
pub mod record;
pub mod snapshot;
pub mod tracker;

pub use middleware::track;
pub use record::{MetricRecord, Observation, RouteKey};
pub use snapshot::{format_uptime, MetricsReport, MetricsSnapshot, MetricsSummary, RouteMetrics};
pub use tracker::{CompletionHandle, MetricsTracker};
