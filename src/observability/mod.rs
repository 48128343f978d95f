//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events to stdout)
//!     → sink.rs    (operational trail + completion events on disk)
//!     → metrics.rs (Prometheus counters, histograms)
//!
//! Consumers:
//!     → Operators (stdout, autorouter.log)
//!     → statistics (replays the completion event log)
//!     → Prometheus scrape (optional)
//! ```

pub mod logging;
pub mod metrics;
pub mod sink;

pub use sink::{LogSink, SinkError, TrailLevel};
