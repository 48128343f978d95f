//! Statistics over the persisted event log.
//!
//! Works purely from the log file, so it can run inside the serving
//! process (admin endpoints) or offline (`autorouter-cli`).

pub mod daily;
pub mod manager;
pub mod summary;

pub use crate::event::{CompletionEvent, LogEntry, ReportEntry};
pub use daily::{DailyReport, ErrorRequest, RouteDailyStats, SlowRequest, TopRoute, SLOW_REQUEST_MS};
pub use manager::{StatisticsManager, StatsError};
pub use summary::{ActiveDay, Performance, RouteCount, SummaryReport};

use chrono::{DateTime, Duration, Utc};

/// Start of a `days`-long window ending at `now`. Windows reaching past the
/// earliest representable time start there, i.e. cover everything.
pub(crate) fn window_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
