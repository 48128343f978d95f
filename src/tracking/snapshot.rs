//! Serializable views of the tracker state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Process-wide counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub total_requests: u64,
    /// Milliseconds since the tracker started or was last cleared.
    pub uptime: u64,
    pub average_requests_per_minute: f64,
    pub unique_routes: usize,
    pub generated_at: DateTime<Utc>,
}

/// One route key's aggregate as reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMetrics {
    pub endpoint: String,
    pub method: String,
    pub route: String,
    pub total_requests: u64,
    pub average_response_time: u64,
    pub status_codes: BTreeMap<u16, u64>,
    pub first_access: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
    pub unique_visitors: usize,
    pub popularity_score: f64,
}

/// Result of `MetricsTracker::get_metrics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub summary: MetricsSummary,
    /// Sorted by request count, descending.
    pub routes: Vec<RouteMetrics>,
}

/// Result of `MetricsTracker::generate_report`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    #[serde(flatten)]
    pub snapshot: MetricsSnapshot,
    pub top_routes: Vec<RouteMetrics>,
    pub slowest_routes: Vec<RouteMetrics>,
    pub error_routes: Vec<RouteMetrics>,
}

impl MetricsReport {
    pub(crate) fn from_snapshot(snapshot: MetricsSnapshot) -> Self {
        let top_routes = snapshot.routes.iter().take(10).cloned().collect();

        let mut slowest: Vec<RouteMetrics> = snapshot.routes.clone();
        slowest.sort_by(|a, b| b.average_response_time.cmp(&a.average_response_time));
        slowest.truncate(5);

        let error_routes = snapshot
            .routes
            .iter()
            .filter(|r| r.status_codes.keys().any(|&code| code >= 400))
            .take(5)
            .cloned()
            .collect();

        Self {
            snapshot,
            top_routes,
            slowest_routes: slowest,
            error_routes,
        }
    }
}

/// Human readable uptime: `2d 3h 4m`, `3h 4m`, `4m 5s`, `5s`.
pub fn format_uptime(uptime_ms: u64) -> String {
    let seconds = uptime_ms / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h {}m", days, hours % 24, minutes % 60)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(999), "0s");
        assert_eq!(format_uptime(65_000), "1m 5s");
        assert_eq!(format_uptime(3_660_000), "1h 1m");
        assert_eq!(format_uptime(90_000_000), "1d 1h 0m");
    }
}
