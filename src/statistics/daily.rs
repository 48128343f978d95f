//! Per-day breakdown of the event log.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::event::LogEntry;
use crate::tracking::record::rounded_mean;

/// Requests slower than this are listed in `slowest_requests`.
pub const SLOW_REQUEST_MS: u64 = 1000;

const MAX_SLOWEST: usize = 10;
const MAX_TOP_ROUTES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub date: NaiveDate,
    pub total_requests: u64,
    pub unique_ips: usize,
    pub routes: BTreeMap<String, RouteDailyStats>,
    pub methods: BTreeMap<String, u64>,
    pub status_codes: BTreeMap<u16, u64>,
    /// UTC hour of day to request count.
    pub hourly_distribution: BTreeMap<u32, u64>,
    pub average_response_time: u64,
    pub slowest_requests: Vec<SlowRequest>,
    pub errors: Vec<ErrorRequest>,
    pub top_routes: Vec<TopRoute>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDailyStats {
    pub count: u64,
    pub methods: BTreeMap<String, u64>,
    pub average_response_time: u64,
    pub total_response_time: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowRequest {
    pub route: String,
    pub method: String,
    pub response_time: u64,
    pub timestamp: DateTime<Utc>,
    pub ip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRequest {
    pub route: String,
    pub method: String,
    pub status_code: u16,
    pub timestamp: DateTime<Utc>,
    pub ip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopRoute {
    pub route: String,
    pub requests: u64,
    pub average_response_time: u64,
}

impl DailyReport {
    /// Build the report for `date` (UTC) from parsed log entries. Report
    /// lines are ignored.
    pub fn build(date: NaiveDate, entries: &[LogEntry]) -> Self {
        let events = entries
            .iter()
            .filter_map(LogEntry::as_request)
            .filter(|e| e.timestamp.date_naive() == date);

        let mut total_requests = 0u64;
        let mut total_response_time = 0u64;
        let mut ips = HashSet::new();
        let mut routes: BTreeMap<String, RouteDailyStats> = BTreeMap::new();
        let mut methods = BTreeMap::new();
        let mut status_codes = BTreeMap::new();
        let mut hourly_distribution = BTreeMap::new();
        let mut slowest_requests = Vec::new();
        let mut errors = Vec::new();

        for event in events {
            total_requests += 1;
            total_response_time = total_response_time.saturating_add(event.response_time);
            ips.insert(event.ip.as_str());

            let stats = routes.entry(event.route.clone()).or_default();
            stats.count += 1;
            stats.total_response_time = stats.total_response_time.saturating_add(event.response_time);
            stats.average_response_time = rounded_mean(stats.total_response_time, stats.count);
            *stats.methods.entry(event.method.clone()).or_insert(0) += 1;

            *methods.entry(event.method.clone()).or_insert(0) += 1;
            *status_codes.entry(event.status_code).or_insert(0) += 1;
            *hourly_distribution.entry(event.timestamp.hour()).or_insert(0) += 1;

            if event.response_time > SLOW_REQUEST_MS {
                slowest_requests.push(SlowRequest {
                    route: event.route.clone(),
                    method: event.method.clone(),
                    response_time: event.response_time,
                    timestamp: event.timestamp,
                    ip: event.ip.clone(),
                });
            }

            if event.status_code >= 400 {
                errors.push(ErrorRequest {
                    route: event.route.clone(),
                    method: event.method.clone(),
                    status_code: event.status_code,
                    timestamp: event.timestamp,
                    ip: event.ip.clone(),
                });
            }
        }

        // Stable sorts: ties keep log order.
        slowest_requests.sort_by(|a, b| b.response_time.cmp(&a.response_time));
        slowest_requests.truncate(MAX_SLOWEST);

        let mut top_routes: Vec<TopRoute> = routes
            .iter()
            .map(|(route, stats)| TopRoute {
                route: route.clone(),
                requests: stats.count,
                average_response_time: stats.average_response_time,
            })
            .collect();
        top_routes.sort_by(|a, b| b.requests.cmp(&a.requests));
        top_routes.truncate(MAX_TOP_ROUTES);

        Self {
            date,
            total_requests,
            unique_ips: ips.len(),
            routes,
            methods,
            status_codes,
            hourly_distribution,
            average_response_time: rounded_mean(total_response_time, total_requests),
            slowest_requests,
            errors,
            top_routes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CompletionEvent, ReportEntry};

    fn event(ts: &str, route: &str, status: u16, latency: u64, ip: &str) -> LogEntry {
        LogEntry::Request(CompletionEvent {
            timestamp: ts.parse().unwrap(),
            method: "GET".to_string(),
            route: route.to_string(),
            status_code: status,
            response_time: latency,
            ip: ip.to_string(),
            user_agent: "test".to_string(),
            request_id: 1,
        })
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_daily_breakdown() {
        let entries = vec![
            event("2026-10-17T23:59:59.999Z", "/users", 200, 10, "a"),
            event("2026-10-18T00:00:00.000Z", "/users", 200, 10, "a"),
            event("2026-10-18T09:30:00.000Z", "/users", 404, 30, "b"),
            event("2026-10-18T09:45:00.000Z", "/slow", 200, 1500, "a"),
            event("2026-10-18T10:00:00.000Z", "/slow", 500, 2500, "c"),
            LogEntry::Report(ReportEntry::new(serde_json::json!({}))),
        ];

        let report = DailyReport::build(date("2026-10-18"), &entries);

        assert_eq!(report.total_requests, 4);
        assert_eq!(report.unique_ips, 3);
        assert_eq!(report.routes["/users"].count, 2);
        assert_eq!(report.routes["/users"].average_response_time, 20);
        assert_eq!(report.routes["/users"].methods["GET"], 2);
        assert_eq!(report.methods["GET"], 4);
        assert_eq!(report.status_codes[&200], 2);
        assert_eq!(report.hourly_distribution[&0], 1);
        assert_eq!(report.hourly_distribution[&9], 2);
        assert_eq!(report.hourly_distribution[&10], 1);
        assert_eq!(report.average_response_time, 1010);

        let slow: Vec<_> = report.slowest_requests.iter().map(|r| r.response_time).collect();
        assert_eq!(slow, vec![2500, 1500]);

        let error_codes: Vec<_> = report.errors.iter().map(|r| r.status_code).collect();
        assert_eq!(error_codes, vec![404, 500]);

        assert_eq!(report.top_routes.len(), 2);
        assert_eq!(report.top_routes[0].route, "/slow");
        assert_eq!(report.top_routes[0].average_response_time, 2000);
    }

    #[test]
    fn test_empty_day() {
        let entries = vec![event("2026-10-17T12:00:00Z", "/users", 200, 10, "a")];
        let report = DailyReport::build(date("2026-10-18"), &entries);

        assert_eq!(report.total_requests, 0);
        assert_eq!(report.average_response_time, 0);
        assert!(report.routes.is_empty());
        assert!(report.top_routes.is_empty());
    }

    #[test]
    fn test_huge_latencies_saturate() {
        let entries = vec![
            event("2026-10-18T12:00:00Z", "/slow", 200, u64::MAX, "a"),
            event("2026-10-18T12:00:01Z", "/slow", 200, u64::MAX, "a"),
        ];
        let report = DailyReport::build(date("2026-10-18"), &entries);

        assert_eq!(report.routes["/slow"].total_response_time, u64::MAX);
        assert_eq!(report.total_requests, 2);
        assert_eq!(report.slowest_requests.len(), 2);
    }

    #[test]
    fn test_slowest_capped_at_ten() {
        let entries: Vec<_> = (0..15)
            .map(|i| event("2026-10-18T12:00:00Z", "/slow", 200, 1001 + i, "a"))
            .collect();
        let report = DailyReport::build(date("2026-10-18"), &entries);

        assert_eq!(report.slowest_requests.len(), 10);
        assert_eq!(report.slowest_requests[0].response_time, 1015);
        assert_eq!(report.slowest_requests[9].response_time, 1006);
    }
}
