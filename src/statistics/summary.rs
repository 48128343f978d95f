//! Multi-day summary of the event log.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::event::LogEntry;
use crate::statistics::window_start;
use crate::tracking::record::{round2, rounded_mean};

const MAX_TOP_ROUTES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    /// `"N days"`.
    pub period: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_requests: u64,
    pub unique_ips: usize,
    pub average_requests_per_day: u64,
    pub most_active_day: Option<ActiveDay>,
    pub performance: Performance,
    pub top_routes: Vec<RouteCount>,
    /// Percentage of requests with status >= 400.
    pub error_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveDay {
    pub date: NaiveDate,
    pub requests: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub average_response_time: u64,
    pub fastest_response: u64,
    pub slowest_response: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteCount {
    pub route: String,
    pub requests: u64,
}

impl SummaryReport {
    /// Summarize request events in `[now - days, now]`.
    pub fn build(days: u32, now: DateTime<Utc>, entries: &[LogEntry]) -> Self {
        let start = window_start(now, days);

        let mut total_requests = 0u64;
        let mut total_response_time = 0u64;
        let mut errors = 0u64;
        let mut fastest: Option<u64> = None;
        let mut slowest = 0u64;
        let mut ips = HashSet::new();
        let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        let mut per_route: BTreeMap<&str, u64> = BTreeMap::new();

        let events = entries
            .iter()
            .filter_map(LogEntry::as_request)
            .filter(|e| e.timestamp >= start && e.timestamp <= now);

        for event in events {
            total_requests += 1;
            total_response_time = total_response_time.saturating_add(event.response_time);
            ips.insert(event.ip.as_str());
            *per_day.entry(event.timestamp.date_naive()).or_insert(0) += 1;
            *per_route.entry(event.route.as_str()).or_insert(0) += 1;

            fastest = Some(fastest.map_or(event.response_time, |f| f.min(event.response_time)));
            slowest = slowest.max(event.response_time);

            if event.status_code >= 400 {
                errors += 1;
            }
        }

        // Ascending date order, so only a strictly larger count replaces the
        // current pick and ties go to the earliest day.
        let most_active_day = per_day
            .iter()
            .fold(None::<ActiveDay>, |best, (&date, &requests)| match best {
                Some(b) if b.requests >= requests => Some(b),
                _ => Some(ActiveDay { date, requests }),
            });

        let mut top_routes: Vec<RouteCount> = per_route
            .into_iter()
            .map(|(route, requests)| RouteCount {
                route: route.to_string(),
                requests,
            })
            .collect();
        top_routes.sort_by(|a, b| b.requests.cmp(&a.requests));
        top_routes.truncate(MAX_TOP_ROUTES);

        let average_requests_per_day = if days == 0 {
            0
        } else {
            rounded_mean(total_requests, u64::from(days))
        };

        let error_rate = if total_requests == 0 {
            0.0
        } else {
            round2(errors as f64 / total_requests as f64 * 100.0)
        };

        Self {
            period: format!("{days} days"),
            start_date: start.date_naive(),
            end_date: now.date_naive(),
            total_requests,
            unique_ips: ips.len(),
            average_requests_per_day,
            most_active_day,
            performance: Performance {
                average_response_time: rounded_mean(total_response_time, total_requests),
                fastest_response: fastest.unwrap_or(0),
                slowest_response: slowest,
            },
            top_routes,
            error_rate,
        }
    }
}
