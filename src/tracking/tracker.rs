//! In-process request aggregator.
//!
//! # Responsibilities
//! - Count every intercepted request and hand out sequence numbers
//! - Aggregate completed requests per (method, route)
//! - Persist one completion event per request
//! - Produce snapshots and reports on demand
//!
//! # Design Decisions
//! - Explicitly constructed and shared via `Arc`; several trackers can live
//!   in one process
//! - Per-key updates happen under the `DashMap` shard lock for that key
//! - Recording is claimed per request through a compare-and-set latch, so a
//!   request is recorded once no matter how many completion signals fire

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use axum::body::Body;
use axum::extract::{ConnectInfo, MatchedPath};
use axum::http::{header::USER_AGENT, Request, StatusCode};
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::event::{now_millis, truncate_user_agent, CompletionEvent, ReportEntry, UNKNOWN};
use crate::observability::metrics;
use crate::observability::LogSink;
use crate::tracking::record::{round2, MetricRecord, Observation, RouteKey};
use crate::tracking::snapshot::{
    format_uptime, MetricsReport, MetricsSnapshot, MetricsSummary, RouteMetrics,
};

/// Aggregates request metrics and writes completion events.
pub struct MetricsTracker {
    routes: DashMap<RouteKey, MetricRecord>,
    request_count: AtomicU64,
    started: RwLock<Instant>,
    enabled: AtomicBool,
    sink: Arc<LogSink>,
}

impl fmt::Debug for MetricsTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsTracker")
            .field("routes", &self.routes.len())
            .field("request_count", &self.total_requests())
            .field("enabled", &self.is_enabled())
            .field("log", &self.sink.path())
            .finish()
    }
}

impl MetricsTracker {
    /// Create an enabled tracker writing events to `sink`.
    pub fn new(sink: Arc<LogSink>) -> Self {
        Self {
            routes: DashMap::new(),
            request_count: AtomicU64::new(0),
            started: RwLock::new(Instant::now()),
            enabled: AtomicBool::new(true),
            sink,
        }
    }

    /// The event log this tracker appends to.
    pub fn sink(&self) -> &Arc<LogSink> {
        &self.sink
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Resume tracking. Existing aggregates are kept.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Stop tracking new requests. Existing aggregates are kept.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Requests intercepted since start or the last clear.
    pub fn total_requests(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Start tracking `request`: bump the request counter and capture
    /// everything needed to record it later.
    pub fn begin(self: &Arc<Self>, request: &Request<Body>) -> CompletionHandle {
        let request_id = self.request_count.fetch_add(1, Ordering::Relaxed) + 1;

        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_owned())
            .unwrap_or_else(|| request.uri().path().to_owned());

        let ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());

        let user_agent = request
            .headers()
            .get(USER_AGENT)
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
            .filter(|v| !v.is_empty())
            .map(|v| truncate_user_agent(&v))
            .unwrap_or_else(|| UNKNOWN.to_string());

        CompletionHandle {
            tracker: Arc::clone(self),
            request: Arc::new(RequestContext {
                key: RouteKey::new(request.method().as_str(), route),
                ip,
                user_agent,
                request_id,
                started: Instant::now(),
                recorded: AtomicBool::new(false),
            }),
        }
    }

    /// Fold one observation into the record for `key`.
    pub fn observe(&self, key: RouteKey, obs: Observation) {
        self.routes
            .entry(key)
            .or_insert_with(|| MetricRecord::new(obs.at))
            .observe(&obs);
    }

    fn record(&self, request: &RequestContext, status: u16) {
        let latency = request.started.elapsed();
        let latency_ms = latency.as_millis() as u64;
        let at = now_millis();

        self.observe(
            request.key.clone(),
            Observation {
                status,
                latency_ms,
                ip: request.ip.clone(),
                user_agent: request.user_agent.clone(),
                at,
            },
        );
        metrics::record_request(&request.key.method, &request.key.route, status, latency);

        let event = CompletionEvent {
            timestamp: at,
            method: request.key.method.clone(),
            route: request.key.route.clone(),
            status_code: status,
            response_time: latency_ms,
            ip: request.ip.clone(),
            user_agent: request.user_agent.clone(),
            request_id: request.request_id,
        };

        if let Err(e) = self.sink.append_json(&event) {
            tracing::error!(
                path = %self.sink.path().display(),
                request_id = request.request_id,
                error = %e,
                "Failed to write completion event"
            );
        }
    }

    /// Current aggregates, routes sorted by request count.
    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.get_metrics_at(Utc::now())
    }

    /// Same as [`get_metrics`](Self::get_metrics) with an explicit clock for
    /// recency weighting.
    pub fn get_metrics_at(&self, now: DateTime<Utc>) -> MetricsSnapshot {
        let uptime_ms = self
            .started
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
            .as_millis() as u64;
        let total_requests = self.total_requests();

        let average_requests_per_minute = if uptime_ms == 0 {
            0.0
        } else {
            round2(total_requests as f64 / (uptime_ms as f64 / 60_000.0))
        };

        let mut routes: Vec<RouteMetrics> = self
            .routes
            .iter()
            .map(|entry| {
                let key = entry.key();
                let record = entry.value();
                RouteMetrics {
                    endpoint: key.to_string(),
                    method: key.method.clone(),
                    route: key.route.clone(),
                    total_requests: record.count,
                    average_response_time: record.average_response_time,
                    status_codes: record.status_codes.clone(),
                    first_access: record.first_access,
                    last_access: record.last_access,
                    unique_visitors: record.unique_ips.len(),
                    popularity_score: record.popularity_score(now),
                }
            })
            .collect();

        routes.sort_by(|a, b| {
            b.total_requests
                .cmp(&a.total_requests)
                .then_with(|| a.endpoint.cmp(&b.endpoint))
        });

        MetricsSnapshot {
            summary: MetricsSummary {
                total_requests,
                uptime: uptime_ms,
                average_requests_per_minute,
                unique_routes: routes.len(),
                generated_at: now,
            },
            routes,
        }
    }

    /// Snapshot plus rankings, persisted to the event log as a report line.
    pub fn generate_report(&self) -> MetricsReport {
        let report = MetricsReport::from_snapshot(self.get_metrics());

        let persisted = serde_json::to_value(&report)
            .map_err(Into::into)
            .and_then(|value| self.sink.append_json(&ReportEntry::new(value)));
        if let Err(e) = persisted {
            tracing::error!(path = %self.sink.path().display(), error = %e, "Failed to persist metrics report");
        }

        report
    }

    /// Drop all aggregates and restart the uptime clock. The event log is
    /// left untouched.
    pub fn clear_metrics(&self) {
        self.routes.clear();
        self.request_count.store(0, Ordering::Relaxed);
        *self.started.write().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// Log a short summary of the current aggregates.
    pub fn log_summary(&self) {
        let snapshot = self.get_metrics();
        let summary = &snapshot.summary;

        tracing::info!(
            total_requests = summary.total_requests,
            unique_routes = summary.unique_routes,
            avg_req_per_min = summary.average_requests_per_minute,
            uptime = %format_uptime(summary.uptime),
            log = %self.sink.path().display(),
            "Metrics summary"
        );

        for (rank, route) in snapshot.routes.iter().take(5).enumerate() {
            tracing::info!(
                rank = rank + 1,
                endpoint = %route.endpoint,
                requests = route.total_requests,
                avg_ms = route.average_response_time,
                "Top route"
            );
        }
    }
}

struct RequestContext {
    key: RouteKey,
    ip: String,
    user_agent: String,
    request_id: u64,
    started: Instant,
    recorded: AtomicBool,
}

/// Per-request recording right.
///
/// Inserted into request extensions by the tracking middleware. Handlers that
/// finish their work before returning (streaming, background flushes) may
/// call [`complete`](Self::complete) themselves; only the first call records.
#[derive(Clone)]
pub struct CompletionHandle {
    tracker: Arc<MetricsTracker>,
    request: Arc<RequestContext>,
}

impl fmt::Debug for CompletionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("endpoint", &self.request.key.to_string())
            .field("request_id", &self.request.request_id)
            .field("completed", &self.is_completed())
            .finish()
    }
}

impl CompletionHandle {
    /// Record the request with `status`. Returns true if this call recorded
    /// it, false if an earlier signal already did.
    pub fn complete(&self, status: StatusCode) -> bool {
        if self
            .request
            .recorded
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.tracker.record(&self.request, status.as_u16());
        true
    }

    pub fn is_completed(&self) -> bool {
        self.request.recorded.load(Ordering::Acquire)
    }

    pub fn request_id(&self) -> u64 {
        self.request.request_id
    }

    pub fn route_key(&self) -> &RouteKey {
        &self.request.key
    }
}
