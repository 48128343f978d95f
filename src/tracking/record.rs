//! Per-route aggregates.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};

/// Aggregation bucket identity: (method, route pattern).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    pub method: String,
    pub route: String,
}

impl RouteKey {
    pub fn new(method: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            route: route.into(),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.route)
    }
}

/// What one completed request contributes to its route's record.
#[derive(Debug, Clone)]
pub struct Observation {
    pub status: u16,
    pub latency_ms: u64,
    pub ip: String,
    pub user_agent: String,
    pub at: DateTime<Utc>,
}

/// Running aggregate for one route key.
#[derive(Debug, Clone)]
pub struct MetricRecord {
    pub count: u64,
    pub total_response_time: u64,
    /// Rounded mean latency in milliseconds.
    pub average_response_time: u64,
    pub status_codes: BTreeMap<u16, u64>,
    pub first_access: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
    pub unique_ips: HashSet<String>,
    pub user_agents: HashSet<String>,
}

impl MetricRecord {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            total_response_time: 0,
            average_response_time: 0,
            status_codes: BTreeMap::new(),
            first_access: at,
            last_access: at,
            unique_ips: HashSet::new(),
            user_agents: HashSet::new(),
        }
    }

    /// Fold one observation into the aggregate.
    pub fn observe(&mut self, obs: &Observation) {
        self.count += 1;
        self.total_response_time = self.total_response_time.saturating_add(obs.latency_ms);
        self.average_response_time = rounded_mean(self.total_response_time, self.count);
        *self.status_codes.entry(obs.status).or_insert(0) += 1;
        if obs.at > self.last_access {
            self.last_access = obs.at;
        }
        if obs.at < self.first_access {
            self.first_access = obs.at;
        }
        self.unique_ips.insert(obs.ip.clone());
        self.user_agents.insert(obs.user_agent.clone());
    }

    pub fn has_errors(&self) -> bool {
        self.status_codes.keys().any(|&code| code >= 400)
    }

    /// 0.6·count + 0.3·recency + 0.1·distinct clients, to two decimals.
    pub fn popularity_score(&self, now: DateTime<Utc>) -> f64 {
        let requests = self.count as f64 * 0.6;
        let recency = recency_weight(self.last_access, now) as f64 * 0.3;
        let visitors = self.unique_ips.len() as f64 * 0.1;
        round2(requests + recency + visitors)
    }
}

/// Step function of hours since last access.
pub fn recency_weight(last_access: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let hours = (now - last_access).num_milliseconds() as f64 / 3_600_000.0;
    if hours < 1.0 {
        100
    } else if hours < 24.0 {
        80
    } else if hours < 168.0 {
        60
    } else {
        20
    }
}

pub(crate) fn rounded_mean(total: u64, count: u64) -> u64 {
    if count == 0 {
        0
    } else {
        (total as f64 / count as f64).round() as u64
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
