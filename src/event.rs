//! Persisted event log schema.
//!
//! One JSON object per line. Request lines:
//! ```text
//! {"timestamp":"…","method":"GET","route":"/users/{id}","statusCode":200,
//!  "responseTime":12,"ip":"127.0.0.1","userAgent":"curl/8.0","requestId":7}
//! ```
//! Report lines:
//! ```text
//! {"timestamp":"…","type":"REPORT","report":{…}}
//! ```

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Longest user agent persisted with an event, in characters.
pub const MAX_USER_AGENT_CHARS: usize = 100;

/// Placeholder for a missing client address or user agent.
pub const UNKNOWN: &str = "Unknown";

/// One finished request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub route: String,
    pub status_code: u16,
    /// Latency in milliseconds.
    pub response_time: u64,
    pub ip: String,
    pub user_agent: String,
    /// Monotonic per-process request sequence number.
    pub request_id: u64,
}

/// Tag carried by report lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    #[serde(rename = "REPORT", alias = "METRICS_REPORT")]
    Report,
}

/// A persisted report snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub report: serde_json::Value,
}

impl ReportEntry {
    /// Wrap a serialized report, stamped now.
    pub fn new(report: serde_json::Value) -> Self {
        Self {
            timestamp: now_millis(),
            kind: EntryKind::Report,
            report,
        }
    }
}

/// Any line of the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogEntry {
    Report(ReportEntry),
    Request(CompletionEvent),
}

impl LogEntry {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LogEntry::Report(r) => r.timestamp,
            LogEntry::Request(e) => e.timestamp,
        }
    }

    /// The request event, or `None` for report lines.
    pub fn as_request(&self) -> Option<&CompletionEvent> {
        match self {
            LogEntry::Request(e) => Some(e),
            LogEntry::Report(_) => None,
        }
    }

    /// Parse one log line; `None` for blank or malformed lines.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        serde_json::from_str(line).ok()
    }
}

/// Current time truncated to milliseconds, matching the on-disk precision.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Cap a user agent to [`MAX_USER_AGENT_CHARS`] characters.
pub fn truncate_user_agent(agent: &str) -> String {
    agent.chars().take(MAX_USER_AGENT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_line() {
        let line = r#"{"timestamp":"2026-10-18T09:15:00.250Z","method":"GET","route":"/users/{id}","statusCode":404,"responseTime":12,"ip":"10.0.0.1","userAgent":"curl/8.0","requestId":3}"#;
        let entry = LogEntry::parse_line(line).unwrap();
        let event = entry.as_request().unwrap();
        assert_eq!(event.route, "/users/{id}");
        assert_eq!(event.status_code, 404);
        assert_eq!(event.request_id, 3);
    }

    #[test]
    fn test_parse_report_line_accepts_legacy_tag() {
        let line = r#"{"timestamp":"2026-10-18T09:15:00Z","type":"METRICS_REPORT","report":{"summary":{}}}"#;
        let entry = LogEntry::parse_line(line).unwrap();
        assert!(entry.as_request().is_none());

        let out = serde_json::to_string(&entry).unwrap();
        assert!(out.contains(r#""type":"REPORT""#));
    }

    #[test]
    fn test_malformed_lines_are_rejected() {
        assert!(LogEntry::parse_line("").is_none());
        assert!(LogEntry::parse_line("{\"timestamp\":").is_none());
        assert!(LogEntry::parse_line(r#"{"method":"GET"}"#).is_none());
        assert!(LogEntry::parse_line("[ERROR] not json").is_none());
    }

    #[test]
    fn test_truncate_user_agent_counts_chars() {
        let long = "é".repeat(150);
        assert_eq!(truncate_user_agent(&long).chars().count(), 100);
        assert_eq!(truncate_user_agent("curl/8.0"), "curl/8.0");
    }
}
