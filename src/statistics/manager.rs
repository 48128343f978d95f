//! Offline analytics over the persisted event log.
//!
//! # Responsibilities
//! - Parse the log, tolerating corrupt lines
//! - Build daily and summary reports
//! - Apply retention by rewriting the log
//! - Write reports to disk
//!
//! # Design Decisions
//! - Blocking file I/O; async callers go through `spawn_blocking`
//! - Independent of the live tracker: only the log file is shared
//! - Cleanup runs under the sink's exclusive lock, so appends made while it
//!   runs land either before the rewrite or after it

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::event::LogEntry;
use crate::observability::{LogSink, TrailLevel};
use crate::statistics::daily::DailyReport;
use crate::statistics::summary::SummaryReport;
use crate::statistics::window_start;

/// Error type for statistics operations.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StatsError {
    fn io(path: &Path, source: io::Error) -> Self {
        StatsError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Reads, summarizes, and prunes an event log.
#[derive(Debug, Clone)]
pub struct StatisticsManager {
    sink: Arc<LogSink>,
    trail: Option<Arc<LogSink>>,
}

impl StatisticsManager {
    pub fn new(sink: Arc<LogSink>) -> Self {
        Self { sink, trail: None }
    }

    /// Also record cleanups and written reports on an operational log.
    pub fn with_trail(mut self, trail: Arc<LogSink>) -> Self {
        self.trail = Some(trail);
        self
    }

    pub fn log_path(&self) -> &Path {
        self.sink.path()
    }

    /// All parseable entries in log order. A missing log reads as empty.
    pub fn read_statistics(&self) -> Result<Vec<LogEntry>, StatsError> {
        let content = self
            .sink
            .read_all()
            .map_err(|e| StatsError::io(self.sink.path(), e))?;

        Ok(content
            .as_deref()
            .map(|c| c.lines().filter_map(LogEntry::parse_line).collect())
            .unwrap_or_default())
    }

    /// Breakdown of the requests logged on `date` (UTC).
    pub fn generate_daily_report(&self, date: NaiveDate) -> Result<DailyReport, StatsError> {
        let entries = self.read_statistics()?;
        Ok(DailyReport::build(date, &entries))
    }

    /// Summary of the last `days` days.
    pub fn generate_summary_report(&self, days: u32) -> Result<SummaryReport, StatsError> {
        self.generate_summary_report_at(days, Utc::now())
    }

    pub fn generate_summary_report_at(
        &self,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<SummaryReport, StatsError> {
        let entries = self.read_statistics()?;
        Ok(SummaryReport::build(days, now, &entries))
    }

    /// Drop entries older than `days_to_keep` days. Returns how many were
    /// discarded.
    pub fn clean_old_logs(&self, days_to_keep: u32) -> Result<usize, StatsError> {
        self.clean_old_logs_at(days_to_keep, Utc::now())
    }

    pub fn clean_old_logs_at(
        &self,
        days_to_keep: u32,
        now: DateTime<Utc>,
    ) -> Result<usize, StatsError> {
        let cutoff = window_start(now, days_to_keep);

        let outcome = self.sink.rewrite(|current| {
            let content = match current {
                Some(c) if !c.trim().is_empty() => c,
                _ => return (None, 0),
            };

            let mut parsed = 0usize;
            let mut dropped_lines = 0usize;
            let mut kept = String::with_capacity(content.len());

            for line in content.lines() {
                match LogEntry::parse_line(line) {
                    Some(entry) => {
                        parsed += 1;
                        if entry.timestamp() >= cutoff {
                            kept.push_str(line.trim());
                            kept.push('\n');
                        } else {
                            dropped_lines += 1;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => dropped_lines += 1,
                }
            }

            let removed = parsed - kept.lines().count();
            if dropped_lines == 0 {
                (None, removed)
            } else {
                (Some(kept), removed)
            }
        });

        match outcome {
            Ok(removed) => {
                if removed > 0 {
                    let message = format!(
                        "Cleaned {removed} old log entries (older than {days_to_keep} days)"
                    );
                    tracing::info!(removed, days_to_keep, path = %self.sink.path().display(), "Cleaned old log entries");
                    self.note(TrailLevel::Info, &message, None);
                }
                Ok(removed)
            }
            Err(e) => {
                tracing::error!(path = %self.sink.path().display(), error = %e, "Error cleaning old logs");
                self.note(TrailLevel::Error, "Error cleaning old logs", Some(&e.to_string()));
                Err(StatsError::io(self.sink.path(), e))
            }
        }
    }

    /// Write `report` as pretty-printed JSON to `path`. Returns the path
    /// written.
    pub fn write_report<T: Serialize>(&self, report: &T, path: &Path) -> Result<PathBuf, StatsError> {
        let content = serde_json::to_string_pretty(report)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StatsError::io(parent, e))?;
        }
        fs::write(path, content).map_err(|e| StatsError::io(path, e))?;

        tracing::info!(path = %path.display(), "Report written");
        self.note(TrailLevel::Info, &format!("Report written to: {}", path.display()), None);
        Ok(path.to_path_buf())
    }

    fn note(&self, level: TrailLevel, message: &str, details: Option<&str>) {
        if let Some(trail) = &self.trail {
            trail.write_log(level, message, details);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::CompletionEvent;

    fn temp_manager() -> (PathBuf, StatisticsManager) {
        let dir = std::env::temp_dir().join(format!("auto-router-stats-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let sink = Arc::new(LogSink::new(dir.join("metrics.log")));
        let trail = Arc::new(LogSink::new(dir.join("trail.log")));
        (dir, StatisticsManager::new(sink).with_trail(trail))
    }

    fn line(ts: &str, route: &str, status: u16) -> String {
        serde_json::to_string(&CompletionEvent {
            timestamp: ts.parse().unwrap(),
            method: "GET".to_string(),
            route: route.to_string(),
            status_code: status,
            response_time: 12,
            ip: "127.0.0.1".to_string(),
            user_agent: "test".to_string(),
            request_id: 1,
        })
        .unwrap()
    }

    fn write_log(dir: &Path, lines: &[String]) {
        let mut content = lines.join("\n");
        content.push('\n');
        fs::write(dir.join("metrics.log"), content).unwrap();
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let (dir, manager) = temp_manager();
        let mut lines: Vec<String> = (0..5)
            .map(|i| line(&format!("2026-10-18T0{i}:00:00Z"), "/users", 200))
            .collect();
        lines.insert(2, "{\"timestamp\": \"2026-10-18T0".to_string());
        write_log(&dir, &lines);

        let entries = manager.read_statistics().unwrap();
        assert_eq!(entries.len(), 5);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_torn_utf8_line_is_skipped() {
        let (dir, manager) = temp_manager();
        let mut content = Vec::new();
        for i in 0..5 {
            content.extend_from_slice(line(&format!("2026-10-18T0{i}:00:00Z"), "/users", 200).as_bytes());
            content.push(b'\n');
        }
        content.extend_from_slice(b"{\"userAgent\":\"\xc3\n");
        fs::write(manager.log_path(), content).unwrap();

        assert_eq!(manager.read_statistics().unwrap().len(), 5);

        let now: DateTime<Utc> = "2026-10-18T12:00:00Z".parse().unwrap();
        assert_eq!(manager.clean_old_logs_at(30, now).unwrap(), 0);
        let rewritten = fs::read_to_string(manager.log_path()).unwrap();
        assert_eq!(rewritten.lines().count(), 5);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_huge_retention_keeps_everything() {
        let (dir, manager) = temp_manager();
        write_log(
            &dir,
            &[
                line("1970-01-01T00:00:00Z", "/epoch", 200),
                line("2026-10-18T08:00:00Z", "/users", 200),
            ],
        );

        let now: DateTime<Utc> = "2026-10-18T12:00:00Z".parse().unwrap();
        assert_eq!(manager.clean_old_logs_at(u32::MAX, now).unwrap(), 0);
        let summary = manager.generate_summary_report_at(u32::MAX, now).unwrap();
        assert_eq!(summary.total_requests, 2);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_missing_log_is_empty() {
        let (dir, manager) = temp_manager();

        assert!(manager.read_statistics().unwrap().is_empty());
        assert_eq!(manager.clean_old_logs(30).unwrap(), 0);
        assert!(!manager.log_path().exists());

        fs::write(manager.log_path(), "").unwrap();
        assert_eq!(manager.clean_old_logs(30).unwrap(), 0);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_daily_report_is_idempotent() {
        let (dir, manager) = temp_manager();
        write_log(
            &dir,
            &[
                line("2026-10-18T08:00:00Z", "/users", 200),
                line("2026-10-18T09:00:00Z", "/login", 401),
                line("2026-10-18T09:30:00Z", "/users", 200),
            ],
        );

        let date: NaiveDate = "2026-10-18".parse().unwrap();
        let first = serde_json::to_string(&manager.generate_daily_report(date).unwrap()).unwrap();
        let second = serde_json::to_string(&manager.generate_daily_report(date).unwrap()).unwrap();
        assert_eq!(first, second);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_retention() {
        let (dir, manager) = temp_manager();
        let now: DateTime<Utc> = "2026-10-18T12:00:00Z".parse().unwrap();
        write_log(
            &dir,
            &[
                line("2026-08-01T12:00:00Z", "/ancient", 200),
                line("2026-09-17T11:59:59Z", "/old", 200),
                "not json".to_string(),
                line("2026-09-18T12:00:00Z", "/edge", 200),
                line("2026-10-18T11:00:00Z", "/fresh", 200),
            ],
        );

        let removed = manager.clean_old_logs_at(30, now).unwrap();
        assert_eq!(removed, 2);

        let routes: Vec<String> = manager
            .read_statistics()
            .unwrap()
            .iter()
            .filter_map(|e| e.as_request().map(|r| r.route.clone()))
            .collect();
        assert_eq!(routes, vec!["/edge", "/fresh"]);

        let content = fs::read_to_string(manager.log_path()).unwrap();
        assert_eq!(content.lines().count(), 2);

        // Nothing left to drop: the file is left as is.
        assert_eq!(manager.clean_old_logs_at(30, now).unwrap(), 0);
        assert_eq!(fs::read_to_string(manager.log_path()).unwrap(), content);

        let trail = fs::read_to_string(dir.join("trail.log")).unwrap();
        assert!(trail.contains("Cleaned 2 old log entries (older than 30 days)"));

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_write_report() {
        let (dir, manager) = temp_manager();
        write_log(&dir, &[line("2026-10-18T08:00:00Z", "/users", 200)]);

        let now: DateTime<Utc> = "2026-10-18T12:00:00Z".parse().unwrap();
        let summary = manager.generate_summary_report_at(7, now).unwrap();
        let target = dir.join("reports").join("summary.json");
        let written = manager.write_report(&summary, &target).unwrap();

        assert_eq!(written, target);
        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(parsed["totalRequests"], 1);
        assert_eq!(parsed["period"], "7 days");

        fs::remove_dir_all(dir).ok();
    }
}
