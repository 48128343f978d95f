//! Append-only line sink backed by a file.
//!
//! # Responsibilities
//! - Append timestamped text lines (operational trail)
//! - Append JSON lines (completion events, reports)
//! - Bulk read and whole-file rewrite for the statistics side
//!
//! # Design Decisions
//! - One `RwLock<()>` per sink guards the file: appends and rewrites take the
//!   write side, bulk reads take the read side
//! - Each line is written with a single `write_all` on an append-mode handle
//! - Rewrites go to a sibling temp file that is renamed over the log, so a
//!   crash mid-rewrite leaves the previous log intact

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

/// Error type for sink writes.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("log write failed: {0}")]
    Io(#[from] io::Error),
    #[error("log entry serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Severity of an operational trail line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailLevel {
    Info,
    Success,
    Warn,
    Error,
}

impl fmt::Display for TrailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrailLevel::Info => "INFO",
            TrailLevel::Success => "SUCCESS",
            TrailLevel::Warn => "WARN",
            TrailLevel::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Current time as an RFC 3339 UTC string with millisecond precision.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A file that only ever grows, except through [`LogSink::rewrite`].
#[derive(Debug)]
pub struct LogSink {
    path: PathBuf,
    lock: RwLock<()>,
}

impl LogSink {
    /// Create a sink for the given path. The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the parent directory of the log file if it is missing.
    pub fn ensure_parent_dir(&self) -> io::Result<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }

    /// Append one line. A trailing newline is added.
    pub fn append_line(&self, line: &str) -> io::Result<()> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(buf.as_bytes())
    }

    /// Serialize `value` as a single JSON line and append it.
    pub fn append_json<T: Serialize>(&self, value: &T) -> Result<(), SinkError> {
        let line = serde_json::to_string(value)?;
        self.append_line(&line)?;
        Ok(())
    }

    /// Append an operational trail entry: `[ts] [LEVEL] message`, followed by
    /// `details` on the next line when present.
    ///
    /// Failures are reported through `tracing` and otherwise ignored.
    pub fn write_log(&self, level: TrailLevel, message: &str, details: Option<&str>) {
        let mut entry = format!("[{}] [{}] {}", timestamp(), level, message);
        if let Some(details) = details {
            entry.push('\n');
            entry.push_str(details);
        }

        if let Err(e) = self.append_line(&entry) {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to write operational log");
        }
    }

    /// Read the whole file. Returns `None` when it does not exist.
    ///
    /// Invalid UTF-8 (a torn multi-byte write, say) is replaced with U+FFFD
    /// rather than failing the read; line parsers drop what they cannot use.
    pub fn read_all(&self) -> io::Result<Option<String>> {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        read_optional(&self.path)
    }

    /// Replace the file contents while holding exclusive access.
    ///
    /// `f` receives the current contents (`None` if the file is missing) and
    /// returns the new contents, or `None` to leave the file untouched, plus a
    /// value handed back to the caller.
    pub fn rewrite<F, R>(&self, f: F) -> io::Result<R>
    where
        F: FnOnce(Option<String>) -> (Option<String>, R),
    {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        let current = read_optional(&self.path)?;
        let (replacement, out) = f(current);

        if let Some(content) = replacement {
            let tmp = self.temp_path();
            {
                let mut file = fs::File::create(&tmp)?;
                file.write_all(content.as_bytes())?;
                file.sync_all()?;
            }
            if let Err(e) = fs::rename(&tmp, &self.path) {
                let _ = fs::remove_file(&tmp);
                return Err(e);
            }
        }

        Ok(out)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".rewrite");
        self.path.with_file_name(name)
    }
}

fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(
            String::from_utf8(bytes)
                .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
