//! Activity log entries and the bounded buffer that holds them.
//!
//! The dashboard shows logs newest-first, so the buffer prepends and the
//! renderer reads front to back. Capacity is fixed; the oldest entries
//! fall off the tail once a long-running session fills it.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Buffer size used when callers do not pick one.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogSeverity::Info => "info",
            LogSeverity::Success => "success",
            LogSeverity::Warning => "warning",
            LogSeverity::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// One line in the dashboard's activity feed.
///
/// The timestamp is captured when the entry is created, not when the
/// underlying event happened on the service side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub source_agent: String,
    pub message: String,
    pub severity: LogSeverity,
}

impl LogEntry {
    pub fn new(source_agent: &str, severity: LogSeverity, message: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            source_agent: source_agent.to_string(),
            message: message.to_string(),
            severity,
        }
    }

    pub fn info(source_agent: &str, message: &str) -> Self {
        Self::new(source_agent, LogSeverity::Info, message)
    }

    pub fn success(source_agent: &str, message: &str) -> Self {
        Self::new(source_agent, LogSeverity::Success, message)
    }

    pub fn warning(source_agent: &str, message: &str) -> Self {
        Self::new(source_agent, LogSeverity::Warning, message)
    }

    pub fn error(source_agent: &str, message: &str) -> Self {
        Self::new(source_agent, LogSeverity::Error, message)
    }
}

/// Bounded newest-first log store.
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    /// Prepends an entry, evicting the oldest one at capacity.
    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push_front(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
        }
    }

    /// Entries newest-first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
