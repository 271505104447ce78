//! Activity log - the user-visible event stream of a simulation.
//!
//! The pool and the supervisor describe what happens ("[Vendor-1] added 5
//! tickets", "Simulation ended.") as plain text lines appended to an
//! injected [`ActivityLog`]. This is separate from `tracing`, which carries
//! structured diagnostics; the activity log is what the HTTP layer returns
//! from `/api/logs`.
//!
//! Entries are opaque strings. Consumers may split them on newlines but
//! must not parse them.

use crate::environment::Clock;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Severity of an activity log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Normal progress
    Info,
    /// Rejected or degraded operation
    Warning,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
        }
    }
}

/// Render one entry as `<rfc3339 timestamp> <LEVEL>: <message>`.
#[must_use]
pub fn format_entry(at: DateTime<Utc>, level: LogLevel, message: &str) -> String {
    format!(
        "{} {level}: {message}",
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Append-only sink for activity log entries.
///
/// Implementations must be cheap to call from inside worker loops and must
/// never block on the ticket pool.
pub trait ActivityLog: Send + Sync {
    /// Append an entry.
    fn append(&self, level: LogLevel, message: &str);

    /// All retained entries, oldest first.
    fn entries(&self) -> Vec<String>;

    /// Drop every retained entry.
    fn clear(&self);

    /// Append an informational entry.
    fn info(&self, message: &str) {
        self.append(LogLevel::Info, message);
    }

    /// Append a warning entry.
    fn warn(&self, message: &str) {
        self.append(LogLevel::Warning, message);
    }
}

/// Bounded in-memory activity log.
///
/// Keeps at most `max_entries` lines; when full the oldest entry is dropped.
pub struct MemoryLog {
    entries: Mutex<VecDeque<String>>,
    max_entries: usize,
    clock: Arc<dyn Clock>,
}

impl MemoryLog {
    /// Create a log retaining at most `max_entries` lines.
    #[must_use]
    pub fn new(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            max_entries: max_entries.max(1),
            clock,
        }
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of retained entries.
    #[must_use]
    pub const fn max_entries(&self) -> usize {
        self.max_entries
    }
}

impl fmt::Debug for MemoryLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLog")
            .field("len", &self.len())
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}

impl ActivityLog for MemoryLog {
    fn append(&self, level: LogLevel, message: &str) {
        let line = format_entry(self.clock.now(), level, message);
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(line);
    }

    fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
