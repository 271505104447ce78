//! Activity log backed by a plain text file.
//!
//! The file (default `logs/application.log`) is opened once in append mode
//! and written through a buffer, so an append from a worker loop is usually
//! a memory copy. The buffer is flushed before every read and clear, when it
//! fills up, and when the log is dropped.
//!
//! I/O failures never reach the caller: the pool appends from inside worker
//! loops, so a failed write is reported through `tracing` and dropped.
//! [`entries`](ActivityLog::entries) and [`clear`](ActivityLog::clear) do
//! touch the disk; async callers should run them on the blocking pool.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use ticket_pool_core::environment::Clock;
use ticket_pool_core::log::format_entry;
use ticket_pool_core::{ActivityLog, LogLevel};

/// File-backed [`ActivityLog`].
pub struct FileActivityLog {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    writer: Mutex<BufWriter<File>>,
}

impl std::fmt::Debug for FileActivityLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileActivityLog")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl FileActivityLog {
    /// Open (creating if needed) the log file and its parent directory.
    ///
    /// Existing content is kept.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory or file cannot be created.
    pub fn open(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            clock,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Location of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&self) -> MutexGuard<'_, BufWriter<File>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_entries(&self) -> io::Result<Vec<String>> {
        let mut writer = self.writer();
        writer.flush()?;
        let text = fs::read_to_string(&self.path)?;
        drop(writer);
        Ok(text.lines().map(str::to_owned).collect())
    }

    fn try_clear(&self) -> io::Result<()> {
        let mut writer = self.writer();
        writer.flush()?;
        // Append mode puts the next write at the new end.
        writer.get_ref().set_len(0)
    }
}

impl ActivityLog for FileActivityLog {
    fn append(&self, level: LogLevel, message: &str) {
        let line = format_entry(self.clock.now(), level, message);
        if let Err(err) = writeln!(self.writer(), "{line}") {
            tracing::warn!(path = %self.path.display(), error = %err, "Failed to write activity log");
        }
    }

    fn entries(&self) -> Vec<String> {
        self.try_entries().unwrap_or_else(|err| {
            tracing::warn!(path = %self.path.display(), error = %err, "Error reading log file");
            Vec::new()
        })
    }

    fn clear(&self) {
        if let Err(err) = self.try_clear() {
            tracing::warn!(path = %self.path.display(), error = %err, "Error clearing log file");
        }
    }
}
