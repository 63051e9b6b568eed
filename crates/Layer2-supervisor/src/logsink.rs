//! Log Sink - per-bot append-only output capture
//!
//! One log file per bot under the logs directory. The file is the only
//! log storage: the child appends to it directly through the handle the
//! spawner hands over, and tail/scan read it back. Besides the child the
//! only writer is the supervisor itself, which stamps remediation events.

use chrono::Utc;
use harbor_foundation::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Per-bot log file access
#[derive(Debug, Clone)]
pub struct LogSink {
    dir: PathBuf,
}

impl LogSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of a bot's log file
    pub fn log_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.log", name))
    }

    /// Open the bot's log for appending, creating it (and the logs
    /// directory) if needed. The handle is handed to exactly one launch.
    pub fn append_target(&self, name: &str) -> Result<std::fs::File> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| Error::Storage(format!("Failed to create log dir: {}", e)))?;
        let path = self.log_path(name);
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::Storage(format!("Failed to open {}: {}", path.display(), e)))
    }

    /// Last `n` lines of the bot's log, oldest first.
    ///
    /// Returns fewer lines when the log is shorter than `n`. Fails with
    /// NotFound when no log exists yet for that bot.
    pub fn tail(&self, name: &str, n: usize) -> Result<Vec<String>> {
        let text = self.read_all(name)?;
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(n);
        Ok(lines[start..].iter().map(|s| s.to_string()).collect())
    }

    /// Full log text, for failure scanning
    pub fn read_all(&self, name: &str) -> Result<String> {
        let path = self.log_path(name);
        if !path.exists() {
            return Err(Error::not_found(format!("no log for {}", name)));
        }
        std::fs::read_to_string(&path)
            .map_err(|e| Error::Storage(format!("Failed to read {}: {}", path.display(), e)))
    }

    /// Whether a log exists for the bot
    pub fn exists(&self, name: &str) -> bool {
        self.log_path(name).exists()
    }

    /// Append a timestamped supervisor event line to the bot's log
    pub fn append_event(&self, name: &str, message: &str) -> Result<()> {
        let mut file = self.append_target(name)?;
        writeln!(
            file,
            "[{}] harbor: {}",
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            message
        )
        .map_err(|e| Error::Storage(format!("Failed to append event: {}", e)))
    }

    /// Logs directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink(dir: &tempfile::TempDir) -> LogSink {
        LogSink::new(dir.path().join("logs"))
    }

    #[test]
    fn test_tail_missing_log_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = sink(&dir).tail("worker.py", 20).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_tail_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink(&dir);
        let mut file = sink.append_target("worker.py").unwrap();
        for i in 1..=5 {
            writeln!(file, "line{}", i).unwrap();
        }

        let tail = sink.tail("worker.py", 2).unwrap();
        assert_eq!(tail, vec!["line4", "line5"]);

        // never more lines than exist
        let all = sink.tail("worker.py", 100).unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0], "line1");
    }

    #[test]
    fn test_append_target_appends() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink(&dir);

        writeln!(sink.append_target("a.py").unwrap(), "first").unwrap();
        writeln!(sink.append_target("a.py").unwrap(), "second").unwrap();

        assert_eq!(sink.tail("a.py", 10).unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_append_event_is_stamped() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink(&dir);
        sink.append_event("a.py", "installing missing module 'requests'")
            .unwrap();

        let text = sink.read_all("a.py").unwrap();
        assert!(text.contains("harbor: installing missing module 'requests'"));
        assert!(text.starts_with('['));
    }
}
