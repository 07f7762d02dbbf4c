// Run statistics: pages walked, artifacts written, environments skipped.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;

/// Why the driver loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A page came back empty.
    Completed,
    /// Listing a page failed; no further pages were requested.
    Aborted { page: u32, reason: String },
    /// Stopped by the cancellation token.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEnvironment {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct BackupSummary {
    pub pages_fetched: u32,
    pub states_downloaded: u64,
    pub placeholders_written: u64,
    pub bytes_written: u64,
    pub skipped: Vec<SkippedEnvironment>,
    pub outcome: RunOutcome,
}

impl BackupSummary {
    /// Environments whose artifact landed on disk.
    pub fn processed(&self) -> u64 {
        self.states_downloaded + self.placeholders_written
    }
}

pub struct BackupStats {
    pages_fetched: AtomicU32,
    states_downloaded: AtomicU64,
    placeholders_written: AtomicU64,
    bytes_written: AtomicU64,
    skipped: Mutex<Vec<SkippedEnvironment>>,
}

impl BackupStats {
    pub fn new() -> Self {
        Self {
            pages_fetched: AtomicU32::new(0),
            states_downloaded: AtomicU64::new(0),
            placeholders_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            skipped: Mutex::new(Vec::new()),
        }
    }

    pub fn record_page(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_download(&self, bytes: u64) {
        self.states_downloaded.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_placeholder(&self, bytes: u64) {
        self.placeholders_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_skipped(&self, name: &str, reason: impl Into<String>) {
        self.skipped.lock().push(SkippedEnvironment {
            name: name.to_string(),
            reason: reason.into(),
        });
    }

    pub fn processed(&self) -> u64 {
        self.states_downloaded.load(Ordering::Relaxed)
            + self.placeholders_written.load(Ordering::Relaxed)
    }

    pub fn summary(&self, outcome: RunOutcome) -> BackupSummary {
        BackupSummary {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            states_downloaded: self.states_downloaded.load(Ordering::Relaxed),
            placeholders_written: self.placeholders_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            skipped: self.skipped.lock().clone(),
            outcome,
        }
    }
}

impl Default for BackupStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_summary() {
        let stats = BackupStats::new();
        stats.record_page();
        stats.record_page();
        stats.record_download(100);
        stats.record_download(50);
        stats.record_placeholder(14);
        stats.record_skipped("broken", "HTTP 500");

        assert_eq!(stats.processed(), 3);

        let summary = stats.summary(RunOutcome::Completed);
        assert_eq!(summary.pages_fetched, 2);
        assert_eq!(summary.states_downloaded, 2);
        assert_eq!(summary.placeholders_written, 1);
        assert_eq!(summary.bytes_written, 164);
        assert_eq!(summary.processed(), 3);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].name, "broken");
        assert_eq!(summary.outcome, RunOutcome::Completed);
    }

    #[test]
    fn test_empty_run_counts_zero() {
        let summary = BackupStats::new().summary(RunOutcome::Cancelled);
        assert_eq!(summary.processed(), 0);
        assert!(summary.skipped.is_empty());
    }
}
