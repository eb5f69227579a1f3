//! Scan progress reporting.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;

use mediashelf_core::ScanWarning;

/// Progress information during a scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanProgress {
    /// Number of batches emitted so far.
    pub dirs_scanned: u64,
    /// Number of files kept in emitted batches.
    pub files_scanned: u64,
    /// Total bytes of kept files.
    pub bytes_scanned: u64,
    /// Directories skipped by a directory-ignore rule.
    pub dirs_pruned: u64,
    /// Files dropped by a file-ignore rule.
    pub files_excluded: u64,
    /// Number of errors/warnings encountered.
    pub errors_count: u64,
    /// Directory most recently visited.
    pub current_path: PathBuf,
    /// Time elapsed since scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            dirs_scanned: 0,
            files_scanned: 0,
            bytes_scanned: 0,
            dirs_pruned: 0,
            files_excluded: 0,
            errors_count: 0,
            current_path: PathBuf::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Calculate scan rate in directories per second.
    pub fn dirs_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.dirs_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Final state of a finished (or cancelled) scan stream.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Counters at the time the stream stopped.
    pub progress: ScanProgress,
    /// Non-fatal problems encountered along the way.
    pub warnings: Vec<ScanWarning>,
    /// Whether the stream stopped because it was cancelled.
    pub cancelled: bool,
}

/// Internal progress tracker with timing.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    progress: ScanProgress,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            progress: ScanProgress::new(),
        }
    }

    pub fn record_file(&mut self, size: u64) {
        self.progress.files_scanned += 1;
        self.progress.bytes_scanned += size;
    }

    pub fn record_dir(&mut self, path: PathBuf) {
        self.progress.dirs_scanned += 1;
        self.progress.current_path = path;
    }

    pub fn record_pruned(&mut self) {
        self.progress.dirs_pruned += 1;
    }

    pub fn record_excluded(&mut self) {
        self.progress.files_excluded += 1;
    }

    pub fn record_error(&mut self) {
        self.progress.errors_count += 1;
    }

    pub fn dirs_scanned(&self) -> u64 {
        self.progress.dirs_scanned
    }

    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            elapsed: self.start_time.elapsed(),
            ..self.progress.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_counts() {
        let mut tracker = ProgressTracker::new();
        tracker.record_dir(PathBuf::from("/music"));
        tracker.record_file(100);
        tracker.record_file(50);
        tracker.record_pruned();
        tracker.record_excluded();
        tracker.record_error();

        let snap = tracker.snapshot();
        assert_eq!(snap.dirs_scanned, 1);
        assert_eq!(snap.files_scanned, 2);
        assert_eq!(snap.bytes_scanned, 150);
        assert_eq!(snap.dirs_pruned, 1);
        assert_eq!(snap.files_excluded, 1);
        assert_eq!(snap.errors_count, 1);
        assert_eq!(snap.current_path, PathBuf::from("/music"));
    }

    #[test]
    fn test_rate_with_zero_elapsed() {
        assert_eq!(ScanProgress::new().dirs_per_second(), 0.0);
    }
}
