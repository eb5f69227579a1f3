//! Stack-driven streaming directory walker.
//!
//! [`DirectoryWalker::scan_stream`] returns a [`ScanStream`], a pull-based
//! iterator yielding one [`DirectoryBatch`] per visited directory. Nothing is
//! enumerated ahead of the consumer: each call to `next` pops one directory
//! from an explicit LIFO stack, lists it, and hands back its batch.

use std::fs::{DirEntry, Metadata};
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use mediashelf_core::{
    DirectoryBatch, FilesystemSnapshot, ScanConfig, ScanError, ScanWarning, WarningKind,
};

use crate::ignore::IgnoreEngine;
use crate::progress::{ProgressTracker, ScanProgress, ScanReport};
use crate::visited::VisitedDirs;

/// Streaming walker over a directory tree.
///
/// A walker is cheap to share: the ignore engine sits behind an `Arc` and
/// every call to [`Self::scan_stream`] gets its own independent state.
#[derive(Debug)]
pub struct DirectoryWalker {
    config: ScanConfig,
    ignore: Arc<IgnoreEngine>,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl DirectoryWalker {
    /// Create a walker with an explicit ignore engine.
    pub fn new(config: ScanConfig, ignore: Arc<IgnoreEngine>) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            config,
            ignore,
            progress_tx,
        }
    }

    /// Create a walker with the default ignore rules for `config`.
    pub fn from_config(config: ScanConfig) -> Result<Self, ScanError> {
        let ignore = Arc::new(IgnoreEngine::from_config(&config)?);
        Ok(Self::new(config, ignore))
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// The walker configuration.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// The shared ignore engine.
    pub fn ignore_engine(&self) -> &Arc<IgnoreEngine> {
        &self.ignore
    }

    /// Stream batches for the configured root.
    pub fn scan(&self, cancel: CancellationToken) -> ScanStream {
        self.scan_stream(&self.config.root, cancel)
    }

    /// Stream batches for `root`.
    ///
    /// A missing root produces an empty stream rather than an error.
    pub fn scan_stream(&self, root: impl AsRef<Path>, cancel: CancellationToken) -> ScanStream {
        let root = root.as_ref();
        let mut stream = ScanStream {
            stack: Vec::new(),
            ignore: Arc::clone(&self.ignore),
            follow_symlinks: self.config.follow_symlinks,
            max_depth: self.config.max_depth,
            progress_interval: self.config.progress_interval.max(1),
            progress_tx: self.progress_tx.clone(),
            cancel,
            tracker: ProgressTracker::new(),
            warnings: Vec::new(),
            visited: VisitedDirs::new(),
            finished: false,
        };

        match std::fs::metadata(root) {
            Ok(metadata) if metadata.is_dir() => {
                tracing::info!(root = %root.display(), "Starting scan");
                stream.stack.push(PendingDir {
                    snapshot: FilesystemSnapshot::from_metadata(root, &metadata),
                    parent: root.parent().map(Path::to_path_buf),
                    depth: 0,
                });
            }
            Ok(_) => {
                tracing::debug!(root = %root.display(), "Scan root is not a directory");
                stream.finished = true;
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(root = %root.display(), "Scan root does not exist");
                stream.finished = true;
            }
            Err(err) => {
                tracing::warn!(root = %root.display(), error = %err, "Cannot stat scan root");
                stream.push_warning(ScanWarning::from_io(root, &err, WarningKind::MetadataError));
                stream.finished = true;
            }
        }

        stream
    }
}

/// A directory waiting on the stack.
#[derive(Debug)]
struct PendingDir {
    snapshot: FilesystemSnapshot,
    parent: Option<PathBuf>,
    depth: u32,
}

/// A directory entry with its (possibly symlink-resolved) metadata.
struct Listed {
    path: PathBuf,
    metadata: Metadata,
}

/// Lazy sequence of [`DirectoryBatch`]es for one scan.
///
/// Not restartable: once consumed (or cancelled) it stays exhausted.
#[derive(Debug)]
pub struct ScanStream {
    stack: Vec<PendingDir>,
    ignore: Arc<IgnoreEngine>,
    follow_symlinks: bool,
    max_depth: Option<u32>,
    progress_interval: u64,
    progress_tx: broadcast::Sender<ScanProgress>,
    cancel: CancellationToken,
    tracker: ProgressTracker,
    warnings: Vec<ScanWarning>,
    visited: VisitedDirs,
    finished: bool,
}

impl ScanStream {
    /// Current progress counters.
    pub fn progress(&self) -> ScanProgress {
        self.tracker.snapshot()
    }

    /// Warnings collected so far.
    pub fn warnings(&self) -> &[ScanWarning] {
        &self.warnings
    }

    /// Whether the stream was stopped by its cancellation token.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Consume the stream, returning its final counters and warnings.
    ///
    /// Remaining directories are not visited.
    pub fn into_report(self) -> ScanReport {
        ScanReport {
            progress: self.tracker.snapshot(),
            cancelled: self.cancel.is_cancelled(),
            warnings: self.warnings,
        }
    }

    fn push_warning(&mut self, warning: ScanWarning) {
        self.tracker.record_error();
        self.warnings.push(warning);
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.stack.clear();
        let progress = self.tracker.snapshot();
        tracing::info!(
            dirs = progress.dirs_scanned,
            files = progress.files_scanned,
            pruned = progress.dirs_pruned,
            warnings = progress.errors_count,
            cancelled = self.cancel.is_cancelled(),
            "Scan finished"
        );
        let _ = self.progress_tx.send(progress);
    }

    /// List one directory and build its batch.
    ///
    /// Returns `None` only when cancellation was observed mid-directory.
    fn visit(&mut self, pending: PendingDir) -> Option<DirectoryBatch> {
        let dir = pending.snapshot.path.clone();
        let listed = match self.list(&dir) {
            Some(listed) => listed,
            None if self.cancel.is_cancelled() => return None,
            None => Vec::new(),
        };
        let (mut dirs, mut files): (Vec<Listed>, Vec<Listed>) =
            listed.into_iter().partition(|l| l.metadata.is_dir());
        files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
        dirs.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));

        if self.cancel.is_cancelled() {
            return None;
        }
        let mut entries = Vec::with_capacity(files.len() + dirs.len());
        for file in files {
            if let Some(rule) = self.ignore.matching_file_rule(&file.path, &dir) {
                tracing::trace!(path = %file.path.display(), rule, "Excluding file");
                self.tracker.record_excluded();
                continue;
            }
            let snapshot = FilesystemSnapshot::from_metadata(file.path, &file.metadata);
            self.tracker.record_file(snapshot.size_bytes);
            entries.push(snapshot);
        }

        if self.cancel.is_cancelled() {
            return None;
        }
        let child_depth = pending.depth + 1;
        let descend = self.max_depth.is_none_or(|max| child_depth <= max);
        let mut children = Vec::with_capacity(dirs.len());
        for sub in dirs {
            let snapshot = FilesystemSnapshot::from_metadata(sub.path, &sub.metadata);
            entries.push(snapshot.clone());
            if descend {
                children.push(PendingDir {
                    snapshot,
                    parent: Some(dir.clone()),
                    depth: child_depth,
                });
            }
        }
        // Reverse so the alphabetically first subdirectory is popped first.
        self.stack.extend(children.into_iter().rev());

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        self.tracker.record_dir(dir.clone());
        if self.tracker.dirs_scanned() % self.progress_interval == 0 {
            let _ = self.progress_tx.send(self.tracker.snapshot());
        }
        tracing::debug!(path = %dir.display(), entries = entries.len(), "Emitting batch");
        Some(DirectoryBatch::new(pending.snapshot, entries))
    }

    /// Read a directory listing, resolving metadata per entry.
    ///
    /// Failures on a single entry skip that entry; a failure to open the
    /// directory yields `None`. The directory handle is dropped before
    /// returning.
    fn list(&mut self, dir: &Path) -> Option<Vec<Listed>> {
        let read_dir = match std::fs::read_dir(dir) {
            Ok(read_dir) => read_dir,
            Err(err) => {
                tracing::warn!(path = %dir.display(), error = %err, "Failed to read directory");
                self.push_warning(ScanWarning::from_io(dir, &err, WarningKind::ReadError));
                return None;
            }
        };

        let mut listed = Vec::new();
        for entry in read_dir {
            if self.cancel.is_cancelled() {
                return None;
            }
            match entry {
                Ok(entry) => {
                    if let Some(item) = self.resolve_entry(entry) {
                        listed.push(item);
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        path = %dir.display(),
                        error = %err,
                        "Failed to read directory entry"
                    );
                    self.push_warning(ScanWarning::from_io(dir, &err, WarningKind::ReadError));
                }
            }
        }
        Some(listed)
    }

    fn resolve_entry(&mut self, entry: DirEntry) -> Option<Listed> {
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Failed to read file type");
                self.push_warning(ScanWarning::from_io(&path, &err, WarningKind::MetadataError));
                return None;
            }
        };

        let metadata = if file_type.is_symlink() {
            if !self.follow_symlinks {
                tracing::trace!(path = %path.display(), "Skipping symlink");
                return None;
            }
            match std::fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    self.push_warning(ScanWarning::broken_symlink(&path));
                    return None;
                }
                Err(err) => {
                    let warning = ScanWarning::from_io(&path, &err, WarningKind::MetadataError);
                    self.push_warning(warning);
                    return None;
                }
            }
        } else {
            match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "Failed to read metadata");
                    let warning = ScanWarning::from_io(&path, &err, WarningKind::MetadataError);
                    self.push_warning(warning);
                    return None;
                }
            }
        };

        // Sockets, devices and fifos are never media.
        if !metadata.is_dir() && !metadata.is_file() {
            return None;
        }
        Some(Listed { path, metadata })
    }
}

impl Iterator for ScanStream {
    type Item = DirectoryBatch;

    fn next(&mut self) -> Option<DirectoryBatch> {
        loop {
            if self.finished {
                return None;
            }
            if self.cancel.is_cancelled() {
                self.finish();
                return None;
            }
            let Some(pending) = self.stack.pop() else {
                self.finish();
                return None;
            };

            let path = &pending.snapshot.path;
            let parent = pending.parent.as_deref();
            if let Some(rule) = self.ignore.matching_directory_rule(path, parent) {
                tracing::trace!(path = %path.display(), rule, "Pruning directory");
                self.tracker.record_pruned();
                continue;
            }
            if self.follow_symlinks && !self.visited.enter(path) {
                tracing::warn!(path = %path.display(), "Directory already visited, not following");
                self.push_warning(ScanWarning::symlink_loop(path));
                continue;
            }

            match self.visit(pending) {
                Some(batch) => return Some(batch),
                None => {
                    self.finish();
                    return None;
                }
            }
        }
    }
}

impl FusedIterator for ScanStream {}
