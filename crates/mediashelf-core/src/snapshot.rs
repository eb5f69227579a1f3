//! Filesystem snapshots and per-directory batches.

use std::fs::Metadata;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Stat-level metadata for one path, captured once per scan pass.
///
/// Snapshots are immutable: nothing downstream of the walker mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemSnapshot {
    /// Full path of the entry.
    pub path: PathBuf,
    /// File or directory name (last path component).
    pub name: CompactString,
    /// Extension without the leading dot, as it appears on disk.
    pub extension: CompactString,
    /// Whether the entry is a directory.
    pub is_directory: bool,
    /// Size in bytes (zero for directories).
    pub size_bytes: u64,
    /// Last modification time.
    pub last_modified_utc: DateTime<Utc>,
}

impl FilesystemSnapshot {
    /// Build a snapshot from already-fetched metadata.
    pub fn from_metadata(path: impl Into<PathBuf>, metadata: &Metadata) -> Self {
        let path = path.into();
        let is_directory = metadata.is_dir();
        let modified = metadata.modified().unwrap_or(std::time::UNIX_EPOCH);
        Self {
            name: file_name_of(&path),
            extension: if is_directory {
                CompactString::default()
            } else {
                extension_of(&path)
            },
            is_directory,
            size_bytes: if is_directory { 0 } else { metadata.len() },
            last_modified_utc: DateTime::<Utc>::from(modified),
            path,
        }
    }

    /// Stat `path` (following symlinks) and capture a snapshot.
    pub fn capture(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let metadata = std::fs::metadata(&path)?;
        Ok(Self::from_metadata(path, &metadata))
    }

    /// Construct a snapshot without touching the disk.
    ///
    /// Useful for callers that already know the shape of an entry, and for
    /// tests that exercise resolvers against synthetic listings.
    pub fn synthetic(
        path: impl Into<PathBuf>,
        is_directory: bool,
        size_bytes: u64,
        last_modified_utc: DateTime<Utc>,
    ) -> Self {
        let path = path.into();
        Self {
            name: file_name_of(&path),
            extension: if is_directory {
                CompactString::default()
            } else {
                extension_of(&path)
            },
            is_directory,
            size_bytes,
            last_modified_utc,
            path,
        }
    }

    /// File name with its extension removed.
    pub fn stem(&self) -> &str {
        if self.extension.is_empty() {
            &self.name
        } else {
            // name always ends with ".{extension}" when an extension exists
            &self.name[..self.name.len() - self.extension.len() - 1]
        }
    }

    /// Lowercased extension, the form used for format detection.
    pub fn format(&self) -> CompactString {
        self.extension.to_lowercase().into()
    }

    /// Parent directory of this entry, if any.
    pub fn parent(&self) -> Option<&Path> {
        self.path.parent()
    }
}

fn file_name_of(path: &Path) -> CompactString {
    path.file_name()
        .map(|n| CompactString::new(n.to_string_lossy()))
        .unwrap_or_else(|| CompactString::new(path.to_string_lossy()))
}

fn extension_of(path: &Path) -> CompactString {
    path.extension()
        .map(|e| CompactString::new(e.to_string_lossy()))
        .unwrap_or_default()
}

/// One directory's listing, emitted by the walker for a single visited
/// directory.
///
/// Entries hold both the files that survived the file-ignore rules and
/// every immediate subdirectory, so a resolver can claim a whole subtree
/// without going back to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryBatch {
    /// Path of the visited directory.
    pub directory_path: PathBuf,
    /// Snapshot of the visited directory itself.
    pub directory: FilesystemSnapshot,
    /// Kept files and subdirectory markers, ordered by name.
    pub entries: Vec<FilesystemSnapshot>,
}

impl DirectoryBatch {
    /// Create a batch for a directory.
    pub fn new(directory: FilesystemSnapshot, entries: Vec<FilesystemSnapshot>) -> Self {
        Self {
            directory_path: directory.path.clone(),
            directory,
            entries,
        }
    }

    /// Iterate over file entries.
    pub fn files(&self) -> impl Iterator<Item = &FilesystemSnapshot> {
        self.entries.iter().filter(|e| !e.is_directory)
    }

    /// Iterate over subdirectory entries.
    pub fn subdirectories(&self) -> impl Iterator<Item = &FilesystemSnapshot> {
        self.entries.iter().filter(|e| e.is_directory)
    }

    /// Number of file entries.
    pub fn file_count(&self) -> usize {
        self.files().count()
    }

    /// Total size of file entries in bytes.
    pub fn total_size(&self) -> u64 {
        self.files().map(|f| f.size_bytes).sum()
    }
}

/// List the immediate children of `dir` as snapshots, ordered by name.
///
/// This is the read-only listing resolvers fall back to when no prefetched
/// children are supplied. Any access error on the directory yields an empty
/// listing; an error on a single entry drops only that entry.
pub fn read_children(dir: &Path) -> Vec<FilesystemSnapshot> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(path = %dir.display(), error = %err, "Failed to list directory");
            return Vec::new();
        }
    };

    let mut children: Vec<FilesystemSnapshot> = entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            match std::fs::metadata(&path) {
                Ok(metadata) => Some(FilesystemSnapshot::from_metadata(path, &metadata)),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "Failed to stat entry");
                    None
                }
            }
        })
        .collect();
    children.sort_by(|a, b| a.name.cmp(&b.name));
    children
}
