//! Visited-directory tracking for symlink loop detection.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

/// Identity of a directory on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DirIdentity {
    /// (device, inode) pair.
    #[cfg_attr(not(unix), allow(dead_code))]
    Inode(u64, u64),
    /// Canonical path, used where inodes are unavailable.
    #[cfg_attr(unix, allow(dead_code))]
    Canonical(PathBuf),
}

/// Tracks directories already entered during one walker pass.
///
/// Only consulted when symlinks are followed; without symlinks a directory
/// tree cannot contain a cycle.
#[derive(Debug, Default)]
pub struct VisitedDirs {
    seen: HashSet<DirIdentity>,
}

impl VisitedDirs {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a directory. Returns `true` the first time it is seen.
    ///
    /// A directory whose identity cannot be determined is always treated as
    /// new.
    pub fn enter(&mut self, path: &Path) -> bool {
        match identity_of(path) {
            Some(id) => self.seen.insert(id),
            None => true,
        }
    }

    /// Number of distinct directories entered.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if no directories have been entered.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(unix)]
fn identity_of(path: &Path) -> Option<DirIdentity> {
    let metadata = std::fs::metadata(path).ok()?;
    Some(DirIdentity::Inode(metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn identity_of(path: &Path) -> Option<DirIdentity> {
    std::fs::canonicalize(path).ok().map(DirIdentity::Canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_enter_twice() {
        let temp = TempDir::new().unwrap();
        let mut visited = VisitedDirs::new();

        assert!(visited.enter(temp.path()));
        assert!(!visited.enter(temp.path()));
        assert_eq!(visited.len(), 1);
    }

    #[test]
    fn test_distinct_directories() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        std::fs::create_dir(&a).unwrap();
        std::fs::create_dir(&b).unwrap();

        let mut visited = VisitedDirs::new();
        assert!(visited.enter(&a));
        assert!(visited.enter(&b));
        assert_eq!(visited.len(), 2);
    }

    #[test]
    fn test_missing_directory_is_new() {
        let mut visited = VisitedDirs::new();
        assert!(visited.enter(Path::new("/no/such/dir")));
        assert!(visited.is_empty());
    }
}
