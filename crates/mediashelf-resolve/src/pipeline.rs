//! Scan-and-resolve pipeline for one section location.
//!
//! Every batch the walker yields is offered to the registry as a candidate
//! directory, with the batch entries as its prefetched children.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use mediashelf_core::{
    DirectoryBatch, LibrarySection, MediaNode, ResolveContext, SectionLocation,
};
use mediashelf_scan::{DirectoryWalker, ScanProgress, ScanReport, ScanStream};

use crate::registry::ResolverRegistry;

/// A walker batch and the entity tree it resolved to, if any.
#[derive(Debug, Clone)]
pub struct ResolvedDirectory {
    pub batch: DirectoryBatch,
    /// Name of the resolver that claimed the directory.
    pub resolver: Option<String>,
    pub entity: Option<MediaNode>,
}

impl ResolvedDirectory {
    /// Whether a resolver claimed this directory.
    pub fn is_resolved(&self) -> bool {
        self.entity.is_some()
    }
}

/// Pull-based iterator pairing each batch with its resolution.
#[derive(Debug)]
pub struct SectionScan {
    stream: ScanStream,
    registry: Arc<ResolverRegistry>,
    section: LibrarySection,
    location: SectionLocation,
}

impl SectionScan {
    /// Scan `location` with `walker` and resolve each directory against
    /// `registry`.
    pub fn new(
        walker: &DirectoryWalker,
        registry: Arc<ResolverRegistry>,
        section: LibrarySection,
        location: SectionLocation,
        cancel: CancellationToken,
    ) -> Self {
        tracing::info!(
            section = section.id,
            location = location.id,
            path = %location.path.display(),
            "Scanning section location"
        );
        let stream = walker.scan_stream(&location.path, cancel);
        Self {
            stream,
            registry,
            section,
            location,
        }
    }

    /// Current walker progress.
    pub fn progress(&self) -> ScanProgress {
        self.stream.progress()
    }

    /// Stop resolving and return the walker's report.
    pub fn into_report(self) -> ScanReport {
        self.stream.into_report()
    }
}

impl Iterator for SectionScan {
    type Item = ResolvedDirectory;

    fn next(&mut self) -> Option<Self::Item> {
        let batch = self.stream.next()?;
        let ctx = ResolveContext::for_batch(&batch, &self.section, &self.location);
        let (resolver, entity) = match self.registry.resolve_named(&ctx) {
            Some((name, node)) => (Some(name.to_string()), Some(node)),
            None => (None, None),
        };
        Some(ResolvedDirectory {
            batch,
            resolver,
            entity,
        })
    }
}

/// Run a [`SectionScan`] on the blocking pool, delivering results through a
/// bounded channel.
///
/// The walker only advances while the channel has room, so a slow consumer
/// throttles the scan. Dropping the receiver stops the scan at the next
/// batch. The join handle yields the walker's report.
pub fn spawn_section_scan(
    walker: Arc<DirectoryWalker>,
    registry: Arc<ResolverRegistry>,
    section: LibrarySection,
    location: SectionLocation,
    cancel: CancellationToken,
    buffer: usize,
) -> (mpsc::Receiver<ResolvedDirectory>, JoinHandle<ScanReport>) {
    let (tx, rx) = mpsc::channel(buffer.max(1));

    let handle = tokio::task::spawn_blocking(move || {
        let mut scan = SectionScan::new(&walker, registry, section, location, cancel);
        for resolved in scan.by_ref() {
            if tx.blocking_send(resolved).is_err() {
                tracing::debug!("Receiver dropped, stopping section scan");
                break;
            }
        }
        scan.into_report()
    });

    (rx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediashelf_core::{LibraryKind, ScanConfig};
    use mediashelf_scan::IgnoreEngine;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, LibrarySection, SectionLocation) {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("music");
        fs::create_dir_all(root.join("Artist/Album")).unwrap();
        fs::write(root.join("Artist/Album/01 - A.mp3"), "a").unwrap();
        fs::write(root.join("loose.mp3"), "a").unwrap();

        let location = SectionLocation { id: 7, path: root };
        let section = LibrarySection {
            id: 2,
            name: "Music".to_string(),
            kind: LibraryKind::Music,
            locations: vec![location.clone()],
        };
        (temp, section, location)
    }

    fn registry(walker: &DirectoryWalker) -> Arc<ResolverRegistry> {
        let ignore = Arc::clone(walker.ignore_engine());
        Arc::new(ResolverRegistry::with_defaults(&Default::default(), ignore))
    }

    #[test]
    fn test_section_scan_resolves_albums_only() {
        let (_temp, section, location) = setup();
        let walker =
            DirectoryWalker::new(ScanConfig::new(&location.path), Arc::new(IgnoreEngine::new()));

        let cancel = CancellationToken::new();
        let results: Vec<_> =
            SectionScan::new(&walker, registry(&walker), section, location.clone(), cancel)
                .collect();
        assert_eq!(results.len(), 3);

        // library root holds an audio file but is never claimed
        assert_eq!(results[0].batch.directory_path, location.path);
        assert!(!results[0].is_resolved());
        // artist folder
        assert!(!results[1].is_resolved());

        let album = &results[2];
        assert_eq!(album.resolver.as_deref(), Some("music_album"));
        let entity = album.entity.as_ref().unwrap();
        assert_eq!(entity.title, "Album");
        assert_eq!(entity.library_section_id, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_spawned_scan_delivers_all_batches() {
        let (_temp, section, location) = setup();
        let walker = Arc::new(DirectoryWalker::new(
            ScanConfig::new(&location.path),
            Arc::new(IgnoreEngine::new()),
        ));

        let registry = registry(&walker);
        let cancel = CancellationToken::new();
        let (mut rx, handle) = spawn_section_scan(walker, registry, section, location, cancel, 1);
        let mut resolved = 0;
        let mut total = 0;
        while let Some(dir) = rx.recv().await {
            total += 1;
            resolved += usize::from(dir.is_resolved());
        }
        let report = handle.await.unwrap();

        assert_eq!(total, 3);
        assert_eq!(resolved, 1);
        assert_eq!(report.progress.dirs_scanned, 3);
        assert!(!report.cancelled);
    }
}
