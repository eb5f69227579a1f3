//! Music album resolver.
//!
//! Claims directories that directly hold audio files or disc folders
//! (`CD1`, `Disc 2`, ...) and turns them into a
//! ReleaseGroup -> Release -> Medium -> Track -> MediaItem -> MediaPart tree.
//! Artist folders hold neither and are left for a later resolver.

mod album;
pub mod naming;

use std::path::Path;
use std::sync::Arc;

use mediashelf_core::{
    FilesystemSnapshot, LibraryKind, MediaNode, ResolveContext, ResolverConfig, read_children,
};
use mediashelf_scan::IgnoreEngine;

use crate::registry::Resolver;
use album::AlbumBuilder;
use naming::{disc_number, is_disc_folder};

/// Dispatch priority of [`MusicAlbumResolver`].
pub const MUSIC_ALBUM_PRIORITY: i32 = 100;

/// Resolves album folders in music libraries.
///
/// Children are filtered through the same [`IgnoreEngine`] the walker uses,
/// so disc folders the walk prunes never become media and excluded files
/// never become tracks.
#[derive(Debug, Clone)]
pub struct MusicAlbumResolver {
    config: ResolverConfig,
    ignore: Arc<IgnoreEngine>,
}

impl MusicAlbumResolver {
    /// Create a resolver applying `ignore` to every listing it inspects.
    pub fn new(config: ResolverConfig, ignore: Arc<IgnoreEngine>) -> Self {
        Self { config, ignore }
    }

    fn is_audio(&self, entry: &FilesystemSnapshot, parent: &Path) -> bool {
        !entry.is_directory
            && self.config.is_audio_extension(&entry.extension)
            && !self.ignore.should_ignore_file(&entry.path, parent)
    }

    fn is_disc(&self, entry: &FilesystemSnapshot, parent: &Path) -> bool {
        entry.is_directory
            && is_disc_folder(&entry.name)
            && !self.ignore.should_ignore_directory(&entry.path, Some(parent))
    }

    fn audio_files_in(&self, folder: &FilesystemSnapshot) -> Vec<FilesystemSnapshot> {
        read_children(&folder.path)
            .into_iter()
            .filter(|entry| self.is_audio(entry, &folder.path))
            .collect()
    }
}

impl Default for MusicAlbumResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default(), Arc::new(IgnoreEngine::standard()))
    }
}

impl Resolver for MusicAlbumResolver {
    fn name(&self) -> &str {
        "music_album"
    }

    fn priority(&self) -> i32 {
        MUSIC_ALBUM_PRIORITY
    }

    fn resolve(&self, ctx: &ResolveContext) -> Option<MediaNode> {
        let snapshot = &ctx.snapshot;
        if ctx.library_kind != LibraryKind::Music
            || !snapshot.is_directory
            || ctx.is_library_root
            || is_disc_folder(&snapshot.name)
        {
            return None;
        }

        let children = ctx.children();
        let audio_files: Vec<&FilesystemSnapshot> = children
            .iter()
            .filter(|entry| self.is_audio(entry, &snapshot.path))
            .collect();
        let mut disc_folders: Vec<(u32, &FilesystemSnapshot)> = children
            .iter()
            .filter(|entry| self.is_disc(entry, &snapshot.path))
            .map(|entry| (disc_number(&entry.name), entry))
            .collect();

        if audio_files.is_empty() && disc_folders.is_empty() {
            return None;
        }

        let builder = AlbumBuilder::new(ctx.library_section_id);
        let media = if disc_folders.is_empty() {
            builder.loose_file_media(&audio_files)
        } else {
            disc_folders.sort_by(|(a, fa), (b, fb)| {
                (a, fa.name.as_bytes()).cmp(&(b, fb.name.as_bytes()))
            });
            let folders: Vec<(u32, Vec<FilesystemSnapshot>)> = disc_folders
                .into_iter()
                .map(|(disc, folder)| (disc, self.audio_files_in(folder)))
                .collect();
            builder.disc_folder_media(&folders, &audio_files)
        };

        tracing::trace!(
            path = %snapshot.path.display(),
            media = media.len(),
            "Built album"
        );
        Some(builder.release_group(&snapshot.name, media))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mediashelf_core::EntityKind;

    fn dir(path: &str) -> FilesystemSnapshot {
        FilesystemSnapshot::synthetic(path, true, 0, Utc::now())
    }

    fn file(path: &str) -> FilesystemSnapshot {
        FilesystemSnapshot::synthetic(path, false, 1024, Utc::now())
    }

    fn ctx(snapshot: FilesystemSnapshot, children: Vec<FilesystemSnapshot>) -> ResolveContext {
        ResolveContext::new(snapshot, LibraryKind::Music)
            .with_children(children)
            .with_section(3, 1)
    }

    #[test]
    fn test_guards() {
        let resolver = MusicAlbumResolver::default();
        let album = || vec![file("/m/Album/01 - A.mp3")];

        let movies =
            ResolveContext::new(dir("/m/Album"), LibraryKind::Movies).with_children(album());
        assert!(resolver.resolve(&movies).is_none());

        let root = ctx(dir("/m/Album"), album()).with_library_root(true);
        assert!(resolver.resolve(&root).is_none());

        assert!(resolver.resolve(&ctx(file("/m/Album/01 - A.mp3"), vec![])).is_none());
        assert!(resolver.resolve(&ctx(dir("/m/Album/CD1"), album())).is_none());

        assert!(resolver.resolve(&ctx(dir("/m/Album"), album())).is_some());
    }

    #[test]
    fn test_artist_folder_not_claimed() {
        let resolver = MusicAlbumResolver::default();
        let children = vec![
            dir("/m/Artist/Album One"),
            dir("/m/Artist/Album Two"),
            file("/m/Artist/cover.jpg"),
        ];
        assert!(resolver.resolve(&ctx(dir("/m/Artist"), children)).is_none());
    }

    #[test]
    fn test_non_audio_files_ignored() {
        let resolver = MusicAlbumResolver::default();
        let children = vec![
            file("/m/Album/cover.jpg"),
            file("/m/Album/01 - A.MP3"),
            file("/m/Album/notes.txt"),
        ];
        let group = resolver.resolve(&ctx(dir("/m/Album"), children)).unwrap();
        assert_eq!(group.tracks().count(), 1);
    }

    #[test]
    fn test_tree_shape() {
        let resolver = MusicAlbumResolver::default();
        let children = vec![file("/m/Abbey Road/01 - Come Together.flac")];
        let group = resolver.resolve(&ctx(dir("/m/Abbey Road"), children)).unwrap();

        assert_eq!(group.kind, EntityKind::ReleaseGroup);
        assert_eq!(group.title, "Abbey Road");
        assert_eq!(group.parent, None);

        let release = &group.children[0];
        assert_eq!(group.children.len(), 1);
        assert_eq!(release.kind, EntityKind::Release);
        assert_eq!(release.title, "Abbey Road");
        assert_eq!(release.parent, Some(group.id));

        let medium = &release.children[0];
        assert_eq!(medium.kind, EntityKind::Medium { index: 1 });
        assert_eq!(medium.title, "Disc 1");

        let track = &medium.children[0];
        assert_eq!(track.title, "Come Together");
        assert_eq!(track.parent, Some(medium.id));
        let item = &track.children[0];
        assert_eq!(item.kind, EntityKind::MediaItem);
        assert!(matches!(item.children[0].kind, EntityKind::MediaPart(_)));
        assert!(group.walk().all(|n| n.library_section_id == 3));
    }

    #[test]
    fn test_ignored_files_not_classified() {
        let children = vec![file("/m/Album/._01 - A.mp3"), file("/m/Album/01 - A.mp3")];
        let group = MusicAlbumResolver::default()
            .resolve(&ctx(dir("/m/Album"), children.clone()))
            .unwrap();
        let titles: Vec<_> = group.tracks().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["A"]);

        let permissive =
            MusicAlbumResolver::new(ResolverConfig::default(), Arc::new(IgnoreEngine::new()));
        let group = permissive.resolve(&ctx(dir("/m/Album"), children)).unwrap();
        assert_eq!(group.tracks().count(), 2);
    }
}
