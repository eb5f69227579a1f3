//! Entity tree assembly for one album.

use std::collections::BTreeMap;

use mediashelf_core::{EntityKind, FilesystemSnapshot, MediaNode, MediaPart};

use super::naming::{ParseMode, detect_multi_disc, disc_group, parse_track_name};

/// Shared inputs for building the media of one release.
pub(crate) struct AlbumBuilder {
    section_id: i64,
}

impl AlbumBuilder {
    pub(crate) fn new(section_id: i64) -> Self {
        Self { section_id }
    }

    /// ReleaseGroup -> Release, both titled after the album folder.
    pub(crate) fn release_group(&self, title: &str, media: Vec<MediaNode>) -> MediaNode {
        let mut release = MediaNode::new(EntityKind::Release, title, self.section_id);
        for medium in media {
            release.push_child(medium);
        }
        MediaNode::new(EntityKind::ReleaseGroup, title, self.section_id).with_child(release)
    }

    /// Media for an album laid out as disc folders.
    ///
    /// `folders` must already be in disc order. Loose audio files beside the
    /// folders become a leading disc with index 0, and absolute indices are
    /// renumbered across every disc once it is in place.
    pub(crate) fn disc_folder_media(
        &self,
        folders: &[(u32, Vec<FilesystemSnapshot>)],
        loose: &[&FilesystemSnapshot],
    ) -> Vec<MediaNode> {
        let (mut media, _) = folders.iter().fold(
            (Vec::with_capacity(folders.len() + 1), 1),
            |(mut media, next), (disc, files)| {
                let files: Vec<&FilesystemSnapshot> = files.iter().collect();
                let (medium, next) =
                    self.medium(format!("Disc {disc}"), *disc, &files, ParseMode::Standard, next);
                media.push(medium);
                (media, next)
            },
        );

        if !loose.is_empty() {
            let (medium, _) = self.medium("Disc 1".to_string(), 0, loose, ParseMode::Standard, 1);
            media.insert(0, medium);
            renumber_absolute_indices(&mut media);
        }
        media
    }

    /// Media for an album whose tracks sit directly in the album folder.
    ///
    /// When the `DTT` prefixes span more than one disc, files are grouped by
    /// disc digit into one disc each. Otherwise a single disc is built with
    /// standard track parsing.
    pub(crate) fn loose_file_media(&self, files: &[&FilesystemSnapshot]) -> Vec<MediaNode> {
        if !detect_multi_disc(files.iter().map(|file| file.stem())) {
            let (medium, _) = self.medium("Disc 1".to_string(), 1, files, ParseMode::Standard, 1);
            return vec![medium];
        }

        let mut groups: BTreeMap<u32, Vec<&FilesystemSnapshot>> = BTreeMap::new();
        for file in files {
            groups.entry(disc_group(file.stem())).or_default().push(*file);
        }

        tracing::trace!(discs = groups.len(), "Detected multi-disc track numbering");
        let mut next = 1;
        groups
            .into_iter()
            .map(|(disc, group)| {
                let (medium, after) =
                    self.medium(format!("Disc {disc}"), disc, &group, ParseMode::MultiDisc, next);
                next = after;
                medium
            })
            .collect()
    }

    /// Build one medium and return it with the next free absolute index.
    fn medium(
        &self,
        title: String,
        index: u32,
        files: &[&FilesystemSnapshot],
        mode: ParseMode,
        first_absolute: u32,
    ) -> (MediaNode, u32) {
        let mut parsed: Vec<_> = files
            .iter()
            .map(|file| (parse_track_name(file.stem(), mode), *file))
            .collect();
        // Numbered tracks first, then by raw file name bytes.
        parsed.sort_by(|(a, fa), (b, fb)| {
            (a.track.is_none(), a.track, fa.name.as_bytes())
                .cmp(&(b.track.is_none(), b.track, fb.name.as_bytes()))
        });

        let mut medium = MediaNode::new(EntityKind::Medium { index }, title, self.section_id);
        let mut absolute = first_absolute;
        for (position, (track, file)) in parsed.into_iter().enumerate() {
            let kind = EntityKind::Track {
                index: track.track.unwrap_or(position as u32 + 1),
                absolute_index: absolute,
                disc_number: track.disc,
                track_number: track.track,
            };
            medium.push_child(
                MediaNode::new(kind, track.title.as_str(), self.section_id)
                    .with_child(self.media_item(&track.title, file)),
            );
            absolute += 1;
        }
        (medium, absolute)
    }

    fn media_item(&self, title: &str, file: &FilesystemSnapshot) -> MediaNode {
        let part = MediaPart {
            path: file.path.clone(),
            size: file.size_bytes,
            modified_at: file.last_modified_utc,
            file_format: file.format(),
        };
        MediaNode::new(EntityKind::MediaItem, title, self.section_id).with_child(MediaNode::new(
            EntityKind::MediaPart(part),
            file.name.as_str(),
            self.section_id,
        ))
    }
}

/// Reassign absolute indices 1..n across all tracks, in medium order.
fn renumber_absolute_indices(media: &mut [MediaNode]) {
    let tracks = media.iter_mut().flat_map(|medium| medium.children.iter_mut());
    for (track, next) in tracks.zip(1u32..) {
        if let EntityKind::Track { absolute_index, .. } = &mut track.kind {
            *absolute_index = next;
        }
    }
}
