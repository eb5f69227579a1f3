//! Library sections and the context handed to resolvers.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::snapshot::{DirectoryBatch, FilesystemSnapshot};

/// The kind of media a library section holds.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    #[default]
    Music,
    Movies,
    Shows,
    Audiobooks,
    Photos,
}

/// One root folder belonging to a library section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionLocation {
    /// Stable identifier of this location.
    pub id: i64,
    /// Root path on disk.
    pub path: PathBuf,
}

/// A library section: a named set of root folders sharing one media kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySection {
    /// Stable identifier of this section.
    pub id: i64,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Media kind for every location in this section.
    pub kind: LibraryKind,
    /// Root folders.
    #[serde(default)]
    pub locations: Vec<SectionLocation>,
}

impl LibrarySection {
    /// The location rooted at `path`.
    ///
    /// Configured paths may be relative or go through symlinks, so a location
    /// also matches when its canonical form equals `path`.
    pub fn location_for(&self, path: &Path) -> Option<&SectionLocation> {
        self.locations.iter().find(|location| {
            location.path == path || location.path.canonicalize().is_ok_and(|p| p == path)
        })
    }
}

/// Everything a resolver gets to see about one candidate path.
///
/// Resolvers receive the context by shared reference and never mutate it.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    /// Snapshot of the candidate path.
    pub snapshot: FilesystemSnapshot,
    /// Kind of the library being scanned.
    pub library_kind: LibraryKind,
    /// Whether the candidate is the root folder of its section location.
    pub is_library_root: bool,
    /// Children listing already fetched by the walker, if any.
    pub prefetched_children: Option<Vec<FilesystemSnapshot>>,
    /// Section the candidate belongs to.
    pub library_section_id: i64,
    /// Location (root folder) within the section.
    pub section_location_id: i64,
}

impl ResolveContext {
    /// Create a context for a candidate with no prefetched children.
    pub fn new(snapshot: FilesystemSnapshot, library_kind: LibraryKind) -> Self {
        Self {
            snapshot,
            library_kind,
            is_library_root: false,
            prefetched_children: None,
            library_section_id: 0,
            section_location_id: 0,
        }
    }

    /// Build the context for a walker batch.
    ///
    /// The batch entries become the prefetched children, and the directory
    /// counts as the library root when its path equals `location.path`.
    pub fn for_batch(
        batch: &DirectoryBatch,
        section: &LibrarySection,
        location: &SectionLocation,
    ) -> Self {
        Self {
            snapshot: batch.directory.clone(),
            library_kind: section.kind,
            is_library_root: batch.directory_path == location.path,
            prefetched_children: Some(batch.entries.clone()),
            library_section_id: section.id,
            section_location_id: location.id,
        }
    }

    /// Mark the candidate as the library root.
    pub fn with_library_root(mut self, is_library_root: bool) -> Self {
        self.is_library_root = is_library_root;
        self
    }

    /// Attach a prefetched children listing.
    pub fn with_children(mut self, children: Vec<FilesystemSnapshot>) -> Self {
        self.prefetched_children = Some(children);
        self
    }

    /// Set the section and location identifiers.
    pub fn with_section(mut self, library_section_id: i64, section_location_id: i64) -> Self {
        self.library_section_id = library_section_id;
        self.section_location_id = section_location_id;
        self
    }

    /// Children of the candidate: the prefetched listing when present,
    /// otherwise a fresh read-only listing (empty on access error).
    pub fn children(&self) -> Vec<FilesystemSnapshot> {
        match &self.prefetched_children {
            Some(children) => children.clone(),
            None => crate::snapshot::read_children(&self.snapshot.path),
        }
    }
}
