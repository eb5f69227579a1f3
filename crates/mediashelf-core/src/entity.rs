//! Resolved media entity tree.
//!
//! A resolver turns one directory into a single [`MediaNode`] tree. Ownership
//! flows strictly through `children`; `parent` only records the id of the
//! owning node so a consumer can look it up, which keeps the tree free of
//! reference cycles and trivially serialisable.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier minted for every entity a resolver builds.
///
/// Ids are unique within the process; the persistence layer maps them to its
/// own stored identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Mint a fresh id.
    pub fn mint() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The file backing a media item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPart {
    /// Path of the file on disk.
    pub path: PathBuf,
    /// Size in bytes, copied from the snapshot.
    pub size: u64,
    /// Modification time, copied from the snapshot.
    pub modified_at: DateTime<Utc>,
    /// Lowercase extension without the dot, empty when there is none.
    pub file_format: CompactString,
}

/// Type of entity and its variant-specific data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityKind {
    /// Browsing root for an album (all editions).
    ReleaseGroup,
    /// One specific edition of an album.
    Release,
    /// One disc of a release.
    Medium {
        /// Disc position; 0 for the synthetic disc built from loose root files.
        index: u32,
    },
    /// One track on a medium.
    Track {
        /// 1-based index within the medium.
        index: u32,
        /// Release-wide position, strictly increasing across all media.
        absolute_index: u32,
        /// Disc number parsed from the name, if any.
        disc_number: Option<u32>,
        /// Track number parsed from the name, if any.
        track_number: Option<u32>,
    },
    /// A playable version of a track.
    MediaItem,
    /// The file behind a media item.
    MediaPart(MediaPart),
}

impl EntityKind {
    /// Short lowercase label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ReleaseGroup => "release_group",
            Self::Release => "release",
            Self::Medium { .. } => "medium",
            Self::Track { .. } => "track",
            Self::MediaItem => "media_item",
            Self::MediaPart(_) => "media_part",
        }
    }
}

/// A single resolved entity and the entities it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaNode {
    /// Freshly minted identifier.
    pub id: EntityId,
    /// Display title.
    pub title: CompactString,
    /// Title used for ordering.
    pub sort_title: CompactString,
    /// Section this entity belongs to.
    pub library_section_id: i64,
    /// Id of the owning node (lookup only).
    pub parent: Option<EntityId>,
    /// Variant and its data.
    pub kind: EntityKind,
    /// Owned children, in order.
    pub children: Vec<MediaNode>,
}

impl MediaNode {
    /// Create a childless node with a freshly minted id.
    pub fn new(kind: EntityKind, title: impl Into<CompactString>, library_section_id: i64) -> Self {
        let title = title.into();
        Self {
            id: EntityId::mint(),
            sort_title: title.clone(),
            title,
            library_section_id,
            parent: None,
            kind,
            children: Vec::new(),
        }
    }

    /// Append a child, recording this node as its parent.
    pub fn push_child(&mut self, mut child: MediaNode) {
        child.parent = Some(self.id);
        self.children.push(child);
    }

    /// Builder-style [`Self::push_child`].
    pub fn with_child(mut self, child: MediaNode) -> Self {
        self.push_child(child);
        self
    }

    /// Pre-order traversal of this node and all descendants.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// All track nodes below (and including) this node, in tree order.
    pub fn tracks(&self) -> impl Iterator<Item = &MediaNode> {
        self.walk().filter(|n| n.is_track())
    }

    /// Find a node by id.
    pub fn find(&self, id: EntityId) -> Option<&MediaNode> {
        self.walk().find(|n| n.id == id)
    }

    /// Check if this is a track.
    pub fn is_track(&self) -> bool {
        matches!(self.kind, EntityKind::Track { .. })
    }

    /// Check if this is a medium.
    pub fn is_medium(&self) -> bool {
        matches!(self.kind, EntityKind::Medium { .. })
    }

    /// Per-medium index for tracks, disc index for media.
    pub fn index(&self) -> Option<u32> {
        match self.kind {
            EntityKind::Track { index, .. } | EntityKind::Medium { index } => Some(index),
            _ => None,
        }
    }

    /// Release-wide index for tracks.
    pub fn absolute_index(&self) -> Option<u32> {
        match self.kind {
            EntityKind::Track { absolute_index, .. } => Some(absolute_index),
            _ => None,
        }
    }

    /// The media part at the bottom of a track chain, if this node has one.
    pub fn media_part(&self) -> Option<&MediaPart> {
        self.walk().find_map(|n| match &n.kind {
            EntityKind::MediaPart(part) => Some(part),
            _ => None,
        })
    }

    /// Count of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        self.walk().count()
    }

    /// Compare two trees ignoring minted ids and parent links.
    pub fn structural_eq(&self, other: &MediaNode) -> bool {
        self.title == other.title
            && self.sort_title == other.sort_title
            && self.library_section_id == other.library_section_id
            && self.kind == other.kind
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.structural_eq(b))
    }
}

/// Pre-order iterator over a [`MediaNode`] tree.
#[derive(Debug)]
pub struct Walk<'a> {
    stack: Vec<&'a MediaNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a MediaNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
