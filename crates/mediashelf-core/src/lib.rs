//! Core types for mediashelf.
//!
//! This crate provides the data structures shared by the scanner and the
//! resolvers: filesystem snapshots, per-directory batches, the resolve
//! context handed to every resolver, the media entity tree, and
//! configuration.

mod config;
mod entity;
mod error;
mod library;
mod snapshot;

pub use config::{
    MediaShelfConfig, ResolverConfig, ScanConfig, ScanConfigBuilder, DEFAULT_AUDIO_EXTENSIONS,
    DEFAULT_IGNORE_MARKERS,
};
pub use entity::{EntityId, EntityKind, MediaNode, MediaPart, Walk};
pub use error::{ConfigError, ScanError, ScanWarning, WarningKind};
pub use library::{LibraryKind, LibrarySection, ResolveContext, SectionLocation};
pub use snapshot::{DirectoryBatch, FilesystemSnapshot, read_children};
