//! Resolver dispatch and media classifiers for mediashelf.
//!
//! A [`ResolverRegistry`] holds [`Resolver`]s sorted by priority and offers
//! each candidate directory to them in turn; the first one to return an
//! entity tree wins. [`SectionScan`] drives a
//! [`DirectoryWalker`](mediashelf_scan::DirectoryWalker) and feeds every
//! batch through the registry.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mediashelf_core::{LibraryKind, LibrarySection, ResolverConfig, SectionLocation};
//! use mediashelf_resolve::{ResolverRegistry, SectionScan};
//! use mediashelf_scan::{CancellationToken, DirectoryWalker, ScanConfig};
//!
//! let location = SectionLocation {
//!     id: 1,
//!     path: "/srv/music".into(),
//! };
//! let section = LibrarySection {
//!     id: 1,
//!     name: "Music".into(),
//!     kind: LibraryKind::Music,
//!     locations: vec![location.clone()],
//! };
//! let walker = DirectoryWalker::from_config(ScanConfig::new(&location.path)).unwrap();
//! let registry = Arc::new(ResolverRegistry::with_defaults(
//!     &ResolverConfig::default(),
//!     Arc::clone(walker.ignore_engine()),
//! ));
//!
//! let cancel = CancellationToken::new();
//! for dir in SectionScan::new(&walker, registry, section, location, cancel) {
//!     if let Some(album) = dir.entity {
//!         println!("{} ({} tracks)", album.title, album.tracks().count());
//!     }
//! }
//! ```

mod error;
pub mod music;
mod pipeline;
mod registry;

pub use error::RegistryError;
pub use music::naming::{
    ParseMode, ParsedTrack, detect_multi_disc, disc_number, is_disc_folder, parse_track_name,
};
pub use music::{MUSIC_ALBUM_PRIORITY, MusicAlbumResolver};
pub use pipeline::{ResolvedDirectory, SectionScan, spawn_section_scan};
pub use registry::{Resolver, ResolverRegistry, ResolverRegistryBuilder};
