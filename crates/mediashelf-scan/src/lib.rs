//! Streaming directory walker and ignore-rule engine for mediashelf.
//!
//! # Overview
//!
//! `mediashelf-scan` walks a library root and yields one
//! [`DirectoryBatch`] per visited directory. Key features:
//!
//! - **Streaming**: batches are produced only when the consumer asks for
//!   the next one, from an explicit LIFO stack
//! - **Pluggable ignore rules** that prune whole subtrees or drop single files
//! - **Cooperative cancellation** via [`CancellationToken`]
//! - **Progress updates** via broadcast channels
//!
//! # Example
//!
//! ```rust,no_run
//! use mediashelf_scan::{CancellationToken, DirectoryWalker, ScanConfig};
//!
//! let walker = DirectoryWalker::from_config(ScanConfig::new("/srv/music")).unwrap();
//! for batch in walker.scan(CancellationToken::new()) {
//!     println!("{}: {} entries", batch.directory_path.display(), batch.entries.len());
//! }
//! ```

pub mod ignore;
mod progress;
mod visited;
mod walker;

pub use ignore::{GlobRule, HiddenRule, IgnoreEngine, IgnoreRule, MarkerFileRule, SystemEntryRule};
pub use progress::{ScanProgress, ScanReport};
pub use visited::VisitedDirs;
pub use walker::{DirectoryWalker, ScanStream};

pub use tokio_util::sync::CancellationToken;

// Re-export core types for convenience
pub use mediashelf_core::{
    DirectoryBatch, FilesystemSnapshot, ScanConfig, ScanError, ScanWarning, WarningKind,
};
