//! Scan, resolver and top-level configuration.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::library::LibrarySection;

/// Audio extensions recognised by default (lowercase, no dot).
pub const DEFAULT_AUDIO_EXTENSIONS: &[&str] = &[
    "aac", "aif", "aiff", "alac", "ape", "dff", "dsf", "flac", "m4a", "mka", "mp3", "oga", "ogg",
    "opus", "wav", "wma", "wv",
];

/// Marker files whose presence prunes a directory by default.
pub const DEFAULT_IGNORE_MARKERS: &[&str] = &[".nomedia"];

/// Configuration for one walker pass.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to scan.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Follow symbolic links.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Maximum depth to descend below the root (None = unlimited).
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Include hidden entries (names starting with `.`).
    #[builder(default = "false")]
    #[serde(default)]
    pub include_hidden: bool,

    /// Patterns to ignore (gitignore-style globs matched against names).
    #[builder(default)]
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// File names whose presence inside a directory prunes that directory.
    #[builder(default = "default_ignore_markers()")]
    #[serde(default = "default_ignore_markers")]
    pub ignore_markers: Vec<String>,

    /// Number of batches between progress broadcasts.
    #[builder(default = "64")]
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_ignore_markers() -> Vec<String> {
    DEFAULT_IGNORE_MARKERS.iter().map(|m| m.to_string()).collect()
}

fn default_progress_interval() -> u64 {
    64
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        if self.progress_interval == Some(0) {
            return Err("Progress interval must be at least 1".to_string());
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for scanning a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: false,
            max_depth: None,
            include_hidden: false,
            ignore_patterns: Vec::new(),
            ignore_markers: default_ignore_markers(),
            progress_interval: default_progress_interval(),
        }
    }

    /// Return a copy of this config rooted somewhere else.
    pub fn with_root(&self, root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..self.clone()
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(default_root())
    }
}

/// Configuration shared by the built-in resolvers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Recognised audio extensions, lowercase without the leading dot.
    #[serde(default = "default_audio_extensions")]
    pub audio_extensions: BTreeSet<String>,
}

fn default_audio_extensions() -> BTreeSet<String> {
    DEFAULT_AUDIO_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            audio_extensions: default_audio_extensions(),
        }
    }
}

impl ResolverConfig {
    /// Check an extension against the audio set, ignoring case and a
    /// leading dot.
    pub fn is_audio_extension(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.');
        !extension.is_empty() && self.audio_extensions.contains(&extension.to_ascii_lowercase())
    }
}

/// Top-level configuration document.
///
/// ```toml
/// [scan]
/// include_hidden = false
/// ignore_patterns = ["*.tmp", "Artwork"]
///
/// [[sections]]
/// id = 1
/// name = "Music"
/// kind = "music"
/// locations = [{ id = 1, path = "/srv/music" }]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaShelfConfig {
    /// Walker settings; `root` is replaced per section location.
    #[serde(default)]
    pub scan: ScanConfig,

    /// Resolver settings.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Configured library sections.
    #[serde(default)]
    pub sections: Vec<LibrarySection>,
}

impl MediaShelfConfig {
    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mediashelf")
            .join("config.toml")
    }

    /// Parse a config document.
    pub fn from_toml(source: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config from an explicit path, which must exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&source, path)
    }

    /// Load from `path` if given, else from [`Self::default_path`] falling
    /// back to defaults when that file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let default_path = Self::default_path();
        if default_path.is_file() {
            tracing::debug!(path = %default_path.display(), "Loading default config");
            Self::load(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for section in &self.sections {
            if !seen.insert(section.id) {
                return Err(ConfigError::Invalid {
                    message: format!("duplicate section id {}", section.id),
                });
            }
            if section.locations.is_empty() {
                return Err(ConfigError::Invalid {
                    message: format!("section {} has no locations", section.id),
                });
            }
        }
        if self.scan.progress_interval == 0 {
            return Err(ConfigError::Invalid {
                message: "scan.progress_interval must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
