//! Built-in ignore rules.

use std::path::Path;

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};

use mediashelf_core::ScanError;

use super::IgnoreRule;

fn name_of(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// Skips dot-prefixed directories and files.
#[derive(Debug, Clone, Copy, Default)]
pub struct HiddenRule;

impl IgnoreRule for HiddenRule {
    fn name(&self) -> &str {
        "hidden"
    }

    fn ignore_directory(&self, path: &Path, _parent: Option<&Path>) -> bool {
        name_of(path).is_some_and(|n| n.starts_with('.'))
    }

    fn ignore_file(&self, path: &Path, _parent: &Path) -> bool {
        name_of(path).is_some_and(|n| n.starts_with('.'))
    }
}

/// Directory names created by operating systems, NAS appliances and trash
/// implementations. Compared case-insensitively.
const SYSTEM_DIRECTORIES: &[&str] = &[
    "@eadir",
    "#recycle",
    "#snapshot",
    "$recycle.bin",
    "system volume information",
    "lost+found",
    ".appledouble",
    ".spotlight-v100",
    ".fseventsd",
];

/// File names that are never media. Compared case-insensitively.
const SYSTEM_FILES: &[&str] = &[".ds_store", "thumbs.db", "ehthumbs.db", "desktop.ini"];

/// Skips OS and NAS artefacts regardless of the hidden-file setting.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEntryRule;

impl IgnoreRule for SystemEntryRule {
    fn name(&self) -> &str {
        "system"
    }

    fn ignore_directory(&self, path: &Path, _parent: Option<&Path>) -> bool {
        let Some(name) = name_of(path) else {
            return false;
        };
        let lower = name.to_lowercase();
        lower.starts_with(".trash") || SYSTEM_DIRECTORIES.contains(&lower.as_str())
    }

    fn ignore_file(&self, path: &Path, _parent: &Path) -> bool {
        let Some(name) = name_of(path) else {
            return false;
        };
        // AppleDouble resource forks
        if name.starts_with("._") {
            return true;
        }
        SYSTEM_FILES.contains(&name.to_lowercase().as_str())
    }
}

/// Prunes any directory that contains one of the configured marker files.
#[derive(Debug, Clone)]
pub struct MarkerFileRule {
    markers: Vec<String>,
}

impl MarkerFileRule {
    /// Create a rule for the given marker file names.
    pub fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }
}

impl IgnoreRule for MarkerFileRule {
    fn name(&self) -> &str {
        "marker"
    }

    fn ignore_directory(&self, path: &Path, _parent: Option<&Path>) -> bool {
        self.markers.iter().any(|marker| path.join(marker).is_file())
    }

    fn ignore_file(&self, _path: &Path, _parent: &Path) -> bool {
        false
    }
}

/// User-supplied gitignore-style patterns.
///
/// Each pattern is matched against the entry name and against its full path.
/// A trailing `/` restricts a pattern to directories.
#[derive(Debug, Clone)]
pub struct GlobRule {
    patterns: Vec<String>,
    any: GlobSet,
    directories: GlobSet,
}

impl GlobRule {
    /// Compile a set of patterns.
    pub fn new(patterns: &[String]) -> Result<Self, ScanError> {
        let mut any = GlobSetBuilder::new();
        let mut directories = GlobSetBuilder::new();

        for pattern in patterns {
            let (glob_src, dir_only) = match pattern.strip_suffix('/') {
                Some(stripped) => (stripped, true),
                None => (pattern.as_str(), false),
            };
            let glob = compile(glob_src, pattern)?;
            if dir_only {
                directories.add(glob);
            } else {
                any.add(glob);
            }
        }

        Ok(Self {
            patterns: patterns.to_vec(),
            any: build(any)?,
            directories: build(directories)?,
        })
    }

    /// The source patterns.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    fn matches(&self, set: &GlobSet, path: &Path) -> bool {
        name_of(path).is_some_and(|n| set.is_match(n)) || set.is_match(path)
    }
}

fn compile(source: &str, original: &str) -> Result<Glob, ScanError> {
    GlobBuilder::new(source)
        .literal_separator(true)
        .build()
        .map_err(|e| ScanError::InvalidPattern {
            pattern: original.to_string(),
            message: e.to_string(),
        })
}

fn build(builder: GlobSetBuilder) -> Result<GlobSet, ScanError> {
    builder.build().map_err(|e| ScanError::InvalidPattern {
        pattern: String::new(),
        message: e.to_string(),
    })
}

impl IgnoreRule for GlobRule {
    fn name(&self) -> &str {
        "glob"
    }

    fn ignore_directory(&self, path: &Path, _parent: Option<&Path>) -> bool {
        self.matches(&self.any, path) || self.matches(&self.directories, path)
    }

    fn ignore_file(&self, path: &Path, _parent: &Path) -> bool {
        self.matches(&self.any, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir(path: &str) -> bool {
        let p = Path::new(path);
        SystemEntryRule.ignore_directory(p, p.parent())
    }

    #[test]
    fn test_hidden_rule() {
        let parent = Path::new("/music");
        assert!(HiddenRule.ignore_directory(Path::new("/music/.cache"), Some(parent)));
        assert!(HiddenRule.ignore_file(Path::new("/music/.track.mp3"), parent));
        assert!(!HiddenRule.ignore_file(Path::new("/music/track.mp3"), parent));
    }

    #[test]
    fn test_system_rule() {
        assert!(dir("/music/@eaDir"));
        assert!(dir("/music/$RECYCLE.BIN"));
        assert!(dir("/music/.Trash-1000"));
        assert!(dir("/music/System Volume Information"));
        assert!(!dir("/music/Abbey Road"));

        let parent = Path::new("/music/Album");
        assert!(SystemEntryRule.ignore_file(Path::new("/music/Album/Thumbs.db"), parent));
        assert!(SystemEntryRule.ignore_file(Path::new("/music/Album/._01.mp3"), parent));
        assert!(!SystemEntryRule.ignore_file(Path::new("/music/Album/01.mp3"), parent));
    }

    #[test]
    fn test_marker_rule() {
        let temp = TempDir::new().unwrap();
        let skipped = temp.path().join("skipped");
        let kept = temp.path().join("kept");
        std::fs::create_dir(&skipped).unwrap();
        std::fs::create_dir(&kept).unwrap();
        std::fs::write(skipped.join(".nomedia"), "").unwrap();

        let rule = MarkerFileRule::new(vec![".nomedia".to_string()]);
        assert!(rule.ignore_directory(&skipped, Some(temp.path())));
        assert!(!rule.ignore_directory(&kept, Some(temp.path())));
    }

    #[test]
    fn test_glob_rule() {
        let rule = GlobRule::new(&[
            "*.tmp".to_string(),
            "Scans/".to_string(),
            "**/Live/*.m4a".to_string(),
        ])
        .unwrap();
        let parent = Path::new("/music/Album");

        assert!(rule.ignore_file(Path::new("/music/Album/partial.tmp"), parent));
        assert!(!rule.ignore_file(Path::new("/music/Album/01.mp3"), parent));

        // directory-only pattern
        assert!(rule.ignore_directory(Path::new("/music/Album/Scans"), Some(parent)));
        assert!(!rule.ignore_file(Path::new("/music/Album/Scans"), parent));

        // path pattern
        assert!(rule.ignore_file(
            Path::new("/music/Artist/Live/01.m4a"),
            Path::new("/music/Artist/Live")
        ));
        assert_eq!(rule.patterns().len(), 3);
    }
}
