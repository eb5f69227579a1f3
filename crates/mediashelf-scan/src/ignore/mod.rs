//! Pluggable ignore rules.
//!
//! An [`IgnoreEngine`] holds an ordered list of [`IgnoreRule`]s. Registration
//! order is precedence: the first rule that claims a path wins and later
//! rules are not consulted. Rules see only the path and its immediate parent,
//! so an engine can be shared read-only by any number of concurrent scans.

mod rules;

use std::fmt;
use std::path::Path;

use mediashelf_core::{DEFAULT_IGNORE_MARKERS, ScanConfig, ScanError};

pub use rules::{GlobRule, HiddenRule, MarkerFileRule, SystemEntryRule};

/// A predicate that prunes directories or excludes files from a scan.
pub trait IgnoreRule: Send + Sync + fmt::Debug {
    /// Name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Whether the directory at `path` (and its whole subtree) is skipped.
    ///
    /// `parent` is `None` only when the scan root has no parent.
    fn ignore_directory(&self, path: &Path, parent: Option<&Path>) -> bool;

    /// Whether the file at `path`, found in `parent`, is left out of its batch.
    fn ignore_file(&self, path: &Path, parent: &Path) -> bool;
}

/// Ordered collection of ignore rules; first match wins.
#[derive(Debug, Default)]
pub struct IgnoreEngine {
    rules: Vec<Box<dyn IgnoreRule>>,
}

impl IgnoreEngine {
    /// Create an engine with no rules (nothing is ignored).
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The built-in rules of a default configuration: marker files, system
    /// artefacts and hidden entries. Infallible since no globs are compiled.
    pub fn standard() -> Self {
        let markers = DEFAULT_IGNORE_MARKERS.iter().map(|m| m.to_string()).collect();
        Self::new()
            .with_rule(MarkerFileRule::new(markers))
            .with_rule(SystemEntryRule)
            .with_rule(HiddenRule)
    }

    /// Create the default rule set for a scan configuration.
    ///
    /// Rules are registered as: marker files, system artefacts, hidden
    /// entries (unless `include_hidden`), then user glob patterns.
    pub fn from_config(config: &ScanConfig) -> Result<Self, ScanError> {
        let mut engine = Self::new();
        if !config.ignore_markers.is_empty() {
            engine.push(MarkerFileRule::new(config.ignore_markers.clone()));
        }
        engine.push(SystemEntryRule);
        if !config.include_hidden {
            engine.push(HiddenRule);
        }
        if !config.ignore_patterns.is_empty() {
            engine.push(GlobRule::new(&config.ignore_patterns)?);
        }
        Ok(engine)
    }

    /// Append a rule with the lowest precedence so far.
    pub fn push(&mut self, rule: impl IgnoreRule + 'static) {
        self.rules.push(Box::new(rule));
    }

    /// Builder-style [`Self::push`].
    pub fn with_rule(mut self, rule: impl IgnoreRule + 'static) -> Self {
        self.push(rule);
        self
    }

    /// Whether any rule prunes this directory.
    pub fn should_ignore_directory(&self, path: &Path, parent: Option<&Path>) -> bool {
        self.matching_directory_rule(path, parent).is_some()
    }

    /// Whether any rule excludes this file.
    pub fn should_ignore_file(&self, path: &Path, parent: &Path) -> bool {
        self.matching_file_rule(path, parent).is_some()
    }

    /// Name of the first rule that prunes this directory.
    pub fn matching_directory_rule(&self, path: &Path, parent: Option<&Path>) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.ignore_directory(path, parent))
            .map(|rule| rule.name())
    }

    /// Name of the first rule that excludes this file.
    pub fn matching_file_rule(&self, path: &Path, parent: &Path) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.ignore_file(path, parent))
            .map(|rule| rule.name())
    }

    /// Names of the registered rules, in precedence order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Claims everything and counts how often it was asked.
    #[derive(Debug)]
    struct Greedy {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl IgnoreRule for Greedy {
        fn name(&self) -> &str {
            self.name
        }

        fn ignore_directory(&self, _path: &Path, _parent: Option<&Path>) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            true
        }

        fn ignore_file(&self, _path: &Path, _parent: &Path) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    #[test]
    fn test_empty_engine_keeps_everything() {
        let engine = IgnoreEngine::new();
        assert!(!engine.should_ignore_directory(Path::new("/a/.hidden"), Some(Path::new("/a"))));
        assert!(!engine.should_ignore_file(Path::new("/a/Thumbs.db"), Path::new("/a")));
    }

    #[test]
    fn test_first_match_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let engine = IgnoreEngine::new()
            .with_rule(Greedy {
                name: "first",
                calls: first.clone(),
            })
            .with_rule(Greedy {
                name: "second",
                calls: second.clone(),
            });

        assert_eq!(
            engine.matching_directory_rule(Path::new("/a/b"), Some(Path::new("/a"))),
            Some("first")
        );
        assert_eq!(
            engine.matching_file_rule(Path::new("/a/b.mp3"), Path::new("/a")),
            Some("first")
        );
        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_from_config_order() {
        let mut config = ScanConfig::new("/music");
        config.ignore_patterns = vec!["*.tmp".to_string()];
        let engine = IgnoreEngine::from_config(&config).unwrap();
        assert_eq!(engine.rule_names(), vec!["marker", "system", "hidden", "glob"]);

        config.include_hidden = true;
        config.ignore_patterns.clear();
        config.ignore_markers.clear();
        let engine = IgnoreEngine::from_config(&config).unwrap();
        assert_eq!(engine.rule_names(), vec!["system"]);
    }

    #[test]
    fn test_standard_matches_default_config() {
        let from_config = IgnoreEngine::from_config(&ScanConfig::default()).unwrap();
        assert_eq!(IgnoreEngine::standard().rule_names(), from_config.rule_names());
    }

    #[test]
    fn test_from_config_rejects_bad_glob() {
        let mut config = ScanConfig::new("/music");
        config.ignore_patterns = vec!["[unclosed".to_string()];
        let err = IgnoreEngine::from_config(&config).unwrap_err();
        assert!(matches!(err, ScanError::InvalidPattern { .. }));
    }
}
