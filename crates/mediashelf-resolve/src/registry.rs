//! Resolver trait and priority-ordered dispatcher.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use mediashelf_core::{MediaNode, ResolveContext, ResolverConfig};
use mediashelf_scan::IgnoreEngine;

use crate::error::RegistryError;
use crate::music::MusicAlbumResolver;

/// A classifier that turns one candidate path into at most one entity tree.
///
/// Implementations must bail out cheaply (before listing any children) when
/// their preconditions fail, must not panic on access errors, and must not
/// keep mutable state between calls: the same registry serves concurrent
/// scans.
pub trait Resolver: Send + Sync + fmt::Debug {
    /// Unique name, used for diagnostics and duplicate detection.
    fn name(&self) -> &str;

    /// Dispatch priority; lower values are tried first.
    fn priority(&self) -> i32;

    /// Classify the candidate, or return `None` to let the next resolver try.
    fn resolve(&self, ctx: &ResolveContext) -> Option<MediaNode>;
}

/// Resolvers sorted by ascending priority.
///
/// Resolvers with equal priority keep their registration order, so the one
/// registered first wins when both would claim the same path.
#[derive(Debug)]
pub struct ResolverRegistry {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl ResolverRegistry {
    /// Start composing a registry.
    pub fn builder() -> ResolverRegistryBuilder {
        ResolverRegistryBuilder::default()
    }

    /// Registry with every built-in resolver.
    ///
    /// `ignore` should be the walker's engine so resolvers that list
    /// directories themselves skip what the walk skips.
    pub fn with_defaults(config: &ResolverConfig, ignore: Arc<IgnoreEngine>) -> Self {
        Self {
            resolvers: vec![Box::new(MusicAlbumResolver::new(config.clone(), ignore))],
        }
    }

    /// Try each resolver in priority order and return the first match.
    pub fn resolve_directory(&self, ctx: &ResolveContext) -> Option<MediaNode> {
        self.resolve_named(ctx).map(|(_, node)| node)
    }

    /// Like [`Self::resolve_directory`], also returning the winning
    /// resolver's name.
    pub fn resolve_named(&self, ctx: &ResolveContext) -> Option<(&str, MediaNode)> {
        self.resolvers.iter().find_map(|resolver| {
            let node = resolver.resolve(ctx)?;
            tracing::debug!(
                path = %ctx.snapshot.path.display(),
                resolver = resolver.name(),
                title = %node.title,
                "Resolved directory"
            );
            Some((resolver.name(), node))
        })
    }

    /// Resolver names in dispatch order.
    pub fn resolver_names(&self) -> Vec<&str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    /// Number of registered resolvers.
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Check if no resolvers are registered.
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

/// Collects resolvers before they are sorted into a [`ResolverRegistry`].
#[derive(Default)]
pub struct ResolverRegistryBuilder {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl fmt::Debug for ResolverRegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistryBuilder")
            .field("resolvers", &self.resolvers.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl ResolverRegistryBuilder {
    /// Register a resolver.
    pub fn register(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Register an already boxed resolver.
    pub fn register_boxed(mut self, resolver: Box<dyn Resolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    /// Validate names and sort by priority.
    pub fn build(self) -> Result<ResolverRegistry, RegistryError> {
        let mut seen = HashSet::new();
        for resolver in &self.resolvers {
            let name = resolver.name();
            if name.is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if !seen.insert(name.to_string()) {
                return Err(RegistryError::DuplicateResolver {
                    name: name.to_string(),
                });
            }
        }

        let mut resolvers = self.resolvers;
        // Stable: equal priorities keep registration order.
        resolvers.sort_by_key(|r| r.priority());
        Ok(ResolverRegistry { resolvers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mediashelf_core::{EntityKind, FilesystemSnapshot, LibraryKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Fixed {
        name: &'static str,
        priority: i32,
        claims: bool,
        calls: Arc<AtomicUsize>,
    }

    impl Fixed {
        fn new(name: &'static str, priority: i32, claims: bool) -> Self {
            Self {
                name,
                priority,
                claims,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Resolver for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn resolve(&self, _ctx: &ResolveContext) -> Option<MediaNode> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.claims
                .then(|| MediaNode::new(EntityKind::ReleaseGroup, self.name, 1))
        }
    }

    fn ctx() -> ResolveContext {
        ResolveContext::new(
            FilesystemSnapshot::synthetic("/music/Album", true, 0, Utc::now()),
            LibraryKind::Music,
        )
        .with_children(vec![])
    }

    #[test]
    fn test_sorted_by_priority() {
        let registry = ResolverRegistry::builder()
            .register(Fixed::new("late", 50, true))
            .register(Fixed::new("early", 10, true))
            .register(Fixed::new("middle", 20, true))
            .build()
            .unwrap();
        assert_eq!(registry.resolver_names(), vec!["early", "middle", "late"]);
        assert_eq!(registry.resolve_directory(&ctx()).unwrap().title, "early");
    }

    #[test]
    fn test_equal_priority_first_registered_wins() {
        let registry = ResolverRegistry::builder()
            .register(Fixed::new("first", 10, true))
            .register(Fixed::new("second", 10, true))
            .build()
            .unwrap();
        let (name, node) = registry.resolve_named(&ctx()).unwrap();
        assert_eq!(name, "first");
        assert_eq!(node.title, "first");
    }

    #[test]
    fn test_stops_at_first_match() {
        let skip = Fixed::new("skip", 1, false);
        let hit = Fixed::new("hit", 2, true);
        let never = Fixed::new("never", 3, true);
        let (skip_calls, hit_calls, never_calls) =
            (skip.calls.clone(), hit.calls.clone(), never.calls.clone());

        let registry = ResolverRegistry::builder()
            .register(never)
            .register(hit)
            .register(skip)
            .build()
            .unwrap();
        assert_eq!(registry.resolve_directory(&ctx()).unwrap().title, "hit");
        assert_eq!(skip_calls.load(Ordering::SeqCst), 1);
        assert_eq!(hit_calls.load(Ordering::SeqCst), 1);
        assert_eq!(never_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_no_match_returns_none() {
        let registry = ResolverRegistry::builder()
            .register(Fixed::new("nope", 1, false))
            .build()
            .unwrap();
        assert!(registry.resolve_directory(&ctx()).is_none());

        let empty = ResolverRegistry::builder().build().unwrap();
        assert!(empty.is_empty());
        assert!(empty.resolve_directory(&ctx()).is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = ResolverRegistry::builder()
            .register(Fixed::new("dup", 1, false))
            .register(Fixed::new("dup", 2, true))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateResolver { ref name } if name == "dup"));

        let err = ResolverRegistry::builder()
            .register(Fixed::new("", 1, false))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::EmptyName));
    }

    #[test]
    fn test_defaults() {
        let ignore = Arc::new(IgnoreEngine::standard());
        let registry = ResolverRegistry::with_defaults(&ResolverConfig::default(), ignore);
        assert_eq!(registry.resolver_names(), vec!["music_album"]);
        assert_eq!(registry.len(), 1);
    }
}
