//! Registry construction errors.

use thiserror::Error;

/// Errors raised while composing a resolver registry.
///
/// These are configuration mistakes caught once at build time; resolving a
/// path never fails, it either matches or returns nothing.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two resolvers were registered under the same name.
    #[error("Resolver '{name}' is registered more than once")]
    DuplicateResolver { name: String },

    /// A resolver reported an empty name.
    #[error("Resolver names must not be empty")]
    EmptyName,
}
