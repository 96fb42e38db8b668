//! Error types for tree operations.

/// Result type alias for tree operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by [`Tree`](crate::Tree) operations.
///
/// None of these leave the tree half-mutated: arguments are validated before
/// any node is forked or restructured.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The caller passed an argument the tree cannot store, such as an empty
    /// key or value, or a node size below 2.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Exact-match lookup missed, or min/max was requested from an empty tree.
    #[error("key not found")]
    NotFound,

    /// A structural invariant is broken. This indicates a bug, not bad input.
    #[error("invalid tree state: {0}")]
    InvalidState(&'static str),
}
