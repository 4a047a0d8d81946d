//! Error types for pending change operations.

use lw_types::TypeError;

/// Errors raised while ordering or validating pending changes.
#[derive(Debug, thiserror::Error)]
pub enum PendingError {
    /// Two renames claim the same target path.
    #[error("rename target {target} is claimed by both {first} and {second}")]
    TargetCollision {
        target: String,
        first: String,
        second: String,
    },

    /// A path argument was malformed.
    #[error(transparent)]
    Path(#[from] TypeError),
}

/// Convenience alias for pending change results.
pub type PendingResult<T> = Result<T, PendingError>;
