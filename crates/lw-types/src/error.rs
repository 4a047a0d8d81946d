//! Error types for the foundation types crate.

/// Errors from constructing or parsing foundation types.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    /// A GUID string could not be parsed.
    #[error("invalid GUID {input:?}: {reason}")]
    InvalidGuid { input: String, reason: String },

    /// A path was empty or otherwise unusable.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Convenience alias for foundation type results.
pub type TypeResult<T> = Result<T, TypeError>;
