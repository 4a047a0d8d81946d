//! Error types for the version table crate.

use lw_tables::TableError;

/// Errors that can occur while querying or persisting the version table.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A file name pattern could not be compiled.
    #[error("invalid file name pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// A required path argument was empty or malformed.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Loading or saving a table failed.
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Convenience alias for version table results.
pub type IndexResult<T> = Result<T, IndexError>;
