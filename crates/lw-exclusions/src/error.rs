//! Error types for exclusion list operations.

use std::path::PathBuf;

/// Errors that can occur while loading exclusion lists or compiling them.
#[derive(Debug, thiserror::Error)]
pub enum ExclusionError {
    /// The cache file exists but could not be read.
    #[error("failed to read exclusion cache {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cache file could not be written.
    #[error("failed to write exclusion cache {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `.tfignore` file exists but could not be read.
    #[error("failed to read ignore file {path}: {source}")]
    ReadIgnoreFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cache file is not well-formed.
    #[error("malformed exclusion cache: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// The cache could not be serialized.
    #[error("failed to serialize exclusion cache: {0}")]
    Serialize(String),

    /// An exclusion is not a valid glob.
    #[error("invalid exclusion pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Convenience alias for exclusion results.
pub type ExclusionResult<T> = Result<T, ExclusionError>;
