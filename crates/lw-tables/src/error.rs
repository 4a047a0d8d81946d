//! Error types for metadata table operations.

use std::path::PathBuf;

use lw_codec::CodecError;

/// Errors that can occur while loading, saving or positioning a table.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// The table header or payload is not in a recognized format.
    #[error("invalid {table}: {reason}")]
    InvalidFormat { table: &'static str, reason: String },

    /// The table payload could not be decoded.
    #[error("invalid {table}: {source}")]
    Corrupt {
        table: &'static str,
        #[source]
        source: CodecError,
    },

    /// A slot file could not be moved into place.
    #[error("failed to rename {from} to {to} after {attempts} attempts: {source}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TableError {
    /// Build an invalid-format error for the named table.
    pub fn invalid(table: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            table,
            reason: reason.into(),
        }
    }

    /// Adapter for `map_err` that attributes a codec failure to a table.
    pub fn corrupt(table: &'static str) -> impl Fn(CodecError) -> Self {
        move |source| Self::Corrupt { table, source }
    }

    /// Name of the table a format error belongs to.
    pub fn table(&self) -> Option<&'static str> {
        match self {
            Self::InvalidFormat { table, .. } | Self::Corrupt { table, .. } => Some(table),
            _ => None,
        }
    }
}

/// Convenience alias for table results.
pub type TableResult<T> = Result<T, TableError>;
