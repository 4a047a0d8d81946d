//! Error types for filesystem scans.

/// Errors that can occur while setting up a scan.
///
/// Failures on individual entries during the walk are not errors; the
/// entry is skipped.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// An exclusion pattern did not compile.
    #[error(transparent)]
    Exclusion(#[from] lw_exclusions::ExclusionError),

    /// The start path is empty.
    #[error("invalid scan root: {0}")]
    InvalidRoot(String),
}

/// Convenience alias for scan results.
pub type ScanResult<T> = Result<T, ScanError>;
