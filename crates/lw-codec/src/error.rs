//! Error types for the binary codec.

/// Errors produced while encoding or decoding a metadata stream.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The stream ended before a value started.
    #[error("unexpected end of stream")]
    EndOfStream,

    /// Fewer bytes were available than a value or declared length requires.
    /// This signals corruption rather than a clean end of stream.
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// A 7-bit encoded length was malformed or out of range.
    #[error("invalid encoded length: {0}")]
    InvalidLength(String),

    /// String payload was not valid UTF-16LE.
    #[error("invalid string data: {0}")]
    InvalidString(String),

    /// A string was too long to encode with a 7-bit length prefix.
    #[error("string too long to encode: {0} bytes")]
    StringTooLong(usize),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Returns `true` for a clean end of stream.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }
}

/// Convenience alias for codec results.
pub type CodecResult<T> = Result<T, CodecError>;
