//! Error types for vecwal.

use std::io;
use thiserror::Error;

/// Result type alias for WAL operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for WAL operations.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// I/O error from file operations.
    #[error("I/O error: {0}")]
    Io(String),

    /// A segment file that recovery or replay expected is missing.
    #[error("wal segment {0} not found")]
    SegmentNotFound(u32),

    /// A sealed segment between the applied and appended positions has
    /// size zero; the log cannot be replayed across it.
    #[error("wal segment {0} is empty")]
    EmptySegment(u32),

    /// A record does not fit in one buffer slab.
    #[error("record too large: {size} bytes (buffer: {max})")]
    RecordTooLarge {
        /// Encoded size of the offending record.
        size: u32,
        /// Capacity of one slab.
        max: u32,
    },

    /// Buffer contents do not decode as a valid record.
    #[error("corruption detected: {0}")]
    Corruption(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl Error {
    /// Create a corruption error with the given message.
    pub fn corruption<S: Into<String>>(msg: S) -> Self {
        Error::Corruption(msg.into())
    }

    /// Check if this error came from the file layer (open, read, write,
    /// flush, or a missing segment).
    pub fn is_file_error(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::SegmentNotFound(_) | Error::EmptySegment(_)
        )
    }

    /// Check if this error indicates corruption.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_))
    }
}
