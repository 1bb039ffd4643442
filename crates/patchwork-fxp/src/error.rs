//! Error types for FXP container parsing and writing.

use thiserror::Error;

/// Errors that can occur when reading or writing preset containers.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A header field is malformed, or the file is too short to hold it.
    #[error("invalid {field}: {reason}")]
    Format { field: &'static str, reason: String },

    /// The embedded XML is not valid UTF-8.
    #[error("embedded XML is not valid UTF-8: {source}")]
    Encoding {
        #[from]
        source: std::str::Utf8Error,
    },
}

impl Error {
    pub(crate) fn format(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Format {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, Error>;
