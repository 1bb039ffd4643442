//! Error types for XML conversion and verification.

use thiserror::Error;

/// Errors that can occur when converting between XML and the value model.
#[derive(Debug, Error)]
pub enum Error {
    /// The input is not well-formed XML.
    #[error("XML parse error: {0}")]
    Parse(String),

    /// A value cannot be expressed as an XML document.
    #[error("structure error: {0}")]
    Structure(String),

    /// Regenerated text differs from the expected text.
    #[error("{context}: round trip mismatch at byte {offset} (expected {} bytes, got {} bytes)", expected.len(), actual.len())]
    Mismatch {
        /// What was being compared.
        context: String,
        /// The text that should have been produced.
        expected: String,
        /// The text that was produced.
        actual: String,
        /// Byte offset of the first difference.
        offset: usize,
    },

    /// XML writing error.
    #[error("XML error: {0}")]
    Xml(String),

    /// JSON encoding or decoding error.
    #[cfg(feature = "json")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a mismatch error, locating the first differing byte.
    pub fn mismatch(context: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        let expected = expected.into();
        let actual = actual.into();
        let offset = crate::verify::first_difference(&expected, &actual).unwrap_or(0);
        Self::Mismatch {
            context: context.into(),
            expected,
            actual,
            offset,
        }
    }
}

/// Result type for XML conversion operations.
pub type Result<T> = std::result::Result<T, Error>;
