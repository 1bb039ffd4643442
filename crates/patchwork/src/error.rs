//! Error types for the batch pipeline.

use thiserror::Error;

/// Errors that stop a whole batch. Per-file problems are reported as
/// [`FileFailure`](crate::batch::FileFailure) values instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The batch settings cannot be used.
    #[error("invalid batch config: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal failed.
    #[error("cannot walk preset directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// The worker pool could not be created.
    #[error("cannot build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// XML conversion error.
    #[error(transparent)]
    Xml(#[from] patchwork_xml::Error),

    /// Preset container error.
    #[error(transparent)]
    Fxp(#[from] patchwork_fxp::Error),
}

/// Result type for batch operations.
pub type Result<T> = std::result::Result<T, Error>;
