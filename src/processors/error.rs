//! PDF processing error types

use thiserror::Error;

/// Errors from the PDF, text and image components
#[derive(Debug, Error)]
pub enum PdfError {
    /// Component was cleaned up while still in use
    #[error("{0} has been closed")]
    Closed(&'static str),

    /// Document exceeds the configured size limit
    #[error("Document is {size} bytes, limit is {max}")]
    TooLarge { size: u64, max: u64 },

    /// Document exceeds the configured page limit
    #[error("Document has {pages} pages, limit is {max}")]
    TooManyPages { pages: usize, max: usize },

    /// Document has no pages
    #[error("Document has no pages")]
    Empty,

    /// Failed to parse document
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to decode or re-encode an embedded image
    #[error("Image error: {0}")]
    ImageError(String),

    /// Operation did not finish in time
    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    /// Blocking task panicked or was cancelled
    #[error("Worker task failed: {0}")]
    TaskFailed(String),
}

impl From<lopdf::Error> for PdfError {
    fn from(err: lopdf::Error) -> Self {
        PdfError::ParseError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for PdfError {
    fn from(err: tokio::task::JoinError) -> Self {
        PdfError::TaskFailed(err.to_string())
    }
}

/// Result type alias for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;
