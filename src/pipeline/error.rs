//! Pipeline error types

use thiserror::Error;

use crate::component::ComponentError;
use crate::processors::{OcrError, PdfError};

/// Errors that end a processing job
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A component required by the stage could not be loaded
    #[error("Stage '{stage}' aborted: {source}")]
    StageAborted {
        stage: &'static str,
        #[source]
        source: ComponentError,
    },

    /// The stage itself failed
    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: &'static str,
        #[source]
        source: Box<PipelineError>,
    },

    /// Component lookup or downcast error inside a stage
    #[error("Component error: {0}")]
    Component(#[from] ComponentError),

    /// PDF parsing or extraction error
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR error
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Reading the job input failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Job options or input rejected before any stage ran
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    /// A stage ran before the stage producing its input
    #[error("Missing stage input: {0}")]
    MissingInput(&'static str),
}

impl PipelineError {
    /// Name of the stage that ended the job, if a stage did
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            Self::StageAborted { stage, .. } | Self::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// True when a component loader failed or timed out
    pub fn is_load_failure(&self) -> bool {
        match self {
            Self::StageAborted { source, .. } => source.is_load_failure(),
            _ => false,
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
