//! OCR Types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// OCR backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrProviderKind {
    /// Tesseract CLI (local, requires installation)
    Tesseract,
    /// Ollama vision model (local LLM)
    Ollama,
}

impl fmt::Display for OcrProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tesseract => write!(f, "tesseract"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

impl FromStr for OcrProviderKind {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tesseract" => Ok(Self::Tesseract),
            "ollama" => Ok(Self::Ollama),
            other => Err(OcrError::ProviderNotAvailable(format!(
                "unknown OCR provider: {}",
                other
            ))),
        }
    }
}

/// OCR result
#[derive(Debug, Clone, Serialize)]
pub struct OcrResult {
    /// Recognized text
    pub text: String,
    /// Confidence score (0-100)
    pub confidence: f64,
    /// Provider used
    pub provider: OcrProviderKind,
}

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR provider not available: {0}")]
    ProviderNotAvailable(String),

    #[error("OCR processing failed: {0}")]
    ProcessingError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("OCR processor has been closed")]
    Closed,
}
