//! Pipeline job and result types

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::component::UnloadOutcome;
use crate::processors::{ExtractedImage, ImageEncoding, OcrProviderKind, PageText, PdfHandle};

/// Where the job's PDF bytes come from
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Bytes(Arc<[u8]>),
    Path(PathBuf),
}

/// What a job should extract
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOptions {
    pub extract_text: bool,
    pub extract_images: bool,
    /// OCR images on pages without a text layer
    pub enable_ocr: bool,
    /// OCR language hint (provider default when unset)
    pub ocr_language: Option<String>,
    /// Use only this OCR provider instead of the configured fallback order
    pub ocr_provider: Option<OcrProviderKind>,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            extract_text: true,
            extract_images: true,
            enable_ocr: true,
            ocr_language: None,
            ocr_provider: None,
        }
    }
}

/// A single document processing request
#[derive(Debug, Clone)]
pub struct ProcessingJob {
    pub id: Uuid,
    /// Stable document identifier used in results and logs
    pub document_id: String,
    pub source: DocumentSource,
    pub options: ExtractionOptions,
}

impl ProcessingJob {
    pub fn from_bytes(document_id: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id: document_id.into(),
            source: DocumentSource::Bytes(bytes.into()),
            options: ExtractionOptions::default(),
        }
    }

    /// Job reading its input from disk; the file name (without extension) is
    /// the document id
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let document_id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            id: Uuid::new_v4(),
            document_id,
            source: DocumentSource::Path(path),
            options: ExtractionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExtractionOptions) -> Self {
        self.options = options;
        self
    }
}

/// One unit of extracted content
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractedItem {
    Text {
        page: u32,
        text: String,
    },
    Image {
        page: u32,
        width: u32,
        height: u32,
        encoding: ImageEncoding,
        bytes_len: usize,
    },
    OcrText {
        page: u32,
        text: String,
        confidence: f64,
        provider: OcrProviderKind,
    },
}

impl ExtractedItem {
    pub fn page(&self) -> u32 {
        match self {
            Self::Text { page, .. } | Self::Image { page, .. } | Self::OcrText { page, .. } => *page,
        }
    }
}

/// Final state of a job that ran to the end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Completed,
    /// Finished, but unloads failed, OCR fell through or memory exceeded the ceiling
    CompletedWithWarnings,
}

/// Timing, memory and component usage of one stage
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: &'static str,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub components: Vec<String>,
    pub memory_before_bytes: u64,
    pub memory_peak_bytes: u64,
    pub memory_after_bytes: u64,
    pub items_added: usize,
    /// Outcome of unloads triggered when the stage released its components
    pub unload_outcomes: Vec<(String, UnloadOutcome)>,
}

/// Result of a processing job
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
    pub job_id: Uuid,
    pub document_id: String,
    pub status: JobStatus,
    pub total_pages: usize,
    pub items: Vec<ExtractedItem>,
    pub stages: Vec<StageReport>,
    /// Components used by the job, in first-use order
    pub components_used: Vec<String>,
    pub warnings: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub peak_memory_bytes: u64,
}

impl ProcessingResult {
    pub fn text_items(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, ExtractedItem::Text { .. }))
            .count()
    }

    pub fn image_items(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, ExtractedItem::Image { .. }))
            .count()
    }

    pub fn ocr_items(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, ExtractedItem::OcrText { .. }))
            .count()
    }
}

/// Data handed from stage to stage within one job
#[derive(Debug, Default)]
pub struct JobState {
    pub document: Option<Arc<PdfHandle>>,
    pub pages: Vec<PageText>,
    pub images: Vec<ExtractedImage>,
    pub items: Vec<ExtractedItem>,
    pub warnings: Vec<String>,
}

impl JobState {
    pub fn total_pages(&self) -> usize {
        self.document.as_ref().map_or(0, |doc| doc.page_count())
    }

    /// Pages known to have no text layer
    ///
    /// Empty until text extraction has run.
    pub fn pages_without_text(&self) -> Vec<u32> {
        self.pages
            .iter()
            .filter(|page| !page.has_text_layer)
            .map(|page| page.page)
            .collect()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}
