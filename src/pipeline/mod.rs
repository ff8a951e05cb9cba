//! Multi-stage document processing
//!
//! A [`PipelineOrchestrator`] runs the stages of a [`ProcessingJob`]
//! (parse, text extraction, image extraction, OCR), acquiring each stage's
//! components from the shared
//! [`ComponentManager`](crate::component::ComponentManager) only while the
//! stage runs.

mod error;
mod memory;
mod orchestrator;
mod stage;
mod stages;
mod types;

pub use error::{PipelineError, Result};
pub use memory::{MemoryProbe, PeakSampler, ProcessMemoryProbe};
pub use orchestrator::PipelineOrchestrator;
pub use stage::{PipelineStage, StageContext};
pub use stages::{default_stages, ImageExtractionStage, OcrStage, ParseStage, TextExtractionStage};
pub use types::{
    DocumentSource, ExtractedItem, ExtractionOptions, JobState, JobStatus, ProcessingJob,
    ProcessingResult, StageReport,
};
