//! Amnesia document pipeline
//!
//! Lazy lifecycle management for the heavy components (PDF parsing, text
//! and image extraction, OCR) used by the document processing pipeline.

pub mod component;
pub mod config;
pub mod pipeline;
pub mod processors;

pub use component::{ComponentError, ComponentManager};
pub use config::Config;
pub use pipeline::{PipelineError, PipelineOrchestrator, ProcessingJob, ProcessingResult};
