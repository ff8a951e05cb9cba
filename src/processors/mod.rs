//! Heavy processing components
//!
//! Each processor is built by an async `load` taking its config section and
//! implements [`Component`](crate::component::Component), so it can be
//! registered with the [`ComponentManager`] and loaded on demand.

mod error;
mod image;
pub mod ocr;
mod pdf;
mod text;

#[cfg(test)]
pub(crate) mod fixtures;

use tracing::info;

use crate::component::{loader_fn, ComponentError, ComponentManager};
use crate::config::Config;

pub use self::error::PdfError;
pub use self::image::{ExtractedImage, ImageEncoding, ImageExtraction, ImageExtractor};
pub use self::ocr::{OcrError, OcrProcessor, OcrProvider, OcrProviderKind, OcrResult};
pub use self::pdf::{PdfHandle, PdfProcessor};
pub use self::text::{PageText, TextExtractor};

/// Registry name of the PDF processor
pub const PDF_PROCESSOR: &str = "pdf_processor";
/// Registry name of the text extractor
pub const TEXT_EXTRACTOR: &str = "text_extractor";
/// Registry name of the image extractor
pub const IMAGE_EXTRACTOR: &str = "image_extractor";
/// Registry name of the OCR processor
pub const OCR_PROCESSOR: &str = "ocr_processor";

/// Register the built-in processors
///
/// Only the loaders are stored; nothing is instantiated until a stage
/// acquires the component. The OCR processor is skipped when OCR is
/// disabled in config.
pub fn register_defaults(manager: &ComponentManager, config: &Config) -> Result<(), ComponentError> {
    let pdf_config = config.pdf_processor_config().clone();
    manager.register_component(
        PDF_PROCESSOR,
        loader_fn(move || PdfProcessor::load(pdf_config.clone())),
    )?;

    let text_config = config.text_extractor_config().clone();
    manager.register_component(
        TEXT_EXTRACTOR,
        loader_fn(move || TextExtractor::load(text_config.clone())),
    )?;

    let image_config = config.image_extractor_config().clone();
    manager.register_component(
        IMAGE_EXTRACTOR,
        loader_fn(move || ImageExtractor::load(image_config.clone())),
    )?;

    if config.ocr_config().enabled {
        let ocr_config = config.ocr_config().clone();
        manager.register_component(
            OCR_PROCESSOR,
            loader_fn(move || OcrProcessor::load(ocr_config.clone())),
        )?;
    }

    info!(
        "Registered {} processing components",
        manager.registered_components().len()
    );
    Ok(())
}
