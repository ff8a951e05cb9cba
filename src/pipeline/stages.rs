//! Built-in stages

use std::collections::HashSet;

use async_trait::async_trait;

use super::error::Result;
use super::stage::{PipelineStage, StageContext};
use super::types::{DocumentSource, ExtractedItem, ExtractionOptions};
use crate::processors::{
    ImageExtractor, OcrProcessor, PdfProcessor, TextExtractor, IMAGE_EXTRACTOR, OCR_PROCESSOR,
    PDF_PROCESSOR, TEXT_EXTRACTOR,
};

/// Stage order used by [`default_stages`]
pub fn default_stages() -> Vec<Box<dyn PipelineStage>> {
    vec![
        Box::new(ParseStage),
        Box::new(TextExtractionStage),
        Box::new(ImageExtractionStage),
        Box::new(OcrStage),
    ]
}

/// Read the input and parse it into a shared document handle
pub struct ParseStage;

#[async_trait]
impl PipelineStage for ParseStage {
    fn name(&self) -> &'static str {
        "parse"
    }

    fn required_components(&self) -> &[&'static str] {
        &[PDF_PROCESSOR]
    }

    fn is_enabled(&self, _options: &ExtractionOptions) -> bool {
        true
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<()> {
        let pdf = ctx.component::<PdfProcessor>(PDF_PROCESSOR)?;

        let bytes = match &ctx.job.source {
            DocumentSource::Bytes(bytes) => bytes.clone(),
            DocumentSource::Path(path) => tokio::fs::read(path).await?.into(),
        };

        let handle = pdf.open(&ctx.job.document_id, bytes).await?;
        ctx.state.document = Some(handle);
        Ok(())
    }
}

/// Per-page text; also decides which pages need OCR
pub struct TextExtractionStage;

#[async_trait]
impl PipelineStage for TextExtractionStage {
    fn name(&self) -> &'static str {
        "text_extraction"
    }

    fn required_components(&self) -> &[&'static str] {
        &[TEXT_EXTRACTOR]
    }

    fn is_enabled(&self, options: &ExtractionOptions) -> bool {
        options.extract_text || options.enable_ocr
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<()> {
        let extractor = ctx.component::<TextExtractor>(TEXT_EXTRACTOR)?;
        let pages = extractor.extract(ctx.document()?).await?;

        if ctx.job.options.extract_text {
            ctx.state.items.extend(
                pages
                    .iter()
                    .filter(|page| page.has_text_layer)
                    .map(|page| ExtractedItem::Text {
                        page: page.page,
                        text: page.text.clone(),
                    }),
            );
        }

        ctx.state.pages = pages;
        Ok(())
    }
}

/// Embedded raster images
pub struct ImageExtractionStage;

#[async_trait]
impl PipelineStage for ImageExtractionStage {
    fn name(&self) -> &'static str {
        "image_extraction"
    }

    fn required_components(&self) -> &[&'static str] {
        &[IMAGE_EXTRACTOR]
    }

    fn is_enabled(&self, options: &ExtractionOptions) -> bool {
        options.extract_images || options.enable_ocr
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<()> {
        let extractor = ctx.component::<ImageExtractor>(IMAGE_EXTRACTOR)?;
        let extraction = extractor.extract(ctx.document()?).await?;

        if extraction.skipped_unsupported > 0 {
            ctx.state.warn(format!(
                "{} images use an unsupported encoding and were skipped",
                extraction.skipped_unsupported
            ));
        }

        if ctx.job.options.extract_images {
            ctx.state
                .items
                .extend(extraction.images.iter().map(|image| ExtractedItem::Image {
                    page: image.page,
                    width: image.width,
                    height: image.height,
                    encoding: image.encoding,
                    bytes_len: image.data.len(),
                }));
        }

        ctx.state.images = extraction.images;
        Ok(())
    }
}

/// OCR of images on pages that have no text layer
///
/// A failed image only adds a warning; the stage itself fails only if the
/// OCR processor cannot be loaded.
pub struct OcrStage;

#[async_trait]
impl PipelineStage for OcrStage {
    fn name(&self) -> &'static str {
        "ocr"
    }

    fn required_components(&self) -> &[&'static str] {
        &[OCR_PROCESSOR]
    }

    fn is_enabled(&self, options: &ExtractionOptions) -> bool {
        options.enable_ocr
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<()> {
        let scanned: HashSet<u32> = ctx.state.pages_without_text().into_iter().collect();
        if scanned.is_empty() {
            tracing::debug!("Every page has a text layer, nothing to OCR");
            return Ok(());
        }

        let ocr = ctx.component::<OcrProcessor>(OCR_PROCESSOR)?;
        let language = ctx.job.options.ocr_language.clone();
        let preferred = ctx.job.options.ocr_provider;
        let targets: Vec<_> = ctx
            .state
            .images
            .iter()
            .filter(|image| scanned.contains(&image.page))
            .cloned()
            .collect();
        if targets.is_empty() {
            return Ok(());
        }

        let available = ocr.available_providers().await;
        let usable = match preferred {
            Some(kind) => available.contains(&kind),
            None => !available.is_empty(),
        };
        if !usable {
            let reason = match preferred {
                Some(kind) => format!("OCR provider {} is not available", kind),
                None => "No OCR provider is available".to_string(),
            };
            ctx.state.warn(format!(
                "{}, skipped {} images on pages without text",
                reason,
                targets.len()
            ));
            return Ok(());
        }

        for image in targets {
            match ocr.recognize(&image.data, preferred, language.as_deref()).await {
                Ok(result) if result.text.trim().is_empty() => {
                    tracing::debug!("OCR found no text in image on page {}", image.page);
                }
                Ok(result) => ctx.state.items.push(ExtractedItem::OcrText {
                    page: image.page,
                    text: result.text,
                    confidence: result.confidence,
                    provider: result.provider,
                }),
                Err(e) => ctx
                    .state
                    .warn(format!("OCR failed for image on page {}: {}", image.page, e)),
            }
        }

        Ok(())
    }
}
