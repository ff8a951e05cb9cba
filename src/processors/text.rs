//! Text extractor component

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::{timeout, Duration};

use super::error::{PdfError, Result};
use super::pdf::PdfHandle;
use crate::component::{Component, ComponentError};
use crate::config::TextExtractorConfig;

/// Text of a single page
#[derive(Debug, Clone, Serialize)]
pub struct PageText {
    /// 1-indexed page number
    pub page: u32,
    pub text: String,
    /// False when the page carries fewer than `min_chars` visible characters
    pub has_text_layer: bool,
}

/// Extracts the text layer of each page
pub struct TextExtractor {
    config: TextExtractorConfig,
    closed: AtomicBool,
}

impl TextExtractor {
    /// Component loader
    pub async fn load(config: TextExtractorConfig) -> std::result::Result<Self, ComponentError> {
        if config.timeout_secs == 0 {
            return Err(ComponentError::InvalidConfig(
                "text extraction timeout must be positive".to_string(),
            ));
        }
        Ok(Self {
            config,
            closed: AtomicBool::new(false),
        })
    }

    /// Extract every page of the document in page order
    ///
    /// Pages lopdf cannot decode come back empty (and without a text layer)
    /// so a single broken page does not fail the document.
    pub async fn extract(&self, handle: Arc<PdfHandle>) -> Result<Vec<PageText>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PdfError::Closed("Text extractor"));
        }

        let config = self.config.clone();
        let timeout_secs = config.timeout_secs;

        timeout(
            Duration::from_secs(timeout_secs),
            tokio::task::spawn_blocking(move || {
                handle
                    .pages()
                    .keys()
                    .map(|&page| {
                        let raw = match handle.document().extract_text(&[page]) {
                            Ok(text) => text,
                            Err(e) => {
                                tracing::warn!("Text extraction failed for page {}: {}", page, e);
                                String::new()
                            }
                        };
                        page_text(page, &raw, &config)
                    })
                    .collect::<Vec<_>>()
            }),
        )
        .await
        .map_err(|_| PdfError::Timeout(timeout_secs))?
        .map_err(PdfError::from)
    }
}

fn page_text(page: u32, raw: &str, config: &TextExtractorConfig) -> PageText {
    let text = if config.normalize_whitespace {
        normalize_whitespace(raw)
    } else {
        raw.trim().to_string()
    };
    let visible = text.chars().filter(|c| !c.is_whitespace()).count();

    PageText {
        page,
        text,
        has_text_layer: visible >= config.min_chars,
    }
}

/// Collapse whitespace runs into single spaces, keeping paragraph breaks
fn normalize_whitespace(raw: &str) -> String {
    raw.split("\n\n")
        .map(|para| para.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|para| !para.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Component for TextExtractor {
    fn kind(&self) -> &'static str {
        "text_extractor"
    }

    async fn cleanup(&self) -> std::result::Result<(), ComponentError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
