//! Shared helpers for the pipeline integration tests

#![allow(dead_code)]

#[path = "../../src/processors/fixtures.rs"]
pub mod fixtures;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use amnesia_pipeline::component::ComponentManager;
use amnesia_pipeline::config::Config;
use amnesia_pipeline::pipeline::{ExtractionOptions, MemoryProbe, PipelineOrchestrator};
use amnesia_pipeline::processors::{self, OcrError, OcrProvider, OcrProviderKind, OcrResult};

use self::fixtures::{build_pdf, FixtureImage, FixturePage};

pub const MB: u64 = 1024 * 1024;

/// Memory probe that always reports the same reading
pub struct FixedProbe(pub u64);

impl MemoryProbe for FixedProbe {
    fn current_bytes(&self) -> u64 {
        self.0
    }
}

/// OCR provider returning canned text
pub struct StaticOcr {
    pub kind: OcrProviderKind,
    pub text: &'static str,
    pub available: bool,
    pub calls: Arc<AtomicUsize>,
}

impl StaticOcr {
    pub fn new(kind: OcrProviderKind, text: &'static str) -> Self {
        Self {
            kind,
            text,
            available: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn offline(kind: OcrProviderKind) -> Self {
        Self {
            available: false,
            ..Self::new(kind, "")
        }
    }
}

#[async_trait]
impl OcrProvider for StaticOcr {
    fn provider_type(&self) -> OcrProviderKind {
        self.kind
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn recognize(&self, _image_data: &[u8], _language: Option<&str>) -> Result<OcrResult, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(OcrResult {
            text: self.text.to_string(),
            confidence: 88.0,
            provider: self.kind,
        })
    }
}

/// Eight text pages, three content images and one decorative icon
pub fn report_pdf() -> Vec<u8> {
    titled_report_pdf("quarterly report", 8)
}

/// Text pages mentioning `title`, with content images on pages 2, 5 and 8
/// and a 16x16 icon on page 1
pub fn titled_report_pdf(title: &str, pages: u32) -> Vec<u8> {
    let texts: Vec<String> = (1..=pages)
        .map(|n| format!("Page {} of the {} body text", n, title))
        .collect();
    let pages: Vec<FixturePage<'_>> = texts
        .iter()
        .zip(1u32..)
        .map(|(text, n)| FixturePage {
            text: Some(text.as_str()),
            images: match n {
                1 => vec![FixtureImage::Jpeg { width: 16, height: 16 }],
                2 | 5 | 8 => vec![FixtureImage::Jpeg { width: 320, height: 240 }],
                _ => Vec::new(),
            },
        })
        .collect();
    build_pdf(&pages)
}

/// Two pages: one with a text layer, one scanned
pub fn scanned_pdf() -> Vec<u8> {
    build_pdf(&[
        FixturePage {
            text: Some("Cover letter with a readable text layer"),
            images: vec![FixtureImage::Jpeg { width: 200, height: 100 }],
        },
        FixturePage {
            text: None,
            images: vec![FixtureImage::Jpeg { width: 600, height: 800 }],
        },
    ])
}

pub fn lazy_config() -> Config {
    let mut config = Config::default();
    config.ocr.enabled = false;
    config.pipeline.memory_sample_interval_ms = 0;
    config
}

pub fn eager_config() -> Config {
    let mut config = lazy_config();
    config.pipeline.lazy_loading = false;
    config
}

pub fn orchestrator(config: &Config, memory: u64) -> PipelineOrchestrator {
    let manager = ComponentManager::new(config.manager_config());
    processors::register_defaults(&manager, config).unwrap();
    PipelineOrchestrator::new(manager, config.pipeline.clone())
        .with_memory_probe(Arc::new(FixedProbe(memory)))
}

pub fn no_ocr() -> ExtractionOptions {
    ExtractionOptions {
        enable_ocr: false,
        ..ExtractionOptions::default()
    }
}
