//! OCR processor component
//!
//! Wraps an ordered list of OCR providers behind the [`Component`]
//! contract. Providers hold HTTP clients and are only built when the
//! component is loaded; `cleanup` drops them.
//!
//! Supports multiple backends:
//! - Tesseract (local CLI, `ocr-tesseract` feature)
//! - Ollama vision models (local LLM)

mod provider;
mod types;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::component::{Component, ComponentError};
use crate::config::OcrConfig;

pub use provider::{OcrProvider, OllamaProvider};
pub use types::{OcrError, OcrProviderKind, OcrResult};

#[cfg(feature = "ocr-tesseract")]
pub use provider::TesseractProvider;

/// OCR processor for pages without a text layer
pub struct OcrProcessor {
    config: OcrConfig,
    providers: RwLock<Vec<Arc<dyn OcrProvider>>>,
    closed: AtomicBool,
    images_processed: AtomicU64,
}

impl OcrProcessor {
    /// Component loader: build the configured providers
    pub async fn load(config: OcrConfig) -> Result<Self, ComponentError> {
        let mut providers: Vec<Arc<dyn OcrProvider>> = Vec::new();

        for kind in &config.providers {
            match kind {
                #[cfg(feature = "ocr-tesseract")]
                OcrProviderKind::Tesseract => {
                    providers.push(Arc::new(TesseractProvider::new(&config.default_language)));
                }
                #[cfg(not(feature = "ocr-tesseract"))]
                OcrProviderKind::Tesseract => {
                    tracing::debug!("Tesseract provider requested but ocr-tesseract feature is off");
                }
                OcrProviderKind::Ollama => {
                    let provider = OllamaProvider::new(
                        &config.ollama_url,
                        &config.ollama_model,
                        Duration::from_secs(config.request_timeout_secs),
                    )
                    .map_err(|e| ComponentError::load_failed("ocr_processor", e))?;
                    providers.push(Arc::new(provider));
                }
            }
        }

        if providers.is_empty() {
            return Err(ComponentError::InvalidConfig(
                "no usable OCR providers configured".to_string(),
            ));
        }

        Ok(Self::with_providers(config, providers))
    }

    /// Build with explicit providers
    pub fn with_providers(config: OcrConfig, providers: Vec<Arc<dyn OcrProvider>>) -> Self {
        Self {
            config,
            providers: RwLock::new(providers),
            closed: AtomicBool::new(false),
            images_processed: AtomicU64::new(0),
        }
    }

    /// Get available providers
    pub async fn available_providers(&self) -> Vec<OcrProviderKind> {
        let mut available = Vec::new();
        for provider in self.provider_list() {
            if provider.is_available().await {
                available.push(provider.provider_type());
            }
        }
        available
    }

    /// Number of images recognized by this instance
    pub fn images_processed(&self) -> u64 {
        self.images_processed.load(Ordering::Relaxed)
    }

    /// Perform OCR on an encoded image
    ///
    /// With a preferred provider only that provider is tried; otherwise
    /// providers are tried in configured order and the first success wins.
    pub async fn recognize(
        &self,
        image_data: &[u8],
        preferred_provider: Option<OcrProviderKind>,
        language: Option<&str>,
    ) -> Result<OcrResult, OcrError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(OcrError::Closed);
        }

        let lang = language.unwrap_or(&self.config.default_language);
        let providers = self.provider_list();

        if let Some(preferred) = preferred_provider {
            let provider = providers
                .iter()
                .find(|p| p.provider_type() == preferred)
                .ok_or_else(|| {
                    OcrError::ProviderNotAvailable(format!("{} provider is not configured", preferred))
                })?;

            if !provider.is_available().await {
                return Err(OcrError::ProviderNotAvailable(format!(
                    "{} provider is not available",
                    preferred
                )));
            }
            let result = provider.recognize(image_data, Some(lang)).await?;
            self.images_processed.fetch_add(1, Ordering::Relaxed);
            return Ok(result);
        }

        for provider in &providers {
            if !provider.is_available().await {
                continue;
            }
            match provider.recognize(image_data, Some(lang)).await {
                Ok(result) => {
                    self.images_processed.fetch_add(1, Ordering::Relaxed);
                    return Ok(result);
                }
                Err(e) => {
                    tracing::warn!(
                        "OCR provider {} failed: {}, trying next",
                        provider.provider_type(),
                        e
                    );
                }
            }
        }

        Err(OcrError::ProviderNotAvailable(
            "No OCR providers available".to_string(),
        ))
    }

    fn provider_list(&self) -> Vec<Arc<dyn OcrProvider>> {
        self.providers.read().clone()
    }
}

#[async_trait]
impl Component for OcrProcessor {
    fn kind(&self) -> &'static str {
        "ocr_processor"
    }

    async fn cleanup(&self) -> Result<(), ComponentError> {
        self.closed.store(true, Ordering::Release);
        let dropped = {
            let mut providers = self.providers.write();
            let count = providers.len();
            providers.clear();
            count
        };
        tracing::debug!(
            "OCR processor closed ({} providers dropped, {} images processed)",
            dropped,
            self.images_processed()
        );
        Ok(())
    }
}
