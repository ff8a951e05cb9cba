//! OCR Providers
//!
//! Defines the provider trait and implementations for different OCR backends.

use std::time::Duration;

use async_trait::async_trait;

use super::types::{OcrError, OcrProviderKind, OcrResult};

/// OCR provider trait
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Get the provider type
    fn provider_type(&self) -> OcrProviderKind;

    /// Check if the provider is available
    async fn is_available(&self) -> bool;

    /// Perform OCR on an encoded image (PNG/JPEG)
    async fn recognize(&self, image_data: &[u8], language: Option<&str>) -> Result<OcrResult, OcrError>;
}

/// Tesseract OCR provider (shells out to the `tesseract` CLI)
#[cfg(feature = "ocr-tesseract")]
pub struct TesseractProvider {
    default_language: String,
}

#[cfg(feature = "ocr-tesseract")]
impl TesseractProvider {
    pub fn new(default_language: &str) -> Self {
        Self {
            default_language: default_language.to_string(),
        }
    }
}

#[cfg(feature = "ocr-tesseract")]
#[async_trait]
impl OcrProvider for TesseractProvider {
    fn provider_type(&self) -> OcrProviderKind {
        OcrProviderKind::Tesseract
    }

    async fn is_available(&self) -> bool {
        tokio::process::Command::new("tesseract")
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn recognize(&self, image_data: &[u8], language: Option<&str>) -> Result<OcrResult, OcrError> {
        let lang = language.unwrap_or(&self.default_language);

        let input_path = std::env::temp_dir().join(format!("ocr_input_{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&input_path, image_data)
            .await
            .map_err(|e| OcrError::ProcessingError(format!("Failed to write temp file: {}", e)))?;

        // "stdout" as output base makes tesseract print instead of writing a file
        let output = tokio::process::Command::new("tesseract")
            .arg(&input_path)
            .arg("stdout")
            .args(["-l", lang, "--oem", "3", "--psm", "3"])
            .output()
            .await;

        let _ = tokio::fs::remove_file(&input_path).await;

        let output = output
            .map_err(|e| OcrError::ProcessingError(format!("Failed to run tesseract: {}", e)))?;

        if !output.status.success() {
            return Err(OcrError::ProcessingError(format!(
                "Tesseract failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        Ok(OcrResult {
            text: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            confidence: 80.0, // Plain-text output carries no confidence
            provider: OcrProviderKind::Tesseract,
        })
    }
}

/// Ollama vision model provider
pub struct OllamaProvider {
    client: reqwest::Client,
    /// Ollama API URL
    base_url: String,
    /// Model name (e.g., "llava", "bakllava")
    model: String,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: &str, request_timeout: Duration) -> Result<Self, OcrError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| OcrError::ApiError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl OcrProvider for OllamaProvider {
    fn provider_type(&self) -> OcrProviderKind {
        OcrProviderKind::Ollama
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn recognize(&self, image_data: &[u8], language: Option<&str>) -> Result<OcrResult, OcrError> {
        use base64::Engine;

        let url = format!("{}/api/generate", self.base_url);
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(image_data);

        let lang_hint = language
            .map(|l| format!(" The text is in {}.", l))
            .unwrap_or_default();

        let prompt = format!(
            "Extract all text from this image exactly as written.{} Return only the extracted text, nothing else.",
            lang_hint
        );

        let request = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "images": [image_base64],
            "stream": false
        });

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to call Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::ApiError(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to parse response: {}", e)))?;

        let text = result["response"]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string();

        Ok(OcrResult {
            text,
            confidence: 75.0, // LLMs don't provide confidence scores
            provider: OcrProviderKind::Ollama,
        })
    }
}
