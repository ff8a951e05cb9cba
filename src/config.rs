//! Configuration management for the Amnesia pipeline
//!
//! Values come from the environment (a `.env` file is loaded by the binary
//! via dotenvy). Unset variables fall back to defaults; malformed values are
//! rejected instead of silently replaced.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::component::{ManagerConfig, UnloadPolicy, DEFAULT_LOAD_TIMEOUT_SECS};
use crate::processors::OcrProviderKind;

const MB: u64 = 1024 * 1024;

/// Largest megabyte value whose byte count fits in a u64
const MAX_MB: u64 = u64::MAX / MB;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },

    #[error("{0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub pdf: PdfProcessorConfig,
    pub text: TextExtractorConfig,
    pub image: ImageExtractorConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Load components per stage and unload them afterwards. When false,
    /// every component is preloaded and kept (the eager baseline).
    pub lazy_loading: bool,
    /// Per-stage peak memory above which a warning is recorded
    pub memory_ceiling_mb: u64,
    /// Maximum time a component loader may take
    pub component_load_timeout_secs: u64,
    /// Interval for peak memory sampling while a stage runs
    pub memory_sample_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfProcessorConfig {
    /// Reject documents larger than this
    pub max_file_size_mb: u64,
    /// Reject documents with more pages than this
    pub max_pages: usize,
    /// Parsed documents kept by the processor (LRU)
    pub open_document_capacity: usize,
    /// Timeout for parsing a document
    pub parse_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextExtractorConfig {
    /// Pages with fewer non-whitespace characters count as having no text layer
    pub min_chars: usize,
    /// Collapse runs of whitespace and blank lines
    pub normalize_whitespace: bool,
    /// Timeout for extracting a whole document
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageExtractorConfig {
    /// Images narrower than this are treated as decorative and skipped
    pub min_width: u32,
    /// Images shorter than this are treated as decorative and skipped
    pub min_height: u32,
    /// Re-encode raw (Flate/uncompressed) 8-bit images as PNG
    pub reencode_raw: bool,
    /// Timeout for extracting a whole document
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Default for jobs that don't say otherwise
    pub enabled: bool,
    /// Preferred provider order
    pub providers: Vec<OcrProviderKind>,
    pub ollama_url: String,
    pub ollama_model: String,
    /// Default OCR language
    pub default_language: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pipeline: PipelineConfig {
                lazy_loading: true,
                memory_ceiling_mb: 1200,
                component_load_timeout_secs: DEFAULT_LOAD_TIMEOUT_SECS,
                memory_sample_interval_ms: 50,
            },
            pdf: PdfProcessorConfig {
                max_file_size_mb: 200,
                max_pages: 2000,
                open_document_capacity: 4,
                parse_timeout_secs: 30,
            },
            text: TextExtractorConfig {
                min_chars: 16,
                normalize_whitespace: true,
                timeout_secs: 60,
            },
            image: ImageExtractorConfig {
                min_width: 64,
                min_height: 64,
                reencode_raw: true,
                timeout_secs: 60,
            },
            ocr: OcrConfig {
                enabled: true,
                providers: vec![OcrProviderKind::Tesseract, OcrProviderKind::Ollama],
                ollama_url: "http://localhost:11434".to_string(),
                ollama_model: "llava".to_string(),
                default_language: "eng".to_string(),
                request_timeout_secs: 120,
            },
        }
    }
}

impl Config {
    /// Build configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Config::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let config = Config {
            pipeline: PipelineConfig {
                lazy_loading: parse_bool(&get, "PIPELINE_LAZY_LOADING", d.pipeline.lazy_loading)?,
                memory_ceiling_mb: parse(&get, "PIPELINE_MEMORY_CEILING_MB", d.pipeline.memory_ceiling_mb)?,
                component_load_timeout_secs: parse(
                    &get,
                    "COMPONENT_LOAD_TIMEOUT_SECS",
                    d.pipeline.component_load_timeout_secs,
                )?,
                memory_sample_interval_ms: parse(
                    &get,
                    "PIPELINE_MEMORY_SAMPLE_INTERVAL_MS",
                    d.pipeline.memory_sample_interval_ms,
                )?,
            },
            pdf: PdfProcessorConfig {
                max_file_size_mb: parse(&get, "PDF_MAX_FILE_SIZE_MB", d.pdf.max_file_size_mb)?,
                max_pages: parse(&get, "PDF_MAX_PAGES", d.pdf.max_pages)?,
                open_document_capacity: parse(
                    &get,
                    "PDF_OPEN_DOCUMENT_CAPACITY",
                    d.pdf.open_document_capacity,
                )?,
                parse_timeout_secs: parse(&get, "PDF_PARSE_TIMEOUT_SECS", d.pdf.parse_timeout_secs)?,
            },
            text: TextExtractorConfig {
                min_chars: parse(&get, "TEXT_MIN_CHARS", d.text.min_chars)?,
                normalize_whitespace: parse_bool(
                    &get,
                    "TEXT_NORMALIZE_WHITESPACE",
                    d.text.normalize_whitespace,
                )?,
                timeout_secs: parse(&get, "TEXT_TIMEOUT_SECS", d.text.timeout_secs)?,
            },
            image: ImageExtractorConfig {
                min_width: parse(&get, "IMAGE_MIN_WIDTH", d.image.min_width)?,
                min_height: parse(&get, "IMAGE_MIN_HEIGHT", d.image.min_height)?,
                reencode_raw: parse_bool(&get, "IMAGE_REENCODE_RAW", d.image.reencode_raw)?,
                timeout_secs: parse(&get, "IMAGE_TIMEOUT_SECS", d.image.timeout_secs)?,
            },
            ocr: OcrConfig {
                enabled: parse_bool(&get, "OCR_ENABLED", d.ocr.enabled)?,
                providers: match get("OCR_PROVIDERS") {
                    Some(raw) => parse_providers(&raw)?,
                    None => d.ocr.providers,
                },
                ollama_url: get("OLLAMA_URL").unwrap_or(d.ocr.ollama_url),
                ollama_model: get("OLLAMA_MODEL").unwrap_or(d.ocr.ollama_model),
                default_language: get("OCR_LANGUAGE").unwrap_or(d.ocr.default_language),
                request_timeout_secs: parse(
                    &get,
                    "OCR_REQUEST_TIMEOUT_SECS",
                    d.ocr.request_timeout_secs,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject combinations the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.memory_ceiling_mb == 0 {
            return Err(ConfigError::Validation(
                "PIPELINE_MEMORY_CEILING_MB must be greater than zero".to_string(),
            ));
        }
        if self.pipeline.memory_ceiling_mb > MAX_MB {
            return Err(ConfigError::Validation(format!(
                "PIPELINE_MEMORY_CEILING_MB must be at most {}",
                MAX_MB
            )));
        }
        if self.pdf.max_file_size_mb > MAX_MB {
            return Err(ConfigError::Validation(format!(
                "PDF_MAX_FILE_SIZE_MB must be at most {}",
                MAX_MB
            )));
        }
        if self.pipeline.component_load_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "COMPONENT_LOAD_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if self.pdf.max_pages == 0 {
            return Err(ConfigError::Validation(
                "PDF_MAX_PAGES must be greater than zero".to_string(),
            ));
        }
        if self.pdf.open_document_capacity == 0 {
            return Err(ConfigError::Validation(
                "PDF_OPEN_DOCUMENT_CAPACITY must be greater than zero".to_string(),
            ));
        }
        if self.ocr.enabled && self.ocr.providers.is_empty() {
            return Err(ConfigError::Validation(
                "OCR_PROVIDERS is empty while OCR_ENABLED is set".to_string(),
            ));
        }
        Ok(())
    }

    /// Settings consumed by the PDF processor loader
    pub fn pdf_processor_config(&self) -> &PdfProcessorConfig {
        &self.pdf
    }

    pub fn text_extractor_config(&self) -> &TextExtractorConfig {
        &self.text
    }

    pub fn image_extractor_config(&self) -> &ImageExtractorConfig {
        &self.image
    }

    pub fn ocr_config(&self) -> &OcrConfig {
        &self.ocr
    }

    pub fn pipeline_config(&self) -> &PipelineConfig {
        &self.pipeline
    }

    /// Component manager settings derived from the pipeline section
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            load_timeout: Duration::from_secs(self.pipeline.component_load_timeout_secs),
            unload_policy: if self.pipeline.lazy_loading {
                UnloadPolicy::WhenIdle
            } else {
                UnloadPolicy::Manual
            },
        }
    }
}

impl PdfProcessorConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(MB)
    }
}

impl PipelineConfig {
    pub fn memory_ceiling_bytes(&self) -> u64 {
        self.memory_ceiling_mb.saturating_mul(MB)
    }
}

fn parse<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

fn parse_bool<G>(get: &G, key: &str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key: key.to_string(),
                value: raw,
            }),
        },
        None => Ok(default),
    }
}

fn parse_providers(raw: &str) -> Result<Vec<OcrProviderKind>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<OcrProviderKind>().map_err(|_| ConfigError::Invalid {
                key: "OCR_PROVIDERS".to_string(),
                value: raw.to_string(),
            })
        })
        .collect()
}
