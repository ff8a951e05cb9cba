//! PDF processor component
//!
//! Parses documents into shared [`PdfHandle`]s and keeps the most recent
//! ones in an LRU keyed by a SHA-256 of the source bytes, so repeated jobs
//! on the same content skip re-parsing while the processor stays loaded.
//! Document ids are labels only and never select a cached parse.
//!
//! Parsing is CPU-bound and runs on the blocking pool under a timeout, the
//! same way page rendering is offloaded in the document cache.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lopdf::{Document, ObjectId};
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::time::{timeout, Duration};

use super::error::{PdfError, Result};
use crate::component::{Component, ComponentError};
use crate::config::PdfProcessorConfig;

/// A parsed document shared between pipeline stages
pub struct PdfHandle {
    id: String,
    content_hash: String,
    document: Document,
    pages: BTreeMap<u32, ObjectId>,
    byte_len: usize,
}

impl PdfHandle {
    /// Document id the handle was first parsed under
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Hex SHA-256 of the source bytes, the processor cache key
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Underlying lopdf document
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Page number (1-indexed) to page object id
    pub fn pages(&self) -> &BTreeMap<u32, ObjectId> {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Size of the source bytes
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }
}

impl std::fmt::Debug for PdfHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfHandle")
            .field("id", &self.id)
            .field("content_hash", &self.content_hash)
            .field("pages", &self.pages.len())
            .field("byte_len", &self.byte_len)
            .finish()
    }
}

/// PDF processor
pub struct PdfProcessor {
    config: PdfProcessorConfig,
    documents: Mutex<LruCache<String, Arc<PdfHandle>>>,
    closed: AtomicBool,
}

impl PdfProcessor {
    /// Component loader
    pub async fn load(config: PdfProcessorConfig) -> std::result::Result<Self, ComponentError> {
        let capacity = NonZeroUsize::new(config.open_document_capacity).ok_or_else(|| {
            ComponentError::InvalidConfig("PDF open_document_capacity must be at least 1".to_string())
        })?;

        tracing::debug!(
            "PDF processor ready (max {} pages, {} MB, {} cached documents)",
            config.max_pages,
            config.max_file_size_mb,
            capacity
        );

        Ok(Self {
            config,
            documents: Mutex::new(LruCache::new(capacity)),
            closed: AtomicBool::new(false),
        })
    }

    /// Parse a document, or return the cached handle for identical bytes
    pub async fn open(&self, doc_id: &str, data: Arc<[u8]>) -> Result<Arc<PdfHandle>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PdfError::Closed("PDF processor"));
        }

        let size = data.len() as u64;
        let max = self.config.max_file_size_bytes();
        if size > max {
            return Err(PdfError::TooLarge { size, max });
        }

        let key = {
            let data = data.clone();
            tokio::task::spawn_blocking(move || content_hash(&data)).await?
        };

        if let Some(handle) = self.get(&key) {
            tracing::debug!(
                "PDF {} served from processor cache (parsed as {})",
                doc_id,
                handle.id()
            );
            return Ok(handle);
        }

        let parse_timeout = self.config.parse_timeout_secs;
        let doc_id_owned = doc_id.to_string();
        let hash = key.clone();
        let handle = timeout(
            Duration::from_secs(parse_timeout),
            tokio::task::spawn_blocking(move || {
                let document = Document::load_mem(&data)?;
                let pages = document.get_pages();
                Ok::<_, PdfError>(PdfHandle {
                    id: doc_id_owned,
                    content_hash: hash,
                    document,
                    pages,
                    byte_len: data.len(),
                })
            }),
        )
        .await
        .map_err(|_| PdfError::Timeout(parse_timeout))???;

        if handle.page_count() == 0 {
            return Err(PdfError::Empty);
        }
        if handle.page_count() > self.config.max_pages {
            return Err(PdfError::TooManyPages {
                pages: handle.page_count(),
                max: self.config.max_pages,
            });
        }

        tracing::info!(
            "Parsed PDF {} ({} pages, {} bytes)",
            doc_id,
            handle.page_count(),
            handle.byte_len()
        );

        let handle = Arc::new(handle);
        self.documents.lock().put(key, handle.clone());
        Ok(handle)
    }

    /// Cached handle for a content hash
    pub fn get(&self, content_hash: &str) -> Option<Arc<PdfHandle>> {
        self.documents.lock().get(content_hash).cloned()
    }

    /// Drop the cached handle for a content hash
    pub fn close(&self, content_hash: &str) -> bool {
        self.documents.lock().pop(content_hash).is_some()
    }

    /// Number of cached documents
    pub fn open_documents(&self) -> usize {
        self.documents.lock().len()
    }
}

/// Compute SHA-256 hash of document bytes
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[async_trait]
impl Component for PdfProcessor {
    fn kind(&self) -> &'static str {
        "pdf_processor"
    }

    fn estimated_memory_bytes(&self) -> u64 {
        self.documents
            .lock()
            .iter()
            .map(|(_, handle)| handle.byte_len() as u64)
            .sum()
    }

    async fn cleanup(&self) -> std::result::Result<(), ComponentError> {
        self.closed.store(true, Ordering::Release);
        let closed = {
            let mut documents = self.documents.lock();
            let count = documents.len();
            documents.clear();
            count
        };
        tracing::debug!("PDF processor closed {} cached documents", closed);
        Ok(())
    }
}
