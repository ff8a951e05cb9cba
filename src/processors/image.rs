//! Image extractor component
//!
//! Walks each page's `Resources` (including resources inherited from the
//! page tree) for image XObjects. JPEG and JPEG 2000 streams are passed
//! through untouched; raw or Flate-compressed 8-bit RGB/Gray pixels are
//! re-encoded to PNG. Anything else is counted as unsupported.

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;
use tokio::time::{timeout, Duration};

use super::error::{PdfError, Result};
use super::pdf::PdfHandle;
use crate::component::{Component, ComponentError};
use crate::config::ImageExtractorConfig;

/// Page tree depth searched for inherited resources
const MAX_RESOURCE_DEPTH: usize = 32;

/// Encoding of extracted image bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    Jpeg,
    Jpeg2000,
    Png,
}

/// An image pulled out of a page
#[derive(Clone, Serialize)]
pub struct ExtractedImage {
    /// 1-indexed page the image was first seen on
    pub page: u32,
    #[serde(skip)]
    pub object_id: ObjectId,
    pub width: u32,
    pub height: u32,
    pub encoding: ImageEncoding,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl std::fmt::Debug for ExtractedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractedImage")
            .field("page", &self.page)
            .field("object_id", &self.object_id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("encoding", &self.encoding)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Images of a document plus counts of what was skipped
#[derive(Debug, Clone, Default)]
pub struct ImageExtraction {
    pub images: Vec<ExtractedImage>,
    /// Below `min_width`/`min_height`
    pub skipped_small: usize,
    /// Filter or color space that can't be passed through or re-encoded
    pub skipped_unsupported: usize,
    /// Same XObject drawn again on a later page
    pub skipped_duplicates: usize,
}

/// Extracts embedded raster images
pub struct ImageExtractor {
    config: ImageExtractorConfig,
    closed: AtomicBool,
}

impl ImageExtractor {
    /// Component loader
    pub async fn load(config: ImageExtractorConfig) -> std::result::Result<Self, ComponentError> {
        if config.timeout_secs == 0 {
            return Err(ComponentError::InvalidConfig(
                "image extraction timeout must be positive".to_string(),
            ));
        }
        Ok(Self {
            config,
            closed: AtomicBool::new(false),
        })
    }

    /// Extract the images of every page
    pub async fn extract(&self, handle: Arc<PdfHandle>) -> Result<ImageExtraction> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PdfError::Closed("Image extractor"));
        }

        let config = self.config.clone();
        let timeout_secs = config.timeout_secs;

        let extraction = timeout(
            Duration::from_secs(timeout_secs),
            tokio::task::spawn_blocking(move || extract_images(&handle, &config)),
        )
        .await
        .map_err(|_| PdfError::Timeout(timeout_secs))??;

        tracing::debug!(
            "Extracted {} images ({} small, {} unsupported, {} duplicates)",
            extraction.images.len(),
            extraction.skipped_small,
            extraction.skipped_unsupported,
            extraction.skipped_duplicates
        );

        Ok(extraction)
    }
}

#[async_trait]
impl Component for ImageExtractor {
    fn kind(&self) -> &'static str {
        "image_extractor"
    }

    async fn cleanup(&self) -> std::result::Result<(), ComponentError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

fn extract_images(handle: &PdfHandle, config: &ImageExtractorConfig) -> ImageExtraction {
    let doc = handle.document();
    let mut extraction = ImageExtraction::default();
    let mut seen: HashSet<ObjectId> = HashSet::new();

    for (&page, &page_id) in handle.pages() {
        for object_id in page_image_ids(doc, page_id) {
            if !seen.insert(object_id) {
                extraction.skipped_duplicates += 1;
                continue;
            }

            let Ok(stream) = doc.get_object(object_id).and_then(Object::as_stream) else {
                continue;
            };

            let width = dict_u32(&stream.dict, b"Width").unwrap_or(0);
            let height = dict_u32(&stream.dict, b"Height").unwrap_or(0);
            if width < config.min_width || height < config.min_height {
                extraction.skipped_small += 1;
                continue;
            }

            match encode_image(doc, stream, width, height, config) {
                Ok(Some((encoding, data))) => extraction.images.push(ExtractedImage {
                    page,
                    object_id,
                    width,
                    height,
                    encoding,
                    data,
                }),
                Ok(None) => extraction.skipped_unsupported += 1,
                Err(e) => {
                    tracing::warn!(
                        "Skipping image {:?} on page {}: {}",
                        object_id,
                        page,
                        e
                    );
                    extraction.skipped_unsupported += 1;
                }
            }
        }
    }

    extraction
}

/// Image XObject ids reachable from a page's resources, in name order
fn page_image_ids(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let Some(resources) = page_resources(doc, page_id) else {
        return Vec::new();
    };
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
    else {
        return Vec::new();
    };

    let mut ids: Vec<(Vec<u8>, ObjectId)> = xobjects
        .iter()
        .filter_map(|(name, obj)| obj.as_reference().ok().map(|id| (name.clone(), id)))
        .filter(|(_, id)| is_image(doc, *id))
        .collect();
    ids.sort_by(|a, b| a.0.cmp(&b.0));
    ids.into_iter().map(|(_, id)| id).collect()
}

/// Page resources, falling back to the nearest ancestor that defines them
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut current = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_RESOURCE_DEPTH {
        if let Some(resources) = current
            .get(b"Resources")
            .ok()
            .and_then(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_dict().ok())
        {
            return Some(resources);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }

    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn is_image(doc: &Document, id: ObjectId) -> bool {
    doc.get_object(id)
        .and_then(Object::as_stream)
        .ok()
        .and_then(|stream| stream.dict.get(b"Subtype").ok())
        .and_then(|subtype| subtype.as_name().ok())
        .is_some_and(|name| name == b"Image")
}

fn dict_u32(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    dict.get(key)
        .ok()
        .and_then(|obj| obj.as_i64().ok())
        .and_then(|v| u32::try_from(v).ok())
}

fn dict_name<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    dict.get(key)
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_name().ok())
}

/// Filter names of a stream (single name or array)
fn filters<'a>(doc: &'a Document, stream: &'a Stream) -> Vec<&'a [u8]> {
    match stream.dict.get(b"Filter").ok().and_then(|obj| resolve(doc, obj)) {
        Some(Object::Name(name)) => vec![name.as_slice()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn encode_image(
    doc: &Document,
    stream: &Stream,
    width: u32,
    height: u32,
    config: &ImageExtractorConfig,
) -> Result<Option<(ImageEncoding, Vec<u8>)>> {
    let filters = filters(doc, stream);

    match filters.last().copied() {
        Some(b"DCTDecode") if filters.len() == 1 => {
            return Ok(Some((ImageEncoding::Jpeg, stream.content.clone())))
        }
        Some(b"JPXDecode") if filters.len() == 1 => {
            return Ok(Some((ImageEncoding::Jpeg2000, stream.content.clone())))
        }
        _ => {}
    }

    if !config.reencode_raw || !filters.iter().all(|f| *f == b"FlateDecode") {
        return Ok(None);
    }
    if dict_u32(&stream.dict, b"BitsPerComponent") != Some(8) {
        return Ok(None);
    }

    let pixels = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream.decompressed_content()?
    };

    let decoded = match dict_name(doc, &stream.dict, b"ColorSpace") {
        Some(b"DeviceRGB") => image::RgbImage::from_raw(width, height, truncate(pixels, width, height, 3))
            .map(image::DynamicImage::ImageRgb8),
        Some(b"DeviceGray") => image::GrayImage::from_raw(width, height, truncate(pixels, width, height, 1))
            .map(image::DynamicImage::ImageLuma8),
        _ => return Ok(None),
    };
    let decoded = decoded.ok_or_else(|| {
        PdfError::ImageError(format!("pixel data too short for {}x{} image", width, height))
    })?;

    let mut png = Cursor::new(Vec::new());
    decoded
        .write_to(&mut png, image::ImageFormat::Png)
        .map_err(|e| PdfError::ImageError(e.to_string()))?;

    Ok(Some((ImageEncoding::Png, png.into_inner())))
}

/// Drop trailing padding some writers append to pixel streams
fn truncate(mut pixels: Vec<u8>, width: u32, height: u32, channels: usize) -> Vec<u8> {
    let expected = width as usize * height as usize * channels;
    if pixels.len() > expected {
        pixels.truncate(expected);
    }
    pixels
}
