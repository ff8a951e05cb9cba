//! In-memory PDF builders shared by unit and integration tests

use std::io::Cursor;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// Image placed on a page
pub enum FixtureImage {
    /// JPEG-encoded RGB image (DCTDecode)
    Jpeg { width: u32, height: u32 },
    /// Uncompressed 8-bit DeviceRGB pixels
    RawRgb { width: u32, height: u32 },
    /// 1-bit mask, not re-encodable
    Bilevel { width: u32, height: u32 },
}

pub struct FixturePage<'a> {
    pub text: Option<&'a str>,
    pub images: Vec<FixtureImage>,
}

/// PDF with one text line per page
pub fn text_pdf(pages: &[&str]) -> Vec<u8> {
    let pages: Vec<FixturePage<'_>> = pages
        .iter()
        .map(|text| FixturePage {
            text: Some(*text),
            images: Vec::new(),
        })
        .collect();
    build_pdf(&pages)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Jpeg)
        .unwrap();
    out.into_inner()
}

pub fn build_pdf(pages: &[FixturePage<'_>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut page_ids: Vec<ObjectId> = Vec::new();
    for page in pages {
        let mut operations = Vec::new();
        let mut xobjects = lopdf::Dictionary::new();

        if let Some(text) = page.text {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![72.into(), 720.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(text)]));
            operations.push(Operation::new("ET", vec![]));
        }

        for (idx, image) in page.images.iter().enumerate() {
            let name = format!("Im{}", idx + 1);
            let (width, height, stream) = image_stream(image);
            let image_id = doc.add_object(stream);
            xobjects.set(name.as_bytes().to_vec(), image_id);

            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new(
                "cm",
                vec![
                    (width as i64).into(),
                    0.into(),
                    0.into(),
                    (height as i64).into(),
                    72.into(),
                    (100 + idx as i64 * 150).into(),
                ],
            ));
            operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
            operations.push(Operation::new("Q", vec![]));
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
                "XObject" => xobjects,
            },
        });
        page_ids.push(page_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| Object::from(*id)).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn image_stream(image: &FixtureImage) -> (u32, u32, Stream) {
    match *image {
        FixtureImage::Jpeg { width, height } => (
            width,
            height,
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width as i64,
                    "Height" => height as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                jpeg_bytes(width, height),
            ),
        ),
        FixtureImage::RawRgb { width, height } => (
            width,
            height,
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width as i64,
                    "Height" => height as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                },
                vec![200u8; (width * height * 3) as usize],
            ),
        ),
        FixtureImage::Bilevel { width, height } => (
            width,
            height,
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width as i64,
                    "Height" => height as i64,
                    "ImageMask" => true,
                    "BitsPerComponent" => 1,
                },
                vec![0u8; (width.div_ceil(8) * height) as usize],
            ),
        ),
    }
}
