//! [`PdfBackend`] implementation backed by `lopdf`.

use std::collections::BTreeMap;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use super::content::{self, interpret, resolve, stream_bytes, PageContent};
use super::xobject::{decode_image, image_info};
use super::{EmbeddedImage, PdfBackend, RawSpan};
use crate::detect::{detect_header_from_bytes, detect_header_from_path};
use crate::error::{Error, Result};
use crate::model::{PageSize, Rect};
use crate::pipeline::raster::fill_glyph_boxes;

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
    pages: BTreeMap<u32, ObjectId>,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        detect_header_from_path(path)?;
        let doc = LopdfDocument::load(path).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Ok(Self::from_document(doc))
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        detect_header_from_bytes(data)?;
        let doc = LopdfDocument::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Ok(Self::from_document(doc))
    }

    /// Wrap an already loaded document.
    pub fn from_document(doc: LopdfDocument) -> Self {
        if doc.is_encrypted() {
            // text of protected documents usually decodes to garbage; the
            // page classifier flags such pages instead of failing here
            log::warn!("Document is encrypted; native text may be unreadable");
        }
        let pages = doc.get_pages();
        Self { doc, pages }
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn page_id(&self, page_no: u32) -> Result<ObjectId> {
        self.pages
            .get(&page_no)
            .copied()
            .ok_or(Error::PageOutOfRange(page_no, self.pages.len() as u32))
    }

    /// Look up `key` on the page, following `/Parent` links.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = page_id;
        // Parent chains are shallow; the bound guards against cycles
        for _ in 0..32 {
            let dict = self.doc.get_dictionary(current).ok()?;
            if let Ok(value) = dict.get(key) {
                return Some(resolve(&self.doc, value));
            }
            current = dict.get(b"Parent").ok()?.as_reference().ok()?;
        }
        None
    }

    /// Visible page box in PDF user space (CropBox, else MediaBox).
    fn page_box(&self, page_id: ObjectId) -> Rect {
        [b"CropBox".as_slice(), b"MediaBox".as_slice()]
            .iter()
            .find_map(|key| {
                let arr = self.inherited(page_id, key)?.as_array().ok()?;
                let v: Vec<f32> = arr
                    .iter()
                    .filter_map(|o| content::number(resolve(&self.doc, o)))
                    .collect();
                match v.as_slice() {
                    [x0, y0, x1, y1] => Some(Rect::new(x0.min(*x1), y0.min(*y1), x0.max(*x1), y0.max(*y1))),
                    _ => None,
                }
            })
            .unwrap_or_else(|| PageSize::letter().rect())
    }

    fn resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        self.inherited(page_id, b"Resources")?.as_dict().ok()
    }

    fn page_content(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        let page_dict = self.doc.get_dictionary(page_id)?;
        let Ok(contents) = page_dict.get(b"Contents") else {
            return Ok(Vec::new());
        };

        match resolve(&self.doc, contents) {
            Object::Stream(s) => stream_bytes(s),
            Object::Array(arr) => {
                let mut content = Vec::new();
                for obj in arr {
                    if let Object::Stream(s) = resolve(&self.doc, obj) {
                        match stream_bytes(s) {
                            Ok(data) => {
                                content.extend_from_slice(&data);
                                content.push(b' ');
                            }
                            Err(e) => log::warn!("Skipping unreadable content stream: {e}"),
                        }
                    }
                }
                Ok(content)
            }
            _ => Err(Error::PdfParse("Invalid content stream".to_string())),
        }
    }

    fn interpret(&self, page_no: u32) -> Result<PageContent<'_>> {
        let page_id = self.page_id(page_no)?;
        let data = self.page_content(page_id)?;
        interpret(
            &self.doc,
            &data,
            self.resources(page_id),
            self.page_box(page_id),
        )
    }
}

/// Join span texts: spaces within a line, newlines between lines.
fn join_spans(spans: &[RawSpan]) -> String {
    let mut text = String::new();
    let mut prev_line = None;
    for span in spans {
        let line = (span.ordinal.block, span.ordinal.line);
        match prev_line {
            Some(prev) if prev == line => text.push(' '),
            Some(_) => text.push('\n'),
            None => {}
        }
        text.push_str(&span.text);
        prev_line = Some(line);
    }
    text
}

impl PdfBackend for LopdfBackend {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page_no: u32) -> Result<PageSize> {
        let rect = self.page_box(self.page_id(page_no)?);
        Ok(PageSize::new(rect.width(), rect.height()))
    }

    fn page_text(&self, page_no: u32) -> Result<String> {
        Ok(join_spans(&self.interpret(page_no)?.spans))
    }

    fn page_spans(&self, page_no: u32) -> Result<Vec<RawSpan>> {
        Ok(self.interpret(page_no)?.spans)
    }

    fn page_images(&self, page_no: u32) -> Result<Vec<EmbeddedImage>> {
        let content = self.interpret(page_no)?;
        Ok(content
            .images
            .iter()
            .map(|placement| {
                let info = image_info(&self.doc, placement.stream);
                EmbeddedImage {
                    name: placement.name.clone(),
                    rect: placement.rect,
                    pixel_width: info.width,
                    pixel_height: info.height,
                    color_space: info.color_space,
                    bits_per_component: info.bits_per_component,
                }
            })
            .collect())
    }

    fn render_page(&self, page_no: u32, scale: f32) -> Result<RgbImage> {
        if scale.is_nan() || scale <= 0.0 {
            return Err(Error::Other(format!("invalid render scale {scale}")));
        }
        let size = self.page_size(page_no)?;
        let content = self.interpret(page_no)?;

        let width = ((size.width * scale).ceil() as u32).max(1);
        let height = ((size.height * scale).ceil() as u32).max(1);
        let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));

        for placement in &content.images {
            let target = placement.rect.scale(scale);
            let (w, h) = (target.width().round() as u32, target.height().round() as u32);
            if w == 0 || h == 0 {
                continue;
            }
            match decode_image(&self.doc, placement.stream) {
                Ok(img) => {
                    let resized = imageops::resize(&img.to_rgb8(), w, h, FilterType::Triangle);
                    imageops::overlay(
                        &mut canvas,
                        &resized,
                        target.x0.round() as i64,
                        target.y0.round() as i64,
                    );
                }
                Err(e) => log::debug!(
                    "Page {}: skipping image {}: {}",
                    page_no,
                    placement.name,
                    e
                ),
            }
        }

        for span in &content.spans {
            let [_, r, g, b] = span.color.unwrap_or(0).to_be_bytes();
            fill_glyph_boxes(&mut canvas, &span.glyphs, scale, Rgb([r, g, b]));
        }

        Ok(canvas)
    }
}
