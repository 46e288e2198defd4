//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for the page model the pipeline needs
//! (text, positioned spans, embedded images, rasters), isolating the concrete
//! PDF library (lopdf) from layout analysis.

mod content;
mod xobject;
mod lopdf_backend;

pub use lopdf_backend::LopdfBackend;

use image::RgbImage;

use crate::error::Result;
use crate::model::{PageSize, Rect, UnitOrdinal};

/// A positioned run of text produced by one text-showing operator.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSpan {
    pub text: String,
    /// Bounding box in page units, origin top-left
    pub rect: Rect,
    /// One box per non-whitespace character
    pub glyphs: Vec<Rect>,
    /// Effective font size in points
    pub size: f32,
    /// Style flags, see [`crate::model::FontStyle`]
    pub flags: u32,
    /// Font family name, subset prefix removed
    pub font: String,
    /// Fill colour as 0xRRGGBB
    pub color: Option<u32>,
    pub ordinal: UnitOrdinal,
}

/// Colour model of an embedded raster image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed,
    Other,
}

impl ColorSpace {
    /// Number of samples per pixel, when fixed.
    pub fn components(&self) -> Option<usize> {
        match self {
            ColorSpace::Gray | ColorSpace::Indexed => Some(1),
            ColorSpace::Rgb => Some(3),
            ColorSpace::Cmyk => Some(4),
            ColorSpace::Other => None,
        }
    }
}

/// An image XObject painted on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    /// XObject resource name
    pub name: String,
    /// Placement on the page in page units, origin top-left
    pub rect: Rect,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub color_space: ColorSpace,
    pub bits_per_component: u8,
}

/// Abstract interface for PDF document access.
///
/// Pages are addressed by 1-indexed page number. Implementations must be
/// shareable across the page worker pool.
pub trait PdfBackend: Sync {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Page dimensions in points.
    fn page_size(&self, page_no: u32) -> Result<PageSize>;

    /// Native text of the page, in content-stream order.
    fn page_text(&self, page_no: u32) -> Result<String>;

    /// Positioned text spans with font metadata.
    fn page_spans(&self, page_no: u32) -> Result<Vec<RawSpan>>;

    /// Raster images painted on the page, in paint order.
    fn page_images(&self, page_no: u32) -> Result<Vec<EmbeddedImage>>;

    /// Rasterize the page at `scale` pixels per point.
    fn render_page(&self, page_no: u32, scale: f32) -> Result<RgbImage>;
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// Check if a character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
pub(crate) fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and extensions
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana, Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
}
