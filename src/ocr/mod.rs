//! OCR capability.
//!
//! Scanned pages are recognized by an [`OcrEngine`]; the bundled
//! [`TesseractEngine`] drives the `tesseract` executable and parses its hOCR.

mod hocr;
mod tesseract;

pub use hocr::parse_hocr;
pub use tesseract::TesseractEngine;

use image::RgbImage;

use crate::error::Result;
use crate::model::{Rect, UnitOrdinal};

/// One recognized word.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    pub text: String,
    /// Bounding box in raster pixels
    pub rect: Rect,
    /// Font size in points, when the engine reports it
    pub font_size: Option<f32>,
    /// Word confidence in percent
    pub confidence: Option<f32>,
    /// (block, paragraph, line, word)
    pub ordinal: UnitOrdinal,
}

/// Abstract interface for optical character recognition.
pub trait OcrEngine: Sync {
    /// Recognize the words of a page raster rendered at `dpi`.
    fn recognize(&self, image: &RgbImage, dpi: u32) -> Result<Vec<OcrWord>>;
}
