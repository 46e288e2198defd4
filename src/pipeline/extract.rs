//! Unit extraction: spans for digital pages, OCR words for scanned pages.

use image::RgbImage;

use super::raster::stripped_raster;
use crate::backend::{PdfBackend, RawSpan};
use crate::error::Result;
use crate::model::{DiagnosticKind, FontStyle, PageDiagnostic, Unit};
use crate::ocr::{OcrEngine, OcrWord};

/// Units of one page together with the raster they are segmented on.
#[derive(Debug, Clone)]
pub struct PageUnits {
    /// Units in extraction order
    pub units: Vec<Unit>,
    pub raster: RgbImage,
    /// Pixels per page unit of `raster`
    pub scale: f32,
    /// Units come from OCR rather than native text
    pub ocr_derived: bool,
    pub diagnostics: Vec<PageDiagnostic>,
}

/// A strategy that turns one page into units.
pub trait UnitExtractor: Sync {
    fn extract(&self, page_no: u32) -> Result<PageUnits>;
}

/// Extraction from the native text layer.
pub struct DigitalExtractor<'a> {
    backend: &'a dyn PdfBackend,
    scale: f32,
}

impl<'a> DigitalExtractor<'a> {
    pub fn new(backend: &'a dyn PdfBackend, scale: f32) -> Self {
        Self { backend, scale }
    }
}

fn unit_from_span(span: &RawSpan) -> Unit {
    Unit {
        rect: span.rect,
        text: span.text.trim().to_string(),
        size: span.size,
        style: FontStyle::from_flags(span.flags),
        color: span.color,
        font: span.font.clone(),
        ordinal: span.ordinal,
    }
}

impl UnitExtractor for DigitalExtractor<'_> {
    fn extract(&self, page_no: u32) -> Result<PageUnits> {
        let size = self.backend.page_size(page_no)?;
        let page_rect = size.rect();
        let spans: Vec<RawSpan> = self
            .backend
            .page_spans(page_no)?
            .into_iter()
            .filter(|s| !s.text.trim().is_empty() && s.rect.intersects(&page_rect))
            .collect();
        let units = spans.iter().map(unit_from_span).collect();

        let mut diagnostics = Vec::new();
        let raster = match stripped_raster(size, &spans, self.scale) {
            Some(raster) => raster,
            None => {
                diagnostics.push(PageDiagnostic::new(
                    page_no,
                    DiagnosticKind::StripFallback,
                    "no drawable glyphs, segmenting the rendered page",
                ));
                self.backend.render_page(page_no, self.scale)?
            }
        };

        Ok(PageUnits {
            units,
            raster,
            scale: self.scale,
            ocr_derived: false,
            diagnostics,
        })
    }
}

/// Extraction by rendering the page and running OCR on it.
pub struct ScannedExtractor<'a> {
    backend: &'a dyn PdfBackend,
    ocr: &'a dyn OcrEngine,
    scale: f32,
}

impl<'a> ScannedExtractor<'a> {
    pub fn new(backend: &'a dyn PdfBackend, ocr: &'a dyn OcrEngine, scale: f32) -> Self {
        Self {
            backend,
            ocr,
            scale,
        }
    }

    /// Resolution the raster is handed to the OCR engine at.
    pub fn dpi(&self) -> u32 {
        (72.0 * self.scale).round() as u32
    }
}

/// Convert an OCR word from raster pixels to a page-space unit.
///
/// The font size is the engine's when reported, else the box height.
pub fn unit_from_word(word: OcrWord, scale: f32) -> Unit {
    let rect = word.rect.descale(scale);
    let size = word.font_size.unwrap_or_else(|| rect.height());
    Unit::new(rect, word.text, size).with_ordinal(word.ordinal)
}

impl UnitExtractor for ScannedExtractor<'_> {
    fn extract(&self, page_no: u32) -> Result<PageUnits> {
        let raster = self.backend.render_page(page_no, self.scale)?;
        let words = self.ocr.recognize(&raster, self.dpi())?;
        let units = words
            .into_iter()
            .map(|w| unit_from_word(w, self.scale))
            .collect();

        Ok(PageUnits {
            units,
            raster,
            scale: self.scale,
            ocr_derived: true,
            diagnostics: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Rect, UnitOrdinal};

    #[test]
    fn test_unit_from_span_decodes_style() {
        let span = RawSpan {
            text: " Heading ".to_string(),
            rect: Rect::new(72.0, 72.0, 150.0, 90.0),
            glyphs: Vec::new(),
            size: 18.0,
            flags: FontStyle::FLAG_BOLD | FontStyle::FLAG_SERIFED,
            font: "Times".to_string(),
            color: Some(0x112233),
            ordinal: UnitOrdinal::new(1, 0, 2, 0),
        };
        let unit = unit_from_span(&span);
        assert_eq!(unit.text, "Heading");
        assert_eq!(unit.style, FontStyle::Bold);
        assert_eq!(unit.font, "Times");
        assert_eq!(unit.color, Some(0x112233));
        assert_eq!(unit.ordinal.line, 2);
    }

    #[test]
    fn test_unit_from_word_descales() {
        let word = OcrWord {
            text: "Scanned".to_string(),
            rect: Rect::new(400.0, 800.0, 800.0, 848.0),
            font_size: None,
            confidence: Some(93.0),
            ordinal: UnitOrdinal::new(0, 1, 2, 3),
        };
        let unit = unit_from_word(word.clone(), 4.0);
        assert_eq!(unit.rect, Rect::new(100.0, 200.0, 200.0, 212.0));
        assert_eq!(unit.size, 12.0);
        assert!(unit.style.is_normal());
        assert!(unit.font.is_empty());

        let sized = unit_from_word(OcrWord { font_size: Some(10.0), ..word }, 4.0);
        assert_eq!(sized.size, 10.0);
    }
}
