//! Page classification: protected text, scanned pages and scan resolution.

use std::collections::BTreeMap;

use crate::backend::{ColorSpace, PdfBackend};
use crate::error::Result;
use crate::model::{Classification, DpiReport, PageClass};

/// Pages whose ASCII share is at or below this fraction are treated as protected.
pub const DRM_ASCII_RATIO: f64 = 0.2;

/// Pages with at most this many characters of native text are treated as scanned.
pub const SCANNED_MAX_CHARS: usize = 100;

/// Minimum effective resolution of a usable scan.
pub const MIN_DPI: u32 = 250;

/// Scale of the fallback render used to measure resolution.
const DPI_RENDER_SCALE: f32 = 2.0;

/// True when `text` looks garbled: non-empty and mostly non-ASCII.
pub fn is_protected_text(text: &str) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    let ascii = text.chars().filter(char::is_ascii).count();
    (ascii as f64 / total as f64) <= DRM_ASCII_RATIO
}

/// Classify a single page from its native text.
pub fn classify_text(text: &str) -> PageClass {
    let scanned = text.chars().count() <= SCANNED_MAX_CHARS;
    PageClass {
        // scanned pages are never considered protected
        drm: !scanned && is_protected_text(text),
        scanned,
        dpi_ok: true,
    }
}

/// Effective horizontal resolution of a scanned page.
///
/// Measured on the first embedded image; CMYK images and image-less pages
/// are measured on a 2x render instead.
pub fn effective_dpi(backend: &dyn PdfBackend, page_no: u32) -> Result<u32> {
    let size = backend.page_size(page_no)?;
    if size.width <= 0.0 {
        return Ok(0);
    }
    let images = backend.page_images(page_no)?;
    let pixel_width = match images.first() {
        Some(image) if image.color_space != ColorSpace::Cmyk => image.pixel_width,
        _ => backend.render_page(page_no, DPI_RENDER_SCALE)?.width(),
    };
    Ok((72.0 * pixel_width as f32 / size.width).floor() as u32)
}

/// Classify every page of a document.
///
/// `name` is only used to give log messages context.
pub fn classify(backend: &dyn PdfBackend, name: &str) -> Classification {
    let mut pages = BTreeMap::new();
    let mut faulty_pages = Vec::new();
    let (mut scanned_pages, mut passed_pages) = (0usize, 0usize);

    for page_no in 1..=backend.page_count() {
        let text = backend.page_text(page_no).unwrap_or_else(|e| {
            log::warn!("{}: page {}: native text unreadable: {}", name, page_no, e);
            String::new()
        });
        let mut class = classify_text(&text);

        if class.scanned {
            scanned_pages += 1;
            let dpi = effective_dpi(backend, page_no).unwrap_or_else(|e| {
                log::warn!("{}: page {}: resolution unknown: {}", name, page_no, e);
                0
            });
            class.dpi_ok = dpi >= MIN_DPI;
            if class.dpi_ok {
                passed_pages += 1;
            } else {
                faulty_pages.push(page_no);
            }
            log::debug!("{}: page {}: scanned at {} dpi", name, page_no, dpi);
        }

        pages.insert(page_no, class);
    }

    let digital_pages = pages.len() - scanned_pages;
    let passed = scanned_pages == 0 || passed_pages * 2 > scanned_pages;
    if !faulty_pages.is_empty() {
        log::warn!(
            "{}: scan resolution below {} dpi on pages {:?}",
            name,
            MIN_DPI,
            faulty_pages
        );
    }

    let classification = Classification {
        pages,
        scanned: scanned_pages >= digital_pages,
        dpi: DpiReport {
            passed,
            faulty_pages,
        },
    };
    log::info!(
        "{}: {} pages, {} scanned, {} protected",
        name,
        classification.pages.len(),
        classification.scanned_count(),
        classification.drm_count()
    );
    classification
}
