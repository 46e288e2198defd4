//! The outline pipeline.
//!
//! Pages are classified once per document. Every selected, readable page
//! then goes through extraction, segmentation and normalization on its own
//! (in parallel with rayon when enabled). The per-page block tables are
//! assembled in page order and given a heading hierarchy.

pub mod assemble;
pub mod classify;
pub mod cluster;
pub mod extract;
pub mod hierarchy;
pub mod normalize;
mod options;
pub mod raster;
pub mod segment;

pub use options::{ExtractOptions, OcrOptions, PageSelection, SegmentOptions, DEFAULT_SCALE};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::backend::PdfBackend;
use crate::error::{Error, Result};
use crate::model::{
    Classification, DiagnosticKind, OutlineEntry, PageClass, PageDiagnostic, PageResult,
};
use crate::ocr::OcrEngine;
use extract::{DigitalExtractor, ScannedExtractor, UnitExtractor};

/// Result of outlining one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    /// Document name used in logs and errors
    pub name: String,
    pub entries: Vec<OutlineEntry>,
    pub classification: Classification,
    /// Recoverable page-level failures, in page order
    pub diagnostics: Vec<PageDiagnostic>,
    pub extracted_at: DateTime<Utc>,
}

/// One run of the pipeline over a document.
pub struct Pipeline<'a> {
    backend: &'a dyn PdfBackend,
    ocr: &'a dyn OcrEngine,
    options: &'a ExtractOptions,
    name: &'a str,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        backend: &'a dyn PdfBackend,
        ocr: &'a dyn OcrEngine,
        options: &'a ExtractOptions,
        name: &'a str,
    ) -> Self {
        Self {
            backend,
            ocr,
            options,
            name,
        }
    }

    /// Page numbers to process, validated against the document.
    fn selected_pages(&self) -> Result<Vec<u32>> {
        let count = self.backend.page_count();
        let named_beyond_end = match &self.options.pages {
            PageSelection::All => None,
            PageSelection::Range(range) => Some(*range.start()).filter(|p| *p > count),
            PageSelection::Pages(pages) => pages.iter().copied().find(|p| *p > count),
        };
        if let Some(page) = named_beyond_end {
            return Err(Error::PageOutOfRange(page, count));
        }
        Ok((1..=count)
            .filter(|p| self.options.pages.includes(*p))
            .collect())
    }

    /// Extract, segment and normalize a single page.
    ///
    /// Failures never escape: they become an empty page with a diagnostic.
    pub fn process_page(&self, page_no: u32, class: PageClass) -> PageResult {
        if class.drm {
            log::info!("{}: page {} is protected, skipping", self.name, page_no);
            return PageResult::new(page_no);
        }

        let size = match self.backend.page_size(page_no) {
            Ok(size) => size,
            Err(e) => return self.failed(page_no, DiagnosticKind::TextUnreadable, &e),
        };

        let scale = self.options.scale;
        let extracted = if class.scanned {
            ScannedExtractor::new(self.backend, self.ocr, scale).extract(page_no)
        } else {
            DigitalExtractor::new(self.backend, scale).extract(page_no)
        };
        let page = match extracted {
            Ok(page) => page,
            Err(e) => {
                let kind = match &e {
                    Error::OcrTimeout(_) => DiagnosticKind::OcrTimeout,
                    Error::Ocr(_) => DiagnosticKind::OcrFailed,
                    _ if class.scanned => DiagnosticKind::RenderFailed,
                    _ => DiagnosticKind::TextUnreadable,
                };
                return self.failed(page_no, kind, &e);
            }
        };
        log::debug!(
            "{}: page {}: {} units ({})",
            self.name,
            page_no,
            page.units.len(),
            if page.ocr_derived { "ocr" } else { "native" }
        );

        let segmented = segment::segment(page_no, &page, &self.options.segmentation);
        let mut diagnostics = page.diagnostics.clone();
        diagnostics.extend(segmented.diagnostics);

        if let Some(dir) = &self.options.debug_dir {
            let path = dir.join(format!("page-{:04}.png", page_no));
            if let Err(e) = segment::write_overlay(&page.raster, &segmented.regions, page.scale, &path)
            {
                diagnostics.push(PageDiagnostic::new(
                    page_no,
                    DiagnosticKind::OverlayFailed,
                    e.to_string(),
                ));
            }
        }

        let blocks =
            normalize::normalize_page(segmented.blocks, &page.units, size, page.ocr_derived);
        for diagnostic in &diagnostics {
            log::warn!("{}: {}", self.name, diagnostic);
        }

        PageResult {
            page_no,
            blocks,
            diagnostics,
        }
    }

    fn failed(&self, page_no: u32, kind: DiagnosticKind, err: &Error) -> PageResult {
        let result = PageResult::failed(page_no, kind, err.to_string());
        for diagnostic in &result.diagnostics {
            log::warn!("{}: {}", self.name, diagnostic);
        }
        result
    }

    /// Run every stage and return the outline.
    pub fn run(&self) -> Result<Extraction> {
        let classification = classify::classify(self.backend, self.name);
        let selected = self.selected_pages()?;

        let pages: Vec<PageResult> = if self.options.parallel && selected.len() > 1 {
            selected
                .par_iter()
                .map(|&page_no| self.process_page(page_no, classification.page(page_no)))
                .collect()
        } else {
            selected
                .iter()
                .map(|&page_no| self.process_page(page_no, classification.page(page_no)))
                .collect()
        };

        let diagnostics: Vec<PageDiagnostic> = pages
            .iter()
            .flat_map(|p| p.diagnostics.iter().cloned())
            .collect();

        let blocks = assemble::assemble(pages, &classification, self.name)?;
        let entries = hierarchy::outline(blocks);
        log::info!("{}: {} outline entries", self.name, entries.len());

        Ok(Extraction {
            name: self.name.to_string(),
            entries,
            classification,
            diagnostics,
            extracted_at: Utc::now(),
        })
    }
}
