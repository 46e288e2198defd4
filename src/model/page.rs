//! Page classification and per-page results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Block;

/// Heuristic classification of a single page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageClass {
    /// Native text looks garbled (protected or unreadable)
    pub drm: bool,
    /// Page carries (almost) no native text
    pub scanned: bool,
    /// Scan resolution is adequate (always true for digital pages)
    pub dpi_ok: bool,
}

/// Outcome of the scan-resolution check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DpiReport {
    pub passed: bool,
    /// 1-indexed pages below the minimum resolution
    pub faulty_pages: Vec<u32>,
}

/// Classification of every page of a document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Classification {
    /// Page number (1-indexed) to page class
    pub pages: BTreeMap<u32, PageClass>,
    /// Document-level scan mode (majority vote, ties favour scanned)
    pub scanned: bool,
    pub dpi: DpiReport,
}

impl Classification {
    pub fn page(&self, page_no: u32) -> PageClass {
        self.pages.get(&page_no).copied().unwrap_or_default()
    }

    pub fn scanned_count(&self) -> usize {
        self.pages.values().filter(|c| c.scanned).count()
    }

    pub fn drm_count(&self) -> usize {
        self.pages.values().filter(|c| c.drm).count()
    }
}

/// Kind of a recoverable, page-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Native text could not be read
    TextUnreadable,
    /// Stripped raster had no glyphs; the original page was rendered instead
    StripFallback,
    /// Page raster could not be produced
    RenderFailed,
    /// OCR engine failed
    OcrFailed,
    /// OCR engine exceeded its time budget
    OcrTimeout,
    /// Segmentation found no regions
    NoRegions,
    /// Diagnostic overlay could not be written
    OverlayFailed,
}

/// A recoverable failure recorded against one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDiagnostic {
    pub page_no: u32,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl PageDiagnostic {
    pub fn new(page_no: u32, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            page_no,
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PageDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "page {}: {:?}: {}", self.page_no, self.kind, self.message)
    }
}

/// Ordered blocks of one page plus whatever went wrong producing them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageResult {
    pub page_no: u32,
    pub blocks: Vec<Block>,
    pub diagnostics: Vec<PageDiagnostic>,
}

impl PageResult {
    pub fn new(page_no: u32) -> Self {
        Self {
            page_no,
            ..Default::default()
        }
    }

    /// An empty page carrying a single diagnostic.
    pub fn failed(page_no: u32, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            page_no,
            blocks: Vec::new(),
            diagnostics: vec![PageDiagnostic::new(page_no, kind, message)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_defaults_for_unknown_page() {
        let c = Classification::default();
        assert_eq!(c.page(7), PageClass::default());
        assert_eq!(c.scanned_count(), 0);
    }

    #[test]
    fn test_failed_page_result() {
        let result = PageResult::failed(2, DiagnosticKind::OcrTimeout, "killed after 120s");
        assert!(result.is_empty());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(
            result.diagnostics[0].to_string(),
            "page 2: OcrTimeout: killed after 120s"
        );
    }
}
