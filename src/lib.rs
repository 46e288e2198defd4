//! # pdf-outline
//!
//! Layout-aware outline extraction for PDF documents.
//!
//! This library turns the pages of a PDF, digitally authored or scanned,
//! into a flat list of content blocks (titles, body text, tables, figures)
//! in reading order, each linked to the heading it belongs to.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_outline::{extract, render};
//!
//! fn main() -> pdf_outline::Result<()> {
//!     let entries = extract("report.pdf", "report.pdf")?;
//!     println!("{}", render::to_tree_text(&entries));
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! - **Classification**: protected text, scanned pages and scan resolution
//! - **Extraction**: native spans, or OCR words through Tesseract
//! - **Segmentation**: morphological closing and contour tracing on a page raster
//! - **Normalization**: border stripping, multicolumn segments, block merging, reading order
//! - **Assembly**: sentence-continuation merging and watermark filtering
//! - **Hierarchy**: duplicate-title suppression and heading depths
//!
//! Pages are processed in parallel with Rayon.

pub mod backend;
pub mod detect;
pub mod error;
pub mod model;
pub mod ocr;
pub mod pipeline;
pub mod render;

// Re-export commonly used types
pub use backend::{LopdfBackend, PdfBackend};
pub use detect::{detect_header_from_bytes, detect_header_from_path, is_pdf_bytes, PdfHeader};
pub use error::{Error, Result};
pub use model::{
    Block, BlockLabel, Classification, DocumentBlock, HierarchyNode, OutlineEntry, PageClass,
    PageDiagnostic, Rect, Unit,
};
pub use ocr::{OcrEngine, TesseractEngine};
pub use pipeline::{
    Extraction, ExtractOptions, OcrOptions, PageSelection, Pipeline, SegmentOptions,
};
pub use render::{to_json, to_tree_text, JsonFormat};

use std::path::Path;

/// Configurable entry point wiring options, backend and OCR engine.
///
/// # Example
///
/// ```no_run
/// use pdf_outline::{ExtractOptions, Outliner, PageSelection};
///
/// let outliner = Outliner::with_options(
///     ExtractOptions::new().with_pages(PageSelection::Range(1..=3)),
/// );
/// let extraction = outliner.run("report.pdf", "report.pdf").unwrap();
/// println!("{} blocks", extraction.entries.len());
/// ```
#[derive(Default)]
pub struct Outliner {
    options: ExtractOptions,
    ocr: Option<Box<dyn OcrEngine + Send>>,
}

impl Outliner {
    /// Create an outliner with default options and the Tesseract engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an outliner with custom options.
    pub fn with_options(options: ExtractOptions) -> Self {
        Self {
            options,
            ocr: None,
        }
    }

    /// Use a different OCR engine for scanned pages.
    pub fn with_ocr_engine(mut self, engine: impl OcrEngine + Send + 'static) -> Self {
        self.ocr = Some(Box::new(engine));
        self
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Outline the PDF at `path`. `name` identifies the document in logs
    /// and errors.
    pub fn run<P: AsRef<Path>>(&self, path: P, name: &str) -> Result<Extraction> {
        let backend = LopdfBackend::open(path)?;
        self.run_backend(&backend, name)
    }

    /// Outline a PDF held in memory.
    pub fn run_bytes(&self, data: &[u8], name: &str) -> Result<Extraction> {
        let backend = LopdfBackend::load_bytes(data)?;
        self.run_backend(&backend, name)
    }

    /// Outline a document through any backend.
    pub fn run_backend(&self, backend: &dyn PdfBackend, name: &str) -> Result<Extraction> {
        let tesseract;
        let ocr: &dyn OcrEngine = match &self.ocr {
            Some(engine) => engine.as_ref(),
            None => {
                tesseract = TesseractEngine::new(self.options.ocr.clone());
                &tesseract
            }
        };
        Pipeline::new(backend, ocr, &self.options, name).run()
    }
}

/// Outline a PDF file with default options.
///
/// # Example
///
/// ```no_run
/// use pdf_outline::extract;
///
/// for entry in extract("report.pdf", "report.pdf").unwrap() {
///     println!("{} {} {}", entry.block_id, entry.label, entry.text);
/// }
/// ```
pub fn extract<P: AsRef<Path>>(path: P, name: &str) -> Result<Vec<OutlineEntry>> {
    Ok(Outliner::new().run(path, name)?.entries)
}

/// Outline a PDF file on the blocking thread pool.
#[cfg(feature = "async")]
pub async fn extract_async<P: AsRef<Path>>(path: P, name: &str) -> Result<Vec<OutlineEntry>> {
    let path = path.as_ref().to_path_buf();
    let name = name.to_string();
    tokio::task::spawn_blocking(move || extract(path, &name))
        .await
        .map_err(|e| Error::Other(format!("extraction task failed: {}", e)))?
}
