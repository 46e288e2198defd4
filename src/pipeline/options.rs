//! Extraction options and configuration.

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Raster scale (pixels per point) used for segmentation and OCR.
pub const DEFAULT_SCALE: f32 = 4.0;

/// Options for outlining PDF documents.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Whether to process pages in parallel
    pub parallel: bool,

    /// Page selection (which pages to process)
    pub pages: PageSelection,

    /// Raster scale for segmentation and OCR
    pub scale: f32,

    /// OCR engine settings
    pub ocr: OcrOptions,

    /// Morphology settings
    pub segmentation: SegmentOptions,

    /// Directory for per-page region overlays
    pub debug_dir: Option<PathBuf>,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Set the raster scale. Non-positive values are ignored.
    pub fn with_scale(mut self, scale: f32) -> Self {
        if scale > 0.0 {
            self.scale = scale;
        }
        self
    }

    /// Set OCR engine settings.
    pub fn with_ocr(mut self, ocr: OcrOptions) -> Self {
        self.ocr = ocr;
        self
    }

    /// Set morphology settings.
    pub fn with_segmentation(mut self, segmentation: SegmentOptions) -> Self {
        self.segmentation = segmentation;
        self
    }

    /// Write a region overlay PNG per segmented page into `dir`.
    pub fn with_debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            pages: PageSelection::All,
            scale: DEFAULT_SCALE,
            ocr: OcrOptions::default(),
            segmentation: SegmentOptions::default(),
            debug_dir: None,
        }
    }
}

/// Settings for the external OCR engine.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOptions {
    /// Tesseract executable
    pub binary: PathBuf,
    /// Language pack(s), e.g. `eng` or `eng+deu`
    pub language: String,
    /// OCR engine mode (1 = LSTM only)
    pub oem: u8,
    /// Page segmentation mode (4 = single column of variable sizes)
    pub psm: u8,
    /// Per-page time budget
    pub timeout: Duration,
}

impl OcrOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_psm(mut self, psm: u8) -> Self {
        self.psm = psm;
        self
    }

    pub fn with_oem(mut self, oem: u8) -> Self {
        self.oem = oem;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            oem: 1,
            psm: 4,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Morphology and contour settings for region segmentation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentOptions {
    /// Side of the square closing kernel, in pixels
    pub kernel_size: u8,
    /// Number of closing iterations
    pub iterations: u8,
    /// Pixels strictly above this level are foreground
    pub threshold: u8,
    /// Regions must exceed this side length, in page units
    pub min_region_side: f32,
}

impl SegmentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kernel(mut self, kernel_size: u8, iterations: u8) -> Self {
        self.kernel_size = kernel_size.max(1);
        self.iterations = iterations;
        self
    }

    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_min_region_side(mut self, side: f32) -> Self {
        self.min_region_side = side;
        self
    }

    /// Radius of the L∞ ball equivalent to `iterations` closings with the kernel.
    pub fn closing_radius(&self) -> u8 {
        let radius = u16::from(self.kernel_size / 2) * u16::from(self.iterations);
        radius.min(u16::from(u8::MAX)) as u8
    }
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            kernel_size: 5,
            iterations: 7,
            threshold: 0,
            min_region_side: 2.0,
        }
    }
}

/// Page selection for extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// Process all pages
    #[default]
    All,
    /// Process a range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Process specific pages (1-indexed)
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
        }
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }

        let invalid = || Error::InvalidPageRange(s.to_string());
        let page = |p: &str| -> Result<u32> {
            match p.trim().parse::<u32>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(invalid()),
            }
        };

        if !s.contains(',') {
            if let Some((start, end)) = s.split_once('-') {
                let (start, end) = (page(start)?, page(end)?);
                if start > end {
                    return Err(invalid());
                }
                return Ok(PageSelection::Range(start..=end));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            match part.split_once('-') {
                Some((start, end)) => {
                    let (start, end) = (page(start)?, page(end)?);
                    if start > end {
                        return Err(invalid());
                    }
                    pages.extend(start..=end);
                }
                None => pages.push(page(part)?),
            }
        }
        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}

impl FromStr for PageSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PageSelection::parse(s)
    }
}
