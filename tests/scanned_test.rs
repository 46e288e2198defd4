//! Pipeline tests over a mock backend: protected and scanned pages.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect as PixelRect;

use pdf_outline::backend::{ColorSpace, EmbeddedImage, RawSpan};
use pdf_outline::model::{DiagnosticKind, PageSize, UnitOrdinal};
use pdf_outline::ocr::{OcrEngine, OcrWord};
use pdf_outline::pipeline::assemble::DRM_PLACEHOLDER;
use pdf_outline::pipeline::classify::classify;
use pdf_outline::{BlockLabel, Error, ExtractOptions, Outliner, PdfBackend, Rect, Result};

/// Kinds of page the mock document can hold.
#[derive(Clone)]
enum MockPage {
    /// Native text that decodes to mostly non-ASCII characters
    Protected,
    /// No native text; one embedded scan `pixel_width` pixels wide
    Scanned { pixel_width: u32 },
}

struct MockBackend {
    pages: Vec<MockPage>,
}

impl MockBackend {
    fn page(&self, page_no: u32) -> Result<&MockPage> {
        self.pages
            .get(page_no as usize - 1)
            .ok_or(Error::PageOutOfRange(page_no, self.pages.len() as u32))
    }
}

fn word_boxes() -> Vec<(&'static str, Rect)> {
    vec![
        ("Scanned", Rect::new(72.0, 100.0, 120.0, 112.0)),
        ("paragraph", Rect::new(124.0, 100.0, 190.0, 112.0)),
        ("text.", Rect::new(194.0, 100.0, 226.0, 112.0)),
    ]
}

impl PdfBackend for MockBackend {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page_no: u32) -> Result<PageSize> {
        self.page(page_no)?;
        Ok(PageSize::letter())
    }

    fn page_text(&self, page_no: u32) -> Result<String> {
        Ok(match self.page(page_no)? {
            MockPage::Protected => "abcdefghij".chars().chain(std::iter::repeat('\u{4e00}').take(190)).collect(),
            MockPage::Scanned { .. } => String::new(),
        })
    }

    fn page_spans(&self, page_no: u32) -> Result<Vec<RawSpan>> {
        self.page(page_no)?;
        Ok(Vec::new())
    }

    fn page_images(&self, page_no: u32) -> Result<Vec<EmbeddedImage>> {
        Ok(match self.page(page_no)? {
            MockPage::Protected => Vec::new(),
            MockPage::Scanned { pixel_width } => vec![EmbeddedImage {
                name: "Im0".to_string(),
                rect: PageSize::letter().rect(),
                pixel_width: *pixel_width,
                pixel_height: *pixel_width * 11 / 8,
                color_space: ColorSpace::Gray,
                bits_per_component: 8,
            }],
        })
    }

    fn render_page(&self, page_no: u32, scale: f32) -> Result<RgbImage> {
        self.page(page_no)?;
        let size = PageSize::letter();
        let mut canvas = RgbImage::from_pixel(
            (size.width * scale).ceil() as u32,
            (size.height * scale).ceil() as u32,
            Rgb([255, 255, 255]),
        );
        for (_, rect) in word_boxes() {
            let r = rect.scale(scale);
            draw_filled_rect_mut(
                &mut canvas,
                PixelRect::at(r.x0 as i32, r.y0 as i32).of_size(r.width() as u32, r.height() as u32),
                Rgb([0, 0, 0]),
            );
        }
        Ok(canvas)
    }
}

/// Reports the drawn word boxes, scaled to the raster it is given.
struct MockOcr;

impl OcrEngine for MockOcr {
    fn recognize(&self, image: &RgbImage, _dpi: u32) -> Result<Vec<OcrWord>> {
        let scale = image.width() as f32 / PageSize::letter().width;
        Ok(word_boxes()
            .into_iter()
            .enumerate()
            .map(|(i, (text, rect))| OcrWord {
                text: text.to_string(),
                rect: rect.scale(scale),
                font_size: None,
                confidence: Some(93.0),
                ordinal: UnitOrdinal::new(0, 0, 0, i as u32),
            })
            .collect())
    }
}

/// Always exceeds its time budget.
struct StalledOcr;

impl OcrEngine for StalledOcr {
    fn recognize(&self, _image: &RgbImage, _dpi: u32) -> Result<Vec<OcrWord>> {
        Err(Error::OcrTimeout(120))
    }
}

fn options() -> ExtractOptions {
    ExtractOptions::new().sequential().with_scale(1.0)
}

#[test]
fn test_classification_of_mock_pages() {
    let backend = MockBackend {
        pages: vec![
            MockPage::Protected,
            MockPage::Scanned { pixel_width: 2550 },
            MockPage::Scanned { pixel_width: 1275 },
        ],
    };
    let classification = classify(&backend, "mock.pdf");

    let page1 = classification.page(1);
    assert!(page1.drm);
    assert!(!page1.scanned);

    assert!(classification.page(2).scanned);
    assert!(classification.page(2).dpi_ok);
    // 72 * 1275 / 612 = 150 dpi
    assert!(!classification.page(3).dpi_ok);
    assert_eq!(classification.dpi.faulty_pages, vec![3]);
    // one of two scans passed, which is not a majority
    assert!(!classification.dpi.passed);
    assert!(classification.scanned);
}

#[test]
fn test_protected_page_becomes_placeholder() {
    let backend = MockBackend {
        pages: vec![MockPage::Protected],
    };
    let entries = Outliner::with_options(options())
        .with_ocr_engine(MockOcr)
        .run_backend(&backend, "mock.pdf")
        .unwrap()
        .entries;

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].label, BlockLabel::None);
    assert_eq!(entries[0].text, DRM_PLACEHOLDER);
    assert_eq!(entries[0].parent_id, -1);
}

#[test]
fn test_scanned_page_goes_through_ocr() {
    let backend = MockBackend {
        pages: vec![
            MockPage::Protected,
            MockPage::Scanned { pixel_width: 150 },
        ],
    };
    let extraction = Outliner::with_options(options())
        .with_ocr_engine(MockOcr)
        .run_backend(&backend, "mock.pdf")
        .unwrap();

    assert_eq!(extraction.classification.dpi.faulty_pages, vec![2]);
    assert_eq!(extraction.entries.len(), 2);
    let scanned = &extraction.entries[1];
    assert_eq!(scanned.label, BlockLabel::Text);
    assert_eq!(scanned.text, "Scanned paragraph text.");
    assert_eq!(scanned.page_no, 2);
}

#[test]
fn test_ocr_timeout_is_a_page_diagnostic() {
    let backend = MockBackend {
        pages: vec![
            MockPage::Protected,
            MockPage::Scanned { pixel_width: 2550 },
        ],
    };
    let extraction = Outliner::with_options(options())
        .with_ocr_engine(StalledOcr)
        .run_backend(&backend, "mock.pdf")
        .unwrap();

    assert_eq!(extraction.entries.len(), 1);
    assert_eq!(extraction.diagnostics.len(), 1);
    assert_eq!(extraction.diagnostics[0].page_no, 2);
    assert_eq!(extraction.diagnostics[0].kind, DiagnosticKind::OcrTimeout);
}

#[test]
fn test_document_without_content() {
    let backend = MockBackend {
        pages: vec![MockPage::Scanned { pixel_width: 2550 }],
    };
    let err = Outliner::with_options(options())
        .with_ocr_engine(StalledOcr)
        .run_backend(&backend, "blank.pdf")
        .unwrap_err();
    assert!(matches!(err, Error::NoContent(name) if name == "blank.pdf"));
}
