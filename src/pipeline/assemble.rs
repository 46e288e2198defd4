//! Document assembly: page concatenation and cross-block cleanup.

use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};
use crate::model::{Block, BlockLabel, Classification, DocumentBlock, PageResult, Rect};

/// Text of the block standing in for a protected page.
pub const DRM_PLACEHOLDER: &str = "Page is DRM Protected";

/// Watermarks at least this long are kept as text.
pub const WATERMARK_MIN_CHARS: usize = 50;

const TERMINATORS: [char; 6] = ['.', ':', ';', '?', '\u{201d}', '"'];

/// Whether a block's text is expected to continue in the next block.
pub fn continues(text: &str, label: BlockLabel) -> bool {
    label != BlockLabel::Title && !text.ends_with(TERMINATORS)
}

fn starts_continuation(text: &str) -> bool {
    text.chars()
        .next()
        .is_some_and(|c| c.is_lowercase() && c.is_alphanumeric())
}

/// Concatenate pages in page order; protected pages contribute a placeholder.
pub fn concatenate(mut pages: Vec<PageResult>, classification: &Classification) -> Vec<Block> {
    pages.sort_by_key(|p| p.page_no);
    let mut blocks = Vec::new();
    for page in pages {
        if classification.page(page.page_no).drm {
            blocks.push(Block::new(
                Rect::default(),
                DRM_PLACEHOLDER,
                BlockLabel::None,
                page.page_no,
            ));
        } else {
            blocks.extend(page.blocks);
        }
    }
    blocks
}

/// Trim and NFC-normalize text, set `merge_next` and resolve watermarks.
pub fn prepare(blocks: Vec<Block>) -> Vec<DocumentBlock> {
    blocks
        .into_iter()
        .filter_map(|mut block| {
            block.text = block.text.trim().nfc().collect();
            if block.label == BlockLabel::Watermark {
                if block.text.chars().count() < WATERMARK_MIN_CHARS {
                    return None;
                }
                block.label = BlockLabel::Text;
            }
            let mut doc_block = DocumentBlock::new(block);
            doc_block.merge_next = continues(doc_block.text(), doc_block.label());
            Some(doc_block)
        })
        .collect()
}

/// Join blocks that continue a sentence begun in the previous block.
///
/// Titles break the chain. A block is folded into the current anchor when
/// the anchor expects continuation and the block starts with a lowercase
/// letter (a leading digit does not continue); rectangles are only joined on
/// the same page.
pub fn merge_continuations(blocks: Vec<DocumentBlock>) -> Vec<DocumentBlock> {
    let mut merged: Vec<DocumentBlock> = Vec::with_capacity(blocks.len());
    let mut anchor: Option<usize> = None;

    for block in blocks {
        if block.label() == BlockLabel::Title {
            anchor = None;
            merged.push(block);
            continue;
        }
        if let Some(a) = anchor {
            let target = &mut merged[a];
            if target.merge_next && starts_continuation(block.text()) {
                target.block.text = format!("{} {}", target.block.text, block.block.text);
                if target.page_no() == block.page_no() {
                    target.block.rect.include(&block.block.rect);
                }
                target.merge_next = block.merge_next;
                continue;
            }
        }
        anchor = Some(merged.len());
        merged.push(block);
    }
    merged
}

/// Build the document block sequence from per-page results.
pub fn assemble(
    pages: Vec<PageResult>,
    classification: &Classification,
    name: &str,
) -> Result<Vec<DocumentBlock>> {
    let blocks = concatenate(pages, classification);
    if blocks.is_empty() {
        return Err(Error::NoContent(name.to_string()));
    }
    let prepared = prepare(blocks);
    let before = prepared.len();
    let merged = merge_continuations(prepared);
    log::debug!(
        "{}: assembled {} blocks ({} continuations merged)",
        name,
        merged.len(),
        before - merged.len()
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PageClass;

    fn doc_block(text: &str, label: BlockLabel, page_no: u32) -> DocumentBlock {
        let block = Block::new(Rect::new(72.0, 100.0, 300.0, 120.0), text, label, page_no);
        let mut doc = DocumentBlock::new(block);
        doc.merge_next = continues(text, label);
        doc
    }

    #[test]
    fn test_continues() {
        assert!(continues("and then", BlockLabel::Text));
        assert!(!continues("The end.", BlockLabel::Text));
        assert!(!continues("He said \u{201c}stop\u{201d}", BlockLabel::Text));
        assert!(!continues("Introduction", BlockLabel::Title));
    }

    #[test]
    fn test_merge_continuation() {
        let blocks = vec![
            doc_block("first", BlockLabel::Text, 1),
            doc_block("second part.", BlockLabel::Text, 1),
        ];
        let merged = merge_continuations(blocks);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text(), "first second part.");
        assert!(!merged[0].merge_next);
    }

    #[test]
    fn test_merge_requires_lowercase_start() {
        let blocks = vec![
            doc_block("first", BlockLabel::Text, 1),
            doc_block("Second", BlockLabel::Text, 1),
            doc_block("\u{2022} bullet", BlockLabel::Text, 1),
        ];
        assert_eq!(merge_continuations(blocks).len(), 3);
    }

    #[test]
    fn test_leading_digit_does_not_continue() {
        let blocks = vec![
            doc_block("see table", BlockLabel::Text, 1),
            doc_block("3 rows follow.", BlockLabel::Text, 1),
        ];
        assert_eq!(merge_continuations(blocks).len(), 2);
    }

    #[test]
    fn test_titles_break_the_chain() {
        let blocks = vec![
            doc_block("dangling", BlockLabel::Text, 1),
            doc_block("Heading", BlockLabel::Title, 1),
            doc_block("lowercase start", BlockLabel::Text, 1),
        ];
        assert_eq!(merge_continuations(blocks).len(), 3);
    }

    #[test]
    fn test_rects_join_only_on_same_page() {
        let mut second = doc_block("continued here.", BlockLabel::Text, 2);
        second.block.rect = Rect::new(72.0, 50.0, 300.0, 70.0);
        let merged = merge_continuations(vec![doc_block("running text", BlockLabel::Text, 1), second]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].block.rect, Rect::new(72.0, 100.0, 300.0, 120.0));
        assert_eq!(merged[0].page_no(), 1);
    }

    #[test]
    fn test_watermarks() {
        let long = "CONFIDENTIAL ".repeat(5);
        let blocks = vec![
            Block::new(Rect::default(), "DRAFT", BlockLabel::Watermark, 1),
            Block::new(Rect::default(), long.as_str(), BlockLabel::Watermark, 1),
        ];
        let prepared = prepare(blocks);
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0].label(), BlockLabel::Text);
    }

    #[test]
    fn test_text_is_trimmed_and_composed() {
        let blocks = vec![Block::new(Rect::default(), "  cafe\u{0301}  ", BlockLabel::Text, 1)];
        assert_eq!(prepare(blocks)[0].text(), "caf\u{e9}");
    }

    #[test]
    fn test_protected_page_placeholder() {
        let mut classification = Classification::default();
        classification.pages.insert(
            1,
            PageClass {
                drm: true,
                scanned: false,
                dpi_ok: true,
            },
        );
        let blocks = assemble(vec![PageResult::new(1)], &classification, "doc.pdf").unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].label(), BlockLabel::None);
        assert_eq!(blocks[0].text(), DRM_PLACEHOLDER);
    }

    #[test]
    fn test_empty_document_is_an_error() {
        let err = assemble(vec![PageResult::new(1)], &Classification::default(), "empty.pdf")
            .unwrap_err();
        assert!(matches!(err, Error::NoContent(name) if name == "empty.pdf"));
    }
}
