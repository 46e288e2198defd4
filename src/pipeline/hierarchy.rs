//! Heading hierarchy over the assembled block sequence.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{size_key, BlockLabel, DocumentBlock, HierarchyNode, OutlineEntry};

/// Titles closer than this (in page units) count as the same position.
const DUPLICATE_TOLERANCE: f32 = 2.0;

fn continued_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"(?i)\(continued\)").unwrap())
}

fn clean_title(text: &str) -> String {
    continued_marker().replace_all(text, "").trim().to_string()
}

/// Drop titles repeating an earlier title at the same position, such as
/// "Chapter 1 (continued)" on the following page.
///
/// Every earlier title counts, including ones that were themselves dropped.
pub fn remove_duplicate_titles(blocks: Vec<DocumentBlock>) -> Vec<DocumentBlock> {
    let mut seen_titles: Vec<(String, f32, f32)> = Vec::new();
    blocks
        .into_iter()
        .filter(|b| {
            if b.label() != BlockLabel::Title {
                return true;
            }
            let text = clean_title(b.text());
            let (x0, y0) = (b.block.rect.x0, b.block.rect.y0);
            let duplicate = seen_titles.iter().any(|(t, x, y)| {
                *t == text
                    && (x - x0).abs() <= DUPLICATE_TOLERANCE
                    && (y - y0).abs() <= DUPLICATE_TOLERANCE
            });
            seen_titles.push((text, x0, y0));
            !duplicate
        })
        .collect()
}

/// Python-style `isupper`: at least one cased character and no lowercase.
fn is_all_caps(text: &str) -> bool {
    text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeadingKey {
    rank: u8,
    size: i32,
    all_caps: bool,
}

/// Stack of open headings.
#[derive(Debug, Default)]
pub struct HeadingStack {
    stack: Vec<HeadingKey>,
    /// Block id of the open heading at each depth
    holders: Vec<usize>,
}

impl HeadingStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a heading and return its node.
    ///
    /// The stack is cut at the first entry that is smaller than the new
    /// heading or has exactly its typeface.
    pub fn push_title(&mut self, block: &DocumentBlock) -> HierarchyNode {
        let key = HeadingKey {
            rank: block.block.style.rank(),
            size: size_key(block.block.size),
            all_caps: is_all_caps(block.text()),
        };
        if let Some(cut) = self
            .stack
            .iter()
            .position(|open| open.size < key.size || *open == key)
        {
            self.stack.truncate(cut);
        }
        self.stack.push(key);

        let depth = self.stack.len() - 1;
        self.holders.truncate(depth);
        self.holders.push(block.block_id);
        let parent_id = match depth {
            0 => -1,
            d => self.holders[d - 1] as i64,
        };
        HierarchyNode {
            block_id: block.block_id,
            parent_id,
            depth,
        }
    }

    /// (parent, depth) for a non-heading block: under the deepest open
    /// heading, or a root when none is open.
    pub fn attach(&self) -> (i64, usize) {
        match self.holders.last() {
            Some(&id) => (id as i64, self.holders.len()),
            None => (-1, 0),
        }
    }
}

/// Assign dense block ids and a parent/depth to every block.
pub fn build_hierarchy(blocks: &mut [DocumentBlock]) -> Vec<HierarchyNode> {
    let mut headings = HeadingStack::new();
    let mut table_fallback: (i64, usize) = (-1, 0);
    let mut nodes = Vec::with_capacity(blocks.len());

    for (block_id, block) in blocks.iter_mut().enumerate() {
        block.block_id = block_id;
        let node = match block.label() {
            BlockLabel::Title => headings.push_title(block),
            BlockLabel::Text | BlockLabel::Table => {
                table_fallback = headings.attach();
                node_at(block_id, table_fallback)
            }
            BlockLabel::TableImage => node_at(block_id, table_fallback),
            BlockLabel::Figure | BlockLabel::Watermark | BlockLabel::None => {
                node_at(block_id, headings.attach())
            }
        };
        nodes.push(node);
    }
    nodes
}

fn node_at(block_id: usize, (parent_id, depth): (i64, usize)) -> HierarchyNode {
    HierarchyNode {
        block_id,
        parent_id,
        depth,
    }
}

/// Deduplicate titles, number the blocks and produce outline records.
pub fn outline(blocks: Vec<DocumentBlock>) -> Vec<OutlineEntry> {
    let mut blocks = remove_duplicate_titles(blocks);
    let nodes = build_hierarchy(&mut blocks);
    blocks
        .iter()
        .zip(&nodes)
        .map(|(block, node)| OutlineEntry::from_parts(block, node))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, FontStyle, Rect};

    fn title(text: &str, size: f32, style: FontStyle) -> DocumentBlock {
        DocumentBlock::new(
            Block::new(Rect::new(72.0, 72.0, 300.0, 90.0), text, BlockLabel::Title, 1)
                .with_size(size)
                .with_style(style),
        )
    }

    fn block(text: &str, label: BlockLabel) -> DocumentBlock {
        DocumentBlock::new(Block::new(Rect::new(72.0, 100.0, 300.0, 200.0), text, label, 1).with_size(11.0))
    }

    fn shape(entries: &[OutlineEntry]) -> Vec<(i64, usize)> {
        entries.iter().map(|e| (e.parent_id, e.depth)).collect()
    }

    #[test]
    fn test_nested_headings() {
        let entries = outline(vec![
            title("Part One", 20.0, FontStyle::Bold),
            title("Section", 16.0, FontStyle::Bold),
            block("Body text.", BlockLabel::Text),
        ]);
        assert_eq!(shape(&entries), vec![(-1, 0), (0, 1), (1, 2)]);
    }

    #[test]
    fn test_larger_heading_closes_smaller_ones() {
        let entries = outline(vec![
            title("Small", 12.0, FontStyle::Bold),
            title("Smaller", 10.0, FontStyle::Bold),
            title("Big", 20.0, FontStyle::Bold),
            block("text", BlockLabel::Text),
        ]);
        assert_eq!(shape(&entries), vec![(-1, 0), (0, 1), (-1, 0), (2, 1)]);
    }

    #[test]
    fn test_same_typeface_is_a_sibling() {
        let entries = outline(vec![
            title("Chapter", 20.0, FontStyle::Bold),
            title("First", 14.0, FontStyle::Bold),
            block("a", BlockLabel::Text),
            title("Second", 14.0, FontStyle::Bold),
            block("b", BlockLabel::Text),
        ]);
        assert_eq!(shape(&entries), vec![(-1, 0), (0, 1), (1, 2), (0, 1), (3, 2)]);
    }

    #[test]
    fn test_text_without_heading_is_root() {
        let entries = outline(vec![block("orphan", BlockLabel::Text)]);
        assert_eq!(shape(&entries), vec![(-1, 0)]);
    }

    #[test]
    fn test_table_image_uses_fallback() {
        let entries = outline(vec![
            block("before any heading", BlockLabel::TableImage),
            title("Heading", 14.0, FontStyle::Bold),
            block("caption", BlockLabel::Text),
            title("Next", 14.0, FontStyle::Bold),
            block("", BlockLabel::TableImage),
            block("figure", BlockLabel::Figure),
        ]);
        assert_eq!(
            shape(&entries),
            vec![(-1, 0), (-1, 0), (1, 1), (-1, 0), (1, 1), (3, 1)]
        );
    }

    #[test]
    fn test_duplicate_titles_removed() {
        let mut later = title("Chapter 1 (Continued)", 16.0, FontStyle::Bold);
        later.block.rect = Rect::new(73.5, 71.0, 300.0, 90.0);
        later.block.page_no = 2;
        let blocks = vec![
            title("Chapter 1", 16.0, FontStyle::Bold),
            block("body", BlockLabel::Text),
            later,
        ];
        let deduped = remove_duplicate_titles(blocks);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].text(), "Chapter 1");

        let again = remove_duplicate_titles(deduped.clone());
        assert_eq!(again, deduped);
    }

    #[test]
    fn test_chained_duplicates_removed() {
        let at = |x0: f32| {
            let mut t = title("Chapter 1", 16.0, FontStyle::Bold);
            t.block.rect = Rect::new(x0, 72.0, 300.0, 90.0);
            t
        };
        let deduped = remove_duplicate_titles(vec![at(72.0), at(73.5), at(75.0)]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].block.rect.x0, 72.0);
        assert_eq!(remove_duplicate_titles(deduped.clone()), deduped);
    }

    #[test]
    fn test_distant_titles_kept() {
        let mut moved = title("Chapter 1", 16.0, FontStyle::Bold);
        moved.block.rect = Rect::new(72.0, 300.0, 300.0, 320.0);
        let deduped = remove_duplicate_titles(vec![title("Chapter 1", 16.0, FontStyle::Bold), moved]);
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn test_ids_are_dense_after_dedup() {
        let entries = outline(vec![
            title("Intro", 16.0, FontStyle::Bold),
            title("Intro", 16.0, FontStyle::Bold),
            block("text", BlockLabel::Text),
        ]);
        let ids: Vec<usize> = entries.iter().map(|e| e.block_id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(entries[1].parent_id, 0);
    }

    #[test]
    fn test_all_caps() {
        assert!(is_all_caps("INTRODUCTION 1"));
        assert!(!is_all_caps("Introduction"));
        assert!(!is_all_caps("1234"));
    }
}
