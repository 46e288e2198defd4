//! Layout normalization of one page's blocks.
//!
//! Border blocks are dropped, the page is split into multicolumn segments,
//! and each segment is width-normalized, merged by typeface and sorted into
//! reading order.

use std::collections::BTreeMap;

use super::cluster::{cluster_coordinates, UnionFind, COLUMN_GAP, READING_COLUMN_GAP};
use crate::model::{size_key, Block, BlockLabel, PageSize, Rect, Unit};

/// Fractions of the page that frame the content area: (left, top, right, bottom).
const CONTENT_FRAME: (f32, f32, f32, f32) = (0.05, 0.045, 0.91, 0.94);

/// Drop blocks lying entirely in the page margins.
pub fn strip_borders(blocks: Vec<Block>, size: PageSize) -> Vec<Block> {
    let (left, top, right, bottom) = CONTENT_FRAME;
    blocks
        .into_iter()
        .filter(|b| {
            b.rect.x1 > left * size.width
                && b.rect.y1 > top * size.height
                && b.rect.x0 < right * size.width
                && b.rect.y0 < bottom * size.height
        })
        .collect()
}

/// Sort blocks top to bottom and number multicolumn segments.
///
/// A block is "side by side" when another block's vertical extent overlaps
/// its own; a new segment starts whenever that flag changes. Tables join the
/// current segment.
pub fn assign_segments(blocks: &mut [Block]) {
    let side_by_side: Vec<bool> = (0..blocks.len())
        .map(|i| {
            !blocks[i].label.is_table()
                && blocks
                    .iter()
                    .enumerate()
                    .any(|(j, other)| j != i && blocks[i].rect.overlaps_vertically(&other.rect))
        })
        .collect();

    let mut order: Vec<usize> = (0..blocks.len()).collect();
    order.sort_by(|&a, &b| blocks[a].rect.y0.total_cmp(&blocks[b].rect.y0));

    let mut current = false;
    let mut segment = 0u32;
    for idx in order {
        if !blocks[idx].label.is_table() && side_by_side[idx] != current {
            segment += 1;
            current = side_by_side[idx];
        }
        blocks[idx].segment = segment;
    }
    blocks.sort_by(|a, b| a.rect.y0.total_cmp(&b.rect.y0));
}

/// Give every block of a column group the group's mean width.
///
/// Columns are left-edge clusters; figures and tables keep their own width
/// out of the mean but are still resized to it.
pub fn normalize_widths(blocks: &mut [Block]) {
    let lefts: Vec<f32> = blocks.iter().map(|b| b.rect.x0).collect();
    let columns = cluster_coordinates(&lefts, COLUMN_GAP);

    let mut widths: BTreeMap<u32, (f32, usize)> = BTreeMap::new();
    for (block, column) in blocks.iter().zip(&columns) {
        if block.label == BlockLabel::Figure || block.label.is_table() {
            continue;
        }
        let entry = widths.entry(*column).or_insert((0.0, 0));
        entry.0 += block.rect.width();
        entry.1 += 1;
    }

    for (block, column) in blocks.iter_mut().zip(&columns) {
        let r = block.rect;
        block.norm_rect = match widths.get(column) {
            Some(&(total, count)) => Rect::new(r.x0, r.y0, r.x0 + total / count as f32, r.y1),
            None => r,
        };
    }
}

/// Blocks merge only within the same typeface cohort. OCR pages carry no
/// reliable style or font, so only the size counts there.
fn same_cohort(a: &Block, b: &Block, ocr_derived: bool) -> bool {
    let same_size = size_key(a.size) == size_key(b.size);
    if ocr_derived {
        same_size
    } else {
        same_size && a.style == b.style && a.font == b.font
    }
}

/// Merge blocks of one cohort whose normalized rectangles intersect.
///
/// The merged block keeps its first member's attributes, covers the union of
/// all members, and takes its text from every page unit that intersects the
/// merged normalized rectangle, in extraction order.
pub fn merge_by_style(blocks: Vec<Block>, units: &[Unit], ocr_derived: bool) -> Vec<Block> {
    let mut uf = UnionFind::new(blocks.len());
    for i in 0..blocks.len() {
        if blocks[i].label.is_table() {
            continue;
        }
        for j in (i + 1)..blocks.len() {
            if !blocks[j].label.is_table()
                && same_cohort(&blocks[i], &blocks[j], ocr_derived)
                && blocks[i].norm_rect.intersects(&blocks[j].norm_rect)
            {
                uf.union(i, j);
            }
        }
    }

    uf.groups()
        .into_iter()
        .map(|group| {
            let mut merged = blocks[group[0]].clone();
            if group.len() == 1 {
                return merged;
            }
            for &i in &group[1..] {
                merged.rect.include(&blocks[i].rect);
                merged.norm_rect.include(&blocks[i].norm_rect);
            }
            let text = units
                .iter()
                .filter(|u| u.rect.intersects(&merged.norm_rect))
                .map(|u| u.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            if !text.is_empty() {
                merged.text = text;
            }
            merged
        })
        .collect()
}

/// Sort into reading order: column (left-edge clusters), then vertical
/// centre, then left edge.
pub fn sort_reading_order(blocks: &mut [Block]) {
    let lefts: Vec<f32> = blocks.iter().map(|b| b.rect.x0).collect();
    for (block, column) in blocks.iter_mut().zip(cluster_coordinates(&lefts, READING_COLUMN_GAP)) {
        block.column = column;
    }
    blocks.sort_by(|a, b| {
        a.column
            .cmp(&b.column)
            .then(a.rect.centroid().1.total_cmp(&b.rect.centroid().1))
            .then(a.rect.x0.total_cmp(&b.rect.x0))
    });
}

/// Run every normalization step over one page.
pub fn normalize_page(
    blocks: Vec<Block>,
    units: &[Unit],
    size: PageSize,
    ocr_derived: bool,
) -> Vec<Block> {
    let mut blocks = strip_borders(blocks, size);
    assign_segments(&mut blocks);

    let mut segments: BTreeMap<u32, Vec<Block>> = BTreeMap::new();
    for block in blocks {
        segments.entry(block.segment).or_default().push(block);
    }

    let mut ordered = Vec::new();
    for (_, mut part) in segments {
        normalize_widths(&mut part);
        let mut part = merge_by_style(part, units, ocr_derived);
        sort_reading_order(&mut part);
        ordered.extend(part);
    }
    for (seq, block) in ordered.iter_mut().enumerate() {
        block.seq = seq;
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FontStyle;

    fn text_block(x0: f32, y0: f32, x1: f32, y1: f32, text: &str) -> Block {
        Block::new(Rect::new(x0, y0, x1, y1), text, BlockLabel::Text, 1).with_size(12.0)
    }

    #[test]
    fn test_strip_borders() {
        let size = PageSize::letter();
        let blocks = vec![
            text_block(72.0, 72.0, 540.0, 100.0, "body"),
            text_block(250.0, 750.0, 350.0, 770.0, "page number"),
            text_block(5.0, 300.0, 25.0, 320.0, "margin note"),
        ];
        let kept = strip_borders(blocks, size);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text, "body");
    }

    #[test]
    fn test_segments_follow_column_changes() {
        let mut blocks = vec![
            text_block(72.0, 300.0, 290.0, 400.0, "left column"),
            text_block(72.0, 72.0, 540.0, 100.0, "full width heading"),
            text_block(310.0, 310.0, 540.0, 420.0, "right column"),
            text_block(72.0, 500.0, 540.0, 540.0, "full width footer"),
        ];
        assign_segments(&mut blocks);
        let segments: Vec<(&str, u32)> = blocks.iter().map(|b| (b.text.as_str(), b.segment)).collect();
        assert_eq!(
            segments,
            vec![
                ("full width heading", 0),
                ("left column", 1),
                ("right column", 1),
                ("full width footer", 2),
            ]
        );
    }

    #[test]
    fn test_tables_take_current_segment() {
        let mut blocks = vec![
            text_block(72.0, 100.0, 290.0, 150.0, "left"),
            text_block(310.0, 100.0, 540.0, 150.0, "right"),
            Block::new(Rect::new(72.0, 200.0, 540.0, 300.0), "", BlockLabel::Table, 1),
        ];
        assign_segments(&mut blocks);
        assert!(blocks.iter().all(|b| b.segment == 1));
    }

    #[test]
    fn test_normalize_widths_uses_column_mean() {
        let mut blocks = vec![
            text_block(72.0, 100.0, 272.0, 120.0, "a"),
            text_block(80.0, 130.0, 380.0, 150.0, "b"),
            Block::new(Rect::new(75.0, 160.0, 575.0, 300.0), "", BlockLabel::Figure, 1),
            text_block(300.0, 400.0, 350.0, 420.0, "c"),
        ];
        normalize_widths(&mut blocks);
        assert_eq!(blocks[0].norm_rect, Rect::new(72.0, 100.0, 322.0, 120.0));
        assert_eq!(blocks[1].norm_rect, Rect::new(80.0, 130.0, 330.0, 150.0));
        assert_eq!(blocks[2].norm_rect, Rect::new(75.0, 160.0, 325.0, 300.0));
        assert_eq!(blocks[3].norm_rect, Rect::new(300.0, 400.0, 350.0, 420.0));
    }

    #[test]
    fn test_merge_by_style_recollects_text() {
        let mut first = text_block(72.0, 100.0, 300.0, 120.0, "Lorem ipsum");
        first.norm_rect = Rect::new(72.0, 100.0, 300.0, 121.0);
        let mut second = text_block(72.0, 120.0, 300.0, 140.0, "dolor sit");
        second.norm_rect = second.rect;
        let mut other = text_block(72.0, 130.0, 300.0, 150.0, "bigger");
        other.size = 14.0;

        let units = vec![
            Unit::new(Rect::new(72.0, 100.0, 150.0, 119.0), "Lorem", 12.0),
            Unit::new(Rect::new(155.0, 100.0, 200.0, 119.0), "ipsum", 12.0),
            Unit::new(Rect::new(72.0, 121.0, 150.0, 139.0), "dolor", 12.0),
            Unit::new(Rect::new(155.0, 121.0, 200.0, 139.0), "sit", 12.0),
        ];
        let merged = merge_by_style(vec![first, second, other], &units, false);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "Lorem ipsum dolor sit");
        assert_eq!(merged[0].rect, Rect::new(72.0, 100.0, 300.0, 140.0));
        assert_eq!(merged[1].text, "bigger");
    }

    #[test]
    fn test_merge_ignores_style_on_ocr_pages() {
        let a = text_block(72.0, 100.0, 300.0, 121.0, "a");
        let b = text_block(72.0, 120.0, 300.0, 140.0, "b").with_style(FontStyle::Bold);
        assert_eq!(merge_by_style(vec![a.clone(), b.clone()], &[], false).len(), 2);
        assert_eq!(merge_by_style(vec![a, b], &[], true).len(), 1);
    }

    #[test]
    fn test_reading_order_columns_first() {
        let mut blocks = vec![
            text_block(320.0, 100.0, 540.0, 120.0, "right top"),
            text_block(72.0, 300.0, 290.0, 320.0, "left bottom"),
            text_block(72.0, 100.0, 290.0, 120.0, "left top"),
        ];
        sort_reading_order(&mut blocks);
        let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["left top", "left bottom", "right top"]);
        assert_eq!(blocks[2].column, 1);
    }
}
