//! Visual block segmentation.
//!
//! A page raster is inverted, closed with a square structuring element and
//! traced for outer contours. The resulting regions are merged, matched
//! against the page units and turned into title and text blocks.

use std::path::Path;

use image::{imageops, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::morphology;
use imageproc::point::Point;

use super::cluster::UnionFind;
use super::extract::PageUnits;
use super::options::SegmentOptions;
use super::raster::to_pixel_rect;
use crate::error::Result;
use crate::model::{
    Block, BlockLabel, DiagnosticKind, PageDiagnostic, Rect, Region, RegionLabel, Unit,
};

const OVERLAY_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Regions and blocks of one page.
#[derive(Debug, Clone, Default)]
pub struct SegmentedPage {
    pub regions: Vec<Region>,
    /// Blocks in region order
    pub blocks: Vec<Block>,
    pub diagnostics: Vec<PageDiagnostic>,
}

fn bounding_rect(points: &[Point<u32>]) -> Option<Rect> {
    let first = points.first()?;
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in points {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    Some(Rect::new(x0 as f32, y0 as f32, (x1 + 1) as f32, (y1 + 1) as f32))
}

/// Find candidate content regions on a raster rendered at `scale`.
///
/// Returned rectangles are in page units and ordered by contour discovery.
pub fn find_regions(raster: &RgbImage, scale: f32, options: &SegmentOptions) -> Vec<Region> {
    let mut mask = imageops::grayscale(raster);
    for pixel in mask.pixels_mut() {
        let ink = 255 - pixel.0[0];
        pixel.0[0] = if ink > options.threshold { 255 } else { 0 };
    }
    let closed = morphology::close(&mask, Norm::LInf, options.closing_radius());

    find_contours::<u32>(&closed)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .filter_map(|c| bounding_rect(&c.points))
        .map(|r| r.descale(scale))
        .filter(|r| r.width() > options.min_region_side && r.height() > options.min_region_side)
        .enumerate()
        .map(|(seq, rect)| Region::new(rect, seq))
        .collect()
}

/// Merge transitively intersecting regions. Merged regions keep the order
/// of their earliest member and are renumbered.
pub fn merge_regions(regions: &[Region]) -> Vec<Region> {
    let mut uf = UnionFind::new(regions.len());
    for i in 0..regions.len() {
        for j in (i + 1)..regions.len() {
            if regions[i].rect.intersects(&regions[j].rect) {
                uf.union(i, j);
            }
        }
    }
    uf.groups()
        .into_iter()
        .filter_map(|group| Rect::union_all(group.iter().map(|&i| &regions[i].rect)))
        .enumerate()
        .map(|(seq, rect)| Region::new(rect, seq))
        .collect()
}

/// Label each region `Text` when any unit intersects it.
pub fn label_regions(regions: &mut [Region], units: &[Unit]) {
    for region in regions.iter_mut() {
        region.label = if units.iter().any(|u| u.rect.intersects(&region.rect)) {
            RegionLabel::Text
        } else {
            RegionLabel::Figure
        };
    }
}

/// Text after a leading "." token, if the text starts with one.
fn strip_leading_period(text: &str) -> Option<String> {
    let mut parts = text.trim_start().splitn(2, char::is_whitespace);
    if parts.next()? != "." {
        return None;
    }
    Some(parts.next().unwrap_or("").trim_start().to_string())
}

fn is_reference_marker(unit: &Unit) -> bool {
    !unit.style.is_normal()
        && !unit.text.is_empty()
        && unit.text.chars().count() <= 3
        && unit.text.chars().all(|c| c.is_ascii_digit())
}

/// Reattach tokens that extraction split from their unit.
///
/// A leading "." goes back onto the previous unit. A short non-normal
/// number following a normal unit is a reference marker and becomes
/// `" [n]"` on that unit.
pub fn repair_units(units: Vec<Unit>) -> Vec<Unit> {
    let mut repaired: Vec<Unit> = Vec::with_capacity(units.len());
    for mut unit in units {
        if let Some(prev) = repaired.last_mut() {
            if let Some(rest) = strip_leading_period(&unit.text) {
                prev.text.push('.');
                if rest.is_empty() {
                    continue;
                }
                unit.text = rest;
            } else if is_reference_marker(&unit) && prev.style.is_normal() {
                prev.text.push_str(&format!(" [{}]", unit.text));
                continue;
            }
        }
        repaired.push(unit);
    }
    repaired
}

/// Length of the leading title run: the first unit must be styled, and the
/// run continues while each unit shares the previous one's typeface.
pub fn title_run_len(units: &[Unit]) -> usize {
    match units.first() {
        Some(first) if !first.style.is_normal() => {}
        _ => return 0,
    }
    1 + units
        .windows(2)
        .take_while(|pair| pair[1].same_typeface(&pair[0]))
        .count()
}

/// Title and text blocks of one text region.
fn region_blocks(units: Vec<Unit>, page_no: u32) -> Vec<Block> {
    let units = repair_units(units);
    let (titles, body) = units.split_at(title_run_len(&units));
    Block::from_units(titles, BlockLabel::Title, page_no)
        .into_iter()
        .chain(Block::from_units(body, BlockLabel::Text, page_no))
        .collect()
}

/// Segment a page into labeled blocks.
pub fn segment(page_no: u32, page: &PageUnits, options: &SegmentOptions) -> SegmentedPage {
    let found = find_regions(&page.raster, page.scale, options);
    if found.is_empty() {
        return SegmentedPage {
            diagnostics: vec![PageDiagnostic::new(
                page_no,
                DiagnosticKind::NoRegions,
                "no text blocks detected",
            )],
            ..Default::default()
        };
    }

    let mut regions = merge_regions(&found);
    label_regions(&mut regions, &page.units);

    let mut used = vec![false; page.units.len()];
    let mut blocks = Vec::new();
    for region in regions.iter().filter(|r| r.label == RegionLabel::Text) {
        let mut members = Vec::new();
        for (i, unit) in page.units.iter().enumerate() {
            if !used[i] && unit.rect.intersects(&region.rect) {
                used[i] = true;
                members.push(unit.clone());
            }
        }
        blocks.extend(region_blocks(members, page_no));
    }
    for (seq, block) in blocks.iter_mut().enumerate() {
        block.seq = seq;
    }

    SegmentedPage {
        regions,
        blocks,
        diagnostics: Vec::new(),
    }
}

/// Write `raster` with every region outlined.
pub fn write_overlay(raster: &RgbImage, regions: &[Region], scale: f32, path: &Path) -> Result<()> {
    let mut overlay = raster.clone();
    for region in regions {
        if let Some(rect) = to_pixel_rect(&region.rect, scale) {
            draw_hollow_rect_mut(&mut overlay, rect, OVERLAY_COLOR);
        }
    }
    overlay.save(path)?;
    Ok(())
}
