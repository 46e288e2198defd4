//! Benchmarks for the layout stages.
//!
//! Run with: cargo bench
//!
//! These benchmarks run segmentation, normalization and the heading
//! hierarchy over synthetic pages.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect as PixelRect;

use pdf_outline::model::{Block, BlockLabel, DocumentBlock, FontStyle, PageSize, Rect, Unit};
use pdf_outline::pipeline::{hierarchy, normalize, segment, SegmentOptions};

/// Two-column page of `rows` paragraphs per column, each headed by a title.
fn synthetic_page(rows: usize) -> (Vec<Block>, Vec<Unit>) {
    let mut blocks = Vec::new();
    let mut units = Vec::new();
    for column in 0..2 {
        let x0 = 60.0 + column as f32 * 260.0;
        for row in 0..rows {
            let y0 = 60.0 + row as f32 * 60.0;
            let title = Unit::new(Rect::new(x0, y0, x0 + 120.0, y0 + 14.0), format!("Heading {row}"), 14.0)
                .with_style(FontStyle::Bold);
            let body = Unit::new(
                Rect::new(x0, y0 + 20.0, x0 + 230.0, y0 + 50.0),
                "body text continues across the paragraph",
                10.0,
            );
            blocks.extend(Block::from_units(std::slice::from_ref(&title), BlockLabel::Title, 1));
            blocks.extend(Block::from_units(std::slice::from_ref(&body), BlockLabel::Text, 1));
            units.push(title);
            units.push(body);
        }
    }
    (blocks, units)
}

/// Raster with one filled box per paragraph line.
fn synthetic_raster(scale: f32) -> RgbImage {
    let size = PageSize::letter();
    let mut raster = RgbImage::from_pixel(
        (size.width * scale) as u32,
        (size.height * scale) as u32,
        Rgb([255, 255, 255]),
    );
    for line in 0..40 {
        let y = (60.0 + line as f32 * 16.0) * scale;
        let rect = PixelRect::at((60.0 * scale) as i32, y as i32).of_size((480.0 * scale) as u32, (10.0 * scale) as u32);
        draw_filled_rect_mut(&mut raster, rect, Rgb([0, 0, 0]));
    }
    raster
}

/// Benchmark closing and contour tracing at two raster scales.
fn bench_find_regions(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_regions");
    group.sample_size(20);

    for scale in [1.0f32, 2.0].iter() {
        let raster = synthetic_raster(*scale);
        let options = SegmentOptions::default();
        group.bench_function(format!("scale_{}", scale), |b| {
            b.iter(|| segment::find_regions(black_box(&raster), *scale, &options));
        });
    }

    group.finish();
}

/// Benchmark page normalization at various block counts.
fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_page");

    for rows in [5, 10, 20].iter() {
        let (blocks, units) = synthetic_page(*rows);
        group.bench_function(format!("{}_blocks", blocks.len()), |b| {
            b.iter(|| {
                normalize::normalize_page(
                    black_box(blocks.clone()),
                    &units,
                    PageSize::letter(),
                    false,
                )
            });
        });
    }

    group.finish();
}

/// Benchmark duplicate removal and hierarchy over a long document.
fn bench_outline(c: &mut Criterion) {
    let (blocks, _) = synthetic_page(20);
    let document: Vec<DocumentBlock> = (0..50)
        .flat_map(|page| {
            blocks.iter().cloned().map(move |mut block| {
                block.page_no = page + 1;
                DocumentBlock::new(block)
            })
        })
        .collect();

    c.bench_function("outline_4000_blocks", |b| {
        b.iter(|| hierarchy::outline(black_box(document.clone())));
    });
}

criterion_group!(benches, bench_find_regions, bench_normalize, bench_outline);
criterion_main!(benches);
