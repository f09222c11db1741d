// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for region assembly in the marginalia-vision crate.
// Runs the tight-rectangle highlight pipeline and the masked render on a
// synthetic page of glyph blocks.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{Rgba, RgbaImage};

use marginalia_core::config::RegionConfig;
use marginalia_core::{Annotation, Point, Stroke};
use marginalia_vision::RegionAssembler;
use marginalia_vision::masked::render_masked_highlight;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A 1200x1600 page with 14 px lines on a 30 px pitch, glyphs 8 px wide.
fn synthetic_page() -> RgbaImage {
    let (width, height) = (1200u32, 1600u32);
    let mut img = RgbaImage::from_pixel(width, height, Rgba([250, 248, 240, 255]));
    let mut top = 80;
    while top + 14 < height - 80 {
        for y in top..top + 14 {
            let mut x0 = 80;
            while x0 + 8 <= width - 80 {
                for x in x0..x0 + 8 {
                    img.put_pixel(x, y, Rgba([25, 25, 30, 255]));
                }
                x0 += 12;
            }
        }
        top += 30;
    }
    img
}

fn stroke(from: (f32, f32), to: (f32, f32), line_width: f32) -> Stroke {
    let mut s = Stroke::begin(Point::new(from.0, from.1), line_width);
    s.push(Point::new(to.0, to.1));
    s
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Horizontal stroke over a single line, drawn at half the native size.
fn bench_small_highlight(c: &mut Criterion) {
    let page = synthetic_page();
    let assembler = RegionAssembler::default();
    let annotation = Annotation::Highlight(vec![stroke((0.2, 0.3), (0.7, 0.3), 6.0)]);

    c.bench_function("highlight_single_line (1200x1600)", |b| {
        b.iter(|| black_box(assembler.assemble(&page, (600.0, 800.0), black_box(&annotation))));
    });
}

/// Vertical margin stroke spanning many lines.
fn bench_large_highlight(c: &mut Criterion) {
    let page = synthetic_page();
    let assembler = RegionAssembler::default();
    let annotation = Annotation::Highlight(vec![stroke((0.5, 0.2), (0.5, 0.4), 8.0)]);

    c.bench_function("highlight_multi_line (1200x1600)", |b| {
        b.iter(|| black_box(assembler.assemble(&page, (600.0, 800.0), black_box(&annotation))));
    });
}

fn bench_masked_render(c: &mut Criterion) {
    let page = synthetic_page();
    let strokes = vec![stroke((0.2, 0.3), (0.7, 0.3), 6.0)];
    let config = RegionConfig::default();

    c.bench_function("masked_highlight (1200x1600)", |b| {
        b.iter(|| black_box(render_masked_highlight(&page, (600.0, 800.0), &strokes, &config)));
    });
}

criterion_group!(
    benches,
    bench_small_highlight,
    bench_large_highlight,
    bench_masked_render
);
criterion_main!(benches);
