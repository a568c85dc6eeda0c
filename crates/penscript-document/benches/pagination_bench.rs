// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the page pipeline in the penscript-document crate:
// live-measurement pagination of a long essay, and rasterizing one full page.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use penscript_core::types::{GenerationConfig, QualityTier};
use penscript_document::{GlyphSurface, Paginator, RenderSurface};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Roughly ten pages of prose with paragraph breaks.
fn essay() -> String {
    let paragraph = "The quick brown fox jumps over the lazy dog while the ink dries \
                     slowly on the ruled page. ";
    (0..60)
        .map(|_| paragraph.repeat(4))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Paginate the essay from scratch on the default surface. Every token is
/// pushed, measured and sometimes popped, so this is the measuring hot path.
fn bench_paginate(c: &mut Criterion) {
    let text = essay();
    let style = GenerationConfig::default();

    c.bench_function("paginate (essay, default style)", |b| {
        b.iter(|| {
            let mut surface = GlyphSurface::default();
            let pages = Paginator::new()
                .paginate(&mut surface, black_box(&text), &style)
                .unwrap();
            black_box(pages);
        });
    });
}

/// Rasterize the first page of the essay at the low tier.
fn bench_rasterize_page(c: &mut Criterion) {
    let text = essay();
    let style = GenerationConfig::default();
    let mut surface = GlyphSurface::default();
    let pages = Paginator::new()
        .paginate(&mut surface, &text, &style)
        .unwrap();
    for token in &pages[0].tokens {
        surface.push_token(token);
    }

    c.bench_function("rasterize first page (low)", |b| {
        b.iter(|| {
            let image = surface.rasterize(QualityTier::Low, black_box(7)).unwrap();
            black_box(image);
        });
    });
}

criterion_group!(benches, bench_paginate, bench_rasterize_page);
criterion_main!(benches);
