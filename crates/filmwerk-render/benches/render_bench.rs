// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the per-page work in filmwerk-render: Film Size
// ID matching against a device catalog, fit-to-page geometry, and film
// layout rendering.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use filmwerk_core::config::default_paper_catalog;
use filmwerk_core::dataset::{Dataset, tags};
use filmwerk_core::film::FilmSession;
use filmwerk_render::paper::{match_film_size, pick_paper_size};
use filmwerk_render::{FilmRenderer, LayoutFilmRenderer, fit_film_rect};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Paper selection for the common film sizes, the way every page does it.
fn bench_paper_matching(c: &mut Criterion) {
    let catalog = default_paper_catalog();
    let tokens = ["8INX10IN", "10INX12IN", "11INX14IN", "14INX17IN", "24CMX30CM"];

    c.bench_function("match_film_size (5 tokens)", |b| {
        b.iter(|| {
            for token in tokens {
                black_box(match_film_size(black_box(&catalog), token));
            }
        });
    });

    c.bench_function("pick_paper_size (alias)", |b| {
        b.iter(|| black_box(pick_paper_size(black_box(&catalog), "LTR")));
    });
}

fn bench_fit_geometry(c: &mut Criterion) {
    c.bench_function("fit_film_rect", |b| {
        b.iter(|| {
            black_box(fit_film_rect(black_box(1700), black_box(1100), true));
            black_box(fit_film_rect(black_box(827), black_box(1169), false));
        });
    });
}

/// A 2x2 film with one 256x256 image, rendered at 8x10 in / 100 dpi.
fn bench_film_render(c: &mut Criterion) {
    let mut session = FilmSession::new(None, Dataset::new(), false);
    let uid = match session.create_film_box(
        None,
        Dataset::new().with(tags::IMAGE_DISPLAY_FORMAT, "STANDARD\\2,2"),
    ) {
        Ok(film_box) => film_box.sop_instance_uid.clone(),
        Err(e) => panic!("film box: {e}"),
    };
    let first = session.film_boxes()[0].image_boxes()[0].sop_instance_uid.clone();
    if let Some(image_box) = session.find_image_box_mut(&first) {
        let pixels: Vec<u8> = (0..256u32 * 256).map(|i| (i % 256) as u8).collect();
        image_box.update(&Dataset::new().with(
            tags::BASIC_GRAYSCALE_IMAGE_SEQUENCE,
            vec![Dataset::new()
                .with(tags::ROWS, 256u16)
                .with(tags::COLUMNS, 256u16)
                .with(tags::PIXEL_DATA, pixels)],
        ));
    }
    let renderer = LayoutFilmRenderer::default();

    c.bench_function("layout render (2x2, 800x1000)", |b| {
        b.iter(|| {
            if let Some(film_box) = session.find_film_box(&uid) {
                black_box(renderer.render(film_box, 800, 1000).ok());
            }
        });
    });
}

criterion_group!(benches, bench_paper_matching, bench_fit_geometry, bench_film_render);
criterion_main!(benches);
