// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the scanwerk-document pipeline: the full scanner
// on a synthetic card photo, segmentation alone, and post-processing.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use scanwerk_core::config::{BinarizeConfig, SegmentationConfig};
use scanwerk_core::{DocumentCatalog, ScanConfig};
use scanwerk_document::detect::Segmenter;
use scanwerk_document::{Scanner, binarize, estimate_skew};

/// 640x480 photo of a light card (ratio ~1.59) on a dark table.
fn card_photo() -> DynamicImage {
    let (x0, y0, x1, y1) = (160u32, 140u32, 478u32, 340u32);
    DynamicImage::ImageRgb8(RgbImage::from_fn(640, 480, |x, y| {
        if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
            Rgb([235, 232, 225])
        } else {
            Rgb([45, 50, 60])
        }
    }))
}

fn bench_scan(c: &mut Criterion) {
    let photo = card_photo();
    let catalog = DocumentCatalog::builtin();
    let profile = catalog.get("aadhaar").cloned();
    let scanner = Scanner::new(ScanConfig::default()).expect("default config is valid");

    c.bench_function("scan card (640x480)", |b| {
        b.iter(|| black_box(scanner.scan(black_box(&photo), profile.as_ref())));
    });
}

fn bench_segmentation(c: &mut Criterion) {
    let working = card_photo().resize_exact(400, 300, image::imageops::FilterType::Triangle);
    let rgb = working.to_rgb8();
    let segmenter = Segmenter::new(SegmentationConfig::default());

    c.bench_function("segment (400x300)", |b| {
        b.iter(|| black_box(segmenter.segment(black_box(&rgb))));
    });
}

fn bench_post_processing(c: &mut Criterion) {
    let photo = card_photo();
    let config = BinarizeConfig::default();

    c.bench_function("binarize (640x480)", |b| {
        b.iter(|| black_box(binarize(black_box(&photo), &config)));
    });
    c.bench_function("estimate_skew (640x480)", |b| {
        b.iter(|| black_box(estimate_skew(black_box(&photo))));
    });
}

criterion_group!(benches, bench_scan, bench_segmentation, bench_post_processing);
criterion_main!(benches);
