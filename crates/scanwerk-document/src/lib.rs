// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-document: locates a physical document in a photograph and
// rectifies it to a top-down image.
//
// Provides working-resolution imaging, foreground segmentation, outline
// tracing, quadrilateral selection against an expected aspect ratio,
// perspective correction, a multi-strategy scanner, and post-processing
// (binarization, skew estimation).

pub mod detect;
pub mod image;
pub mod scan;
pub mod strategy;

// Re-export the primary entry points so callers can use `scanwerk_document::Scanner` etc.
pub use crate::image::processor::{WorkingImage, decode_image, load_image};
pub use detect::{Rectifier, Stage, StageObserver, TracingObserver, order_corners};
pub use scan::{
    RectifiedDocument, ScanReport, Scanner, binarize, binarize_otsu, estimate_skew, is_skewed,
};
pub use strategy::{DetectionStrategy, build_strategies};

#[cfg(test)]
pub(crate) mod test_support {
    use image::{Rgb, RgbImage};

    pub const BACKGROUND: Rgb<u8> = Rgb([40, 45, 50]);
    pub const PAPER: Rgb<u8> = Rgb([235, 235, 230]);

    /// A light document filling `[x0, x1) x [y0, y1)` on a dark background.
    pub fn document_on_background(
        width: u32,
        height: u32,
        (x0, y0, x1, y1): (u32, u32, u32, u32),
    ) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
                PAPER
            } else {
                BACKGROUND
            }
        })
    }
}
