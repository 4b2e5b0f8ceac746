// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Diagnostic hook: observers receive an image after each major stage.
// Nothing an observer does can change what the pipeline returns.

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use scanwerk_core::Point2;
use serde::Serialize;
use tracing::debug;

/// Pipeline checkpoints reported to a [`StageObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    /// Masked image after foreground segmentation.
    Segmentation,
    /// Edge map the contours are traced from.
    Edges,
    /// Ranked candidate contours drawn over the working image.
    Contours,
    /// The accepted quadrilateral drawn over the working image.
    Corners,
    /// Final rectified document.
    Rectified,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Segmentation => "segmentation",
            Self::Edges => "edges",
            Self::Contours => "contours",
            Self::Corners => "corners",
            Self::Rectified => "rectified",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives intermediate images for inspection.
pub trait StageObserver {
    /// Called after each stage with that stage's image.
    fn on_stage(&mut self, stage: Stage, image: &DynamicImage);

    /// Inactive observers let the pipeline skip rendering overlays.
    fn is_active(&self) -> bool {
        true
    }
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn on_stage(&mut self, _stage: Stage, _image: &DynamicImage) {}

    fn is_active(&self) -> bool {
        false
    }
}

/// Logs each stage's dimensions at `debug` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StageObserver for TracingObserver {
    fn on_stage(&mut self, stage: Stage, image: &DynamicImage) {
        debug!(
            stage = stage.name(),
            width = image.width(),
            height = image.height(),
            "Pipeline stage complete"
        );
    }
}

impl<F> StageObserver for F
where
    F: FnMut(Stage, &DynamicImage),
{
    fn on_stage(&mut self, stage: Stage, image: &DynamicImage) {
        self(stage, image)
    }
}

const OUTLINE: Rgb<u8> = Rgb([0, 255, 255]);
const CORNER: Rgb<u8> = Rgb([255, 0, 0]);

/// Draw closed polylines over a copy of `base`.
pub(crate) fn render_outlines(base: &RgbImage, outlines: &[Vec<Point2>]) -> DynamicImage {
    let mut canvas = base.clone();
    for outline in outlines.iter().filter(|o| o.len() >= 2) {
        for (i, start) in outline.iter().enumerate() {
            let end = outline[(i + 1) % outline.len()];
            draw_line_segment_mut(&mut canvas, (start.x, start.y), (end.x, end.y), OUTLINE);
        }
    }
    DynamicImage::ImageRgb8(canvas)
}

/// Draw a quadrilateral and mark its corners.
pub(crate) fn render_corners(base: &RgbImage, corners: &[Point2; 4]) -> DynamicImage {
    let outlined = render_outlines(base, &[corners.to_vec()]);
    let mut canvas = outlined.into_rgb8();
    for corner in corners {
        let centre = (corner.x.round() as i32, corner.y.round() as i32);
        draw_filled_circle_mut(&mut canvas, centre, 4, CORNER);
    }
    DynamicImage::ImageRgb8(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_observers() {
        let mut seen = Vec::new();
        {
            let mut observer = |stage: Stage, _image: &DynamicImage| seen.push(stage);
            let image = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
            observer.on_stage(Stage::Edges, &image);
            observer.on_stage(Stage::Rectified, &image);
            assert!(observer.is_active());
        }
        assert_eq!(seen, vec![Stage::Edges, Stage::Rectified]);
    }

    #[test]
    fn noop_is_inactive() {
        assert!(!NoopObserver.is_active());
        assert!(TracingObserver.is_active());
    }

    #[test]
    fn corner_overlay_keeps_dimensions() {
        let base = RgbImage::new(40, 30);
        let corners = [
            Point2::new(5.0, 5.0),
            Point2::new(35.0, 5.0),
            Point2::new(35.0, 25.0),
            Point2::new(5.0, 25.0),
        ];
        let overlay = render_corners(&base, &corners).into_rgb8();
        assert_eq!(overlay.dimensions(), (40, 30));
        assert_eq!(overlay.get_pixel(5, 5), &CORNER);
    }
}
