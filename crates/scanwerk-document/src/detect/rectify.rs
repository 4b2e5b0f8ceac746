// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective correction of a located quadrilateral to a top-down canvas.

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use scanwerk_core::{OrderedCorners, Point2};
use tracing::{debug, info, instrument, warn};

use super::corners::order_corners;

/// Where the corners go and how large the canvas is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectificationPlan {
    /// Source corners, already oriented for the expected ratio.
    pub corners: OrderedCorners,
    pub width: u32,
    pub height: u32,
    /// Oriented measured width / height. Zero for a zero-height quad.
    pub detected_ratio: f64,
    /// Whether the corner cycle was rotated to match the expected orientation.
    pub rotated: bool,
}

impl RectificationPlan {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Output of [`Rectifier::rectify`].
#[derive(Debug, Clone)]
pub struct Rectified {
    pub image: DynamicImage,
    pub plan: RectificationPlan,
}

/// Maps a quadrilateral onto an upright rectangle.
#[derive(Debug, Default, Clone, Copy)]
pub struct Rectifier;

impl Rectifier {
    /// Size and orient the destination without touching pixels.
    ///
    /// Edges are measured as the longer of each opposite pair. When
    /// `expected_ratio` is given and its orientation (landscape at >= 1)
    /// disagrees with the measured one, the corners are rotated by one
    /// position so the long sides pair up, and the canvas is
    /// `round(height * ratio) x round(height)`.
    pub fn plan(points: &[Point2; 4], expected_ratio: Option<f64>) -> RectificationPlan {
        let mut corners = order_corners(points);
        let mut width = corners.measured_width();
        let mut height = corners.measured_height();
        let mut rotated = false;

        if let Some(ratio) = expected_ratio {
            let measured_landscape = width >= height;
            let expected_landscape = ratio >= 1.0;
            if measured_landscape != expected_landscape {
                corners = corners.rotated_clockwise();
                std::mem::swap(&mut width, &mut height);
                rotated = true;
            }
        }

        let detected_ratio = if height > 0.0 { width / height } else { 0.0 };
        let out_h = (height.round() as u32).max(1);
        let out_w = match expected_ratio {
            Some(ratio) => ((out_h as f64 * ratio).round() as u32).max(1),
            None => (width.round() as u32).max(1),
        };

        RectificationPlan {
            corners,
            width: out_w,
            height: out_h,
            detected_ratio,
            rotated,
        }
    }

    /// Plan, then resample `image` into the planned canvas.
    #[instrument(skip(image, points), fields(src_w = image.width(), src_h = image.height()))]
    pub fn rectify(
        image: &DynamicImage,
        points: &[Point2; 4],
        expected_ratio: Option<f64>,
    ) -> Rectified {
        let plan = Self::plan(points, expected_ratio);
        let image = Self::warp(image, &plan);
        info!(
            width = plan.width,
            height = plan.height,
            detected_ratio = plan.detected_ratio,
            rotated = plan.rotated,
            "Document rectified"
        );
        Rectified { image, plan }
    }

    /// Bilinear warp from the plan's corners to the full canvas.
    ///
    /// Grayscale input stays grayscale; everything else is warped as RGB.
    /// A corner set with no projective solution yields a blank canvas.
    pub fn warp(image: &DynamicImage, plan: &RectificationPlan) -> DynamicImage {
        let (w, h) = (plan.width as f32, plan.height as f32);
        let src = plan.corners.to_array().map(|c| (c.x, c.y));
        let dst = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];

        let Some(projection) = Projection::from_control_points(src, dst) else {
            warn!(?src, "Corners admit no projective transform; returning blank canvas");
            return blank_like(image, plan.width, plan.height);
        };
        debug!(?src, ?dst, "Projection computed");

        match image {
            DynamicImage::ImageLuma8(gray) => {
                let mut out = GrayImage::new(plan.width, plan.height);
                warp_into(gray, &projection, Interpolation::Bilinear, Luma([0]), &mut out);
                DynamicImage::ImageLuma8(out)
            }
            other => {
                let rgb = other.to_rgb8();
                let mut out = RgbImage::new(plan.width, plan.height);
                warp_into(&rgb, &projection, Interpolation::Bilinear, Rgb([0, 0, 0]), &mut out);
                DynamicImage::ImageRgb8(out)
            }
        }
    }
}

fn blank_like(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) => DynamicImage::ImageLuma8(GrayImage::new(width, height)),
        _ => DynamicImage::ImageRgb8(RgbImage::new(width, height)),
    }
}
