// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Candidate document outlines from a binary foreground image.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::geometry::{arc_length, contour_area, convex_hull};
use imageproc::morphology::{close, open};
use imageproc::point::Point;
use scanwerk_core::Point2;
use scanwerk_core::config::BoundaryConfig;
use tracing::{debug, info, instrument};

use super::observer::{NoopObserver, Stage, StageObserver};

/// A traced outer border with its enclosed area and perimeter.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
    /// Area enclosed by the outline's convex hull.
    pub area: f64,
    /// Closed arc length of the traced points.
    pub perimeter: f64,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        let hull = convex_hull(&points[..]);
        let area = contour_area(&hull);
        let perimeter = arc_length(&points[..], true);
        Self {
            points,
            area,
            perimeter,
        }
    }

    pub fn to_point2(&self) -> Vec<Point2> {
        self.points
            .iter()
            .map(|p| Point2::new(p.x as f32, p.y as f32))
            .collect()
    }
}

/// Cleans a binary foreground, traces its edges and ranks the outer borders.
#[derive(Debug, Clone)]
pub struct BoundaryExtractor {
    config: BoundaryConfig,
}

impl BoundaryExtractor {
    pub fn new(config: BoundaryConfig) -> Self {
        Self { config }
    }

    /// Ranked outlines of a masked image (background painted black).
    pub fn extract_candidates(&self, masked: &DynamicImage) -> Vec<Contour> {
        self.extract_observed(masked, &mut NoopObserver)
    }

    /// [`extract_candidates`](Self::extract_candidates), reporting the edge map.
    pub fn extract_observed(
        &self,
        masked: &DynamicImage,
        observer: &mut dyn StageObserver,
    ) -> Vec<Contour> {
        let gray = masked.to_luma8();
        let cutoff = self.config.foreground_cutoff;
        let binary = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            Luma([if gray.get_pixel(x, y).0[0] > cutoff { 255 } else { 0 }])
        });
        self.trace_observed(&binary, observer)
    }

    /// Ranked outlines of an already binarised image.
    pub fn trace_candidates(&self, binary: &GrayImage) -> Vec<Contour> {
        self.trace_observed(binary, &mut NoopObserver)
    }

    /// [`trace_candidates`](Self::trace_candidates), reporting the edge map.
    #[instrument(skip_all, fields(width = binary.width(), height = binary.height()))]
    pub fn trace_observed(
        &self,
        binary: &GrayImage,
        observer: &mut dyn StageObserver,
    ) -> Vec<Contour> {
        // 3x3 closing fills pinholes, opening removes specks.
        let cleaned = open(&close(binary, Norm::LInf, 1), Norm::LInf, 1);
        let edges = canny(&cleaned, self.config.canny_low, self.config.canny_high);
        if observer.is_active() {
            observer.on_stage(Stage::Edges, &DynamicImage::ImageLuma8(edges.clone()));
        }

        let frame = binary.width() as f64 * binary.height() as f64;
        let min_area = frame * self.config.min_area_fraction;

        let traced = find_contours::<i32>(&edges);
        let total = traced.len();
        let mut contours: Vec<Contour> = traced
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(|c| Contour::new(c.points))
            .filter(|c| c.area >= min_area && c.area > 0.0)
            .collect();

        contours.sort_by(|a, b| b.area.total_cmp(&a.area));
        contours.truncate(self.config.max_candidates);

        debug!(
            traced = total,
            kept = contours.len(),
            min_area,
            "Contours ranked"
        );
        if let Some(largest) = contours.first() {
            info!(
                candidates = contours.len(),
                largest_area = largest.area,
                "Boundary candidates extracted"
            );
        }
        contours
    }
}
