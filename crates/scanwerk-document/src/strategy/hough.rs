// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Last-resort strategy: intersect the four outermost straight edges.

use image::DynamicImage;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use scanwerk_core::config::ScanConfig;
use scanwerk_core::error::{Result, ScanError};
use scanwerk_core::{CandidateSource, DocumentProfile, Point2};
use tracing::{debug, info, instrument};

use super::{DetectionStrategy, rectify_candidate};
use crate::detect::select::{accept_quad, quad_area};
use crate::detect::{Stage, StageObserver};
use crate::image::WorkingImage;
use crate::scan::RectifiedDocument;

/// Plausible document area as a fraction of the frame.
const MIN_AREA_FRACTION: f32 = 0.10;
const MAX_AREA_FRACTION: f32 = 0.90;

/// Corners may sit this far (px, working scale) outside the frame.
const FRAME_SLACK: f32 = 2.0;

/// Find dominant straight edges with the Hough transform and intersect them.
///
/// Works when the document's border is visible as lines even though its
/// interior does not separate from the background.
#[derive(Debug, Clone)]
pub struct HoughLinesStrategy {
    working_height: u32,
    aspect_tolerance: f64,
}

impl HoughLinesStrategy {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            working_height: config.working_height,
            aspect_tolerance: config.selection.aspect_tolerance,
        }
    }

    /// Document corners `[top_left, top_right, bottom_right, bottom_left]`
    /// in working coordinates.
    fn locate(&self, working: &WorkingImage, observer: &mut dyn StageObserver) -> Result<[Point2; 4]> {
        let (width, height) = (working.width(), working.height());
        let blurred = gaussian_blur_f32(&working.gray(), 2.0);
        let edges = canny(&blurred, 50.0, 150.0);
        if observer.is_active() {
            observer.on_stage(Stage::Edges, &DynamicImage::ImageLuma8(edges.clone()));
        }

        // Votes scale with the diagonal so detection is resolution independent.
        let diagonal = (width as f64).hypot(height as f64);
        let vote_threshold = (diagonal * 0.25).max(80.0) as u32;
        let lines = detect_lines(
            &edges,
            LineDetectionOptions {
                vote_threshold,
                suppression_radius: 8,
            },
        );
        debug!(line_count = lines.len(), vote_threshold, "Hough lines detected");
        if lines.len() < 4 {
            return Err(ScanError::NoCandidateFound);
        }

        let (horizontal, vertical) = classify_lines(&lines);
        debug!(
            horizontal = horizontal.len(),
            vertical = vertical.len(),
            "Lines classified"
        );
        if horizontal.len() < 2 || vertical.len() < 2 {
            return Err(ScanError::NoCandidateFound);
        }
        let (Some(top), Some(bottom), Some(left), Some(right)) = (
            find_extreme_line(&horizontal, width, height, EdgeKind::Top),
            find_extreme_line(&horizontal, width, height, EdgeKind::Bottom),
            find_extreme_line(&vertical, width, height, EdgeKind::Left),
            find_extreme_line(&vertical, width, height, EdgeKind::Right),
        ) else {
            return Err(ScanError::NoCandidateFound);
        };

        let corners = compute_quad_corners(&top, &bottom, &left, &right).ok_or_else(|| {
            ScanError::DegenerateGeometry("document edges are parallel".into())
        })?;
        validate_quad(&corners, width, height)?;
        Ok(corners)
    }
}

impl DetectionStrategy for HoughLinesStrategy {
    fn name(&self) -> &str {
        "hough-lines"
    }

    #[instrument(skip_all, fields(strategy = "hough-lines"))]
    fn detect(
        &self,
        image: &DynamicImage,
        profile: Option<&DocumentProfile>,
        observer: &mut dyn StageObserver,
    ) -> Result<RectifiedDocument> {
        let working = WorkingImage::new(image, self.working_height)?;
        let corners = self.locate(&working, observer)?;
        debug!(?corners, "Quadrilateral corners computed");

        let points = corners.map(|p| p.scaled(working.inverse_scale()));
        let candidate = accept_quad(
            points,
            CandidateSource::HoughLines,
            0,
            profile,
            self.aspect_tolerance,
        )?;
        info!(
            detected_ratio = candidate.detected_ratio,
            "Edge intersections accepted"
        );
        rectify_candidate(self.name(), image, &working, candidate, profile, observer)
    }
}

// -- Line helpers -------------------------------------------------------------

/// Which document edge a line corresponds to.
#[derive(Debug, Clone, Copy)]
enum EdgeKind {
    Top,
    Bottom,
    Left,
    Right,
}

/// Split lines into roughly horizontal and roughly vertical.
///
/// `angle_in_degrees` is the direction of the line's normal: 90 is a
/// horizontal line, 0 or 180 a vertical one. Within 30 degrees of either
/// counts; lines in between are discarded.
fn classify_lines(lines: &[PolarLine]) -> (Vec<PolarLine>, Vec<PolarLine>) {
    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();

    for line in lines {
        let angle = line.angle_in_degrees;
        if (60..=120).contains(&angle) {
            horizontal.push(*line);
        } else if angle <= 30 || angle >= 150 {
            vertical.push(*line);
        }
    }

    (horizontal, vertical)
}

/// Position of a line across the image centre: its y at the middle column
/// for horizontals, its x at the middle row for verticals.
fn crossing(line: &PolarLine, img_width: u32, img_height: u32, kind: EdgeKind) -> f32 {
    let theta = (line.angle_in_degrees as f32).to_radians();
    let (sin, cos) = theta.sin_cos();
    match kind {
        EdgeKind::Top | EdgeKind::Bottom => (line.r - img_width as f32 / 2.0 * cos) / sin,
        EdgeKind::Left | EdgeKind::Right => (line.r - img_height as f32 / 2.0 * sin) / cos,
    }
}

/// The outermost line for the requested edge, or `None` for an empty set.
fn find_extreme_line(
    lines: &[PolarLine],
    img_width: u32,
    img_height: u32,
    kind: EdgeKind,
) -> Option<PolarLine> {
    let key = |line: &&PolarLine| crossing(line, img_width, img_height, kind);
    let by_key = |a: &&PolarLine, b: &&PolarLine| key(a).total_cmp(&key(b));
    match kind {
        EdgeKind::Top | EdgeKind::Left => lines.iter().min_by(by_key).copied(),
        EdgeKind::Bottom | EdgeKind::Right => lines.iter().max_by(by_key).copied(),
    }
}

/// Intersections `[top_left, top_right, bottom_right, bottom_left]`, or
/// `None` if any pair is parallel.
fn compute_quad_corners(
    top: &PolarLine,
    bottom: &PolarLine,
    left: &PolarLine,
    right: &PolarLine,
) -> Option<[Point2; 4]> {
    let top_left = intersect_polar_lines(top, left)?;
    let top_right = intersect_polar_lines(top, right)?;
    let bottom_right = intersect_polar_lines(bottom, right)?;
    let bottom_left = intersect_polar_lines(bottom, left)?;
    Some([top_left, top_right, bottom_right, bottom_left])
}

/// Intersection of `x cos(t) + y sin(t) = r` lines, `None` when parallel.
fn intersect_polar_lines(a: &PolarLine, b: &PolarLine) -> Option<Point2> {
    let theta_a = (a.angle_in_degrees as f64).to_radians();
    let theta_b = (b.angle_in_degrees as f64).to_radians();
    let (sin_a, cos_a) = theta_a.sin_cos();
    let (sin_b, cos_b) = theta_b.sin_cos();

    let denom = cos_a * sin_b - sin_a * cos_b;
    if denom.abs() < 1e-6 {
        return None;
    }

    let (r_a, r_b) = (a.r as f64, b.r as f64);
    let x = (r_a * sin_b - r_b * sin_a) / denom;
    let y = (r_b * cos_a - r_a * cos_b) / denom;
    Some(Point2::new(x as f32, y as f32))
}

/// Corners must lie in the frame and enclose a plausible share of it.
fn validate_quad(corners: &[Point2; 4], img_width: u32, img_height: u32) -> Result<()> {
    let (w, h) = (img_width as f32, img_height as f32);
    let inside = |p: &Point2| {
        (-FRAME_SLACK..=w + FRAME_SLACK).contains(&p.x)
            && (-FRAME_SLACK..=h + FRAME_SLACK).contains(&p.y)
    };
    if !corners.iter().all(inside) {
        return Err(ScanError::DegenerateGeometry(format!(
            "edge intersections fall outside the {img_width}x{img_height} frame"
        )));
    }

    let fraction = (quad_area(corners) / (w as f64 * h as f64)) as f32;
    if !(MIN_AREA_FRACTION..=MAX_AREA_FRACTION).contains(&fraction) {
        return Err(ScanError::DegenerateGeometry(format!(
            "quadrilateral covers {:.0}% of the frame",
            fraction * 100.0
        )));
    }
    Ok(())
}
