// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Picks the first ranked outline that reduces to a plausible document quad.

use imageproc::geometry::{
    approximate_polygon_dp, arc_length, contour_area, convex_hull, min_area_rect,
};
use imageproc::point::Point;
use scanwerk_core::config::SelectionConfig;
use scanwerk_core::error::{Result, ScanError};
use scanwerk_core::{CandidateSource, DocumentProfile, Point2, QuadCandidate};
use tracing::{debug, info, instrument};

use super::boundary::Contour;
use super::corners::order_corners;
use super::rectify::Rectifier;

/// Turns ranked contours into a single accepted quadrilateral.
#[derive(Debug, Clone)]
pub struct QuadrilateralSelector {
    config: SelectionConfig,
}

impl QuadrilateralSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    /// First contour, in the given order, whose quadrilateral is accepted.
    ///
    /// `contours` are in working coordinates; `inverse_scale` maps the result
    /// back to the original image.
    #[instrument(skip_all, fields(candidates = contours.len(), expected = ?expected.map(|p| p.aspect_ratio)))]
    pub fn select(
        &self,
        contours: &[Contour],
        inverse_scale: f64,
        expected: Option<&DocumentProfile>,
    ) -> Option<QuadCandidate> {
        for (rank, contour) in contours.iter().enumerate() {
            match self.evaluate(contour, rank, inverse_scale, expected) {
                Ok(candidate) => {
                    info!(
                        rank,
                        source = %candidate.source,
                        detected_ratio = candidate.detected_ratio,
                        "Quadrilateral accepted"
                    );
                    return Some(candidate);
                }
                Err(err) => debug!(rank, error = %err, "Candidate rejected"),
            }
        }
        debug!("No contour produced an acceptable quadrilateral");
        None
    }

    /// Reduce one contour to a quad and score it.
    pub fn evaluate(
        &self,
        contour: &Contour,
        rank: usize,
        inverse_scale: f64,
        expected: Option<&DocumentProfile>,
    ) -> Result<QuadCandidate> {
        let (points, source) = self.quadrilateral(contour)?;
        let scaled = points.map(|p| p.scaled(inverse_scale));
        accept_quad(scaled, source, rank, expected, self.config.aspect_tolerance)
    }

    /// Four vertices for a contour: its simplified hull when that has exactly
    /// four, otherwise the hull's minimum-area rectangle.
    pub fn quadrilateral(&self, contour: &Contour) -> Result<([Point2; 4], CandidateSource)> {
        let hull = convex_hull(&contour.points[..]);
        if hull.len() < 3 {
            return Err(ScanError::DegenerateGeometry(format!(
                "convex hull has {} points",
                hull.len()
            )));
        }

        let epsilon = self.config.epsilon_fraction * arc_length(&hull[..], true);
        let simplified = simplify_closed(&hull, epsilon);
        debug!(
            hull = hull.len(),
            simplified = simplified.len(),
            epsilon,
            "Hull simplified"
        );

        if let [a, b, c, d] = simplified[..] {
            return Ok(([a, b, c, d].map(to_point2), CandidateSource::Polygon));
        }
        let rect = min_area_rect(&hull[..]);
        Ok((rect.map(to_point2), CandidateSource::MinAreaRect))
    }
}

/// Score a quad in original coordinates against the expected profile.
///
/// Without a profile any non-degenerate quad is accepted. With one, the
/// oriented measured ratio must be within `tolerance` of the profile's.
pub(crate) fn accept_quad(
    points: [Point2; 4],
    source: CandidateSource,
    rank: usize,
    expected: Option<&DocumentProfile>,
    tolerance: f64,
) -> Result<QuadCandidate> {
    let area = quad_area(&points);
    if area < 1.0 {
        return Err(ScanError::DegenerateGeometry(format!(
            "quadrilateral encloses {area:.2} px²"
        )));
    }

    let plan = Rectifier::plan(&points, expected.map(|p| p.aspect_ratio));
    if let Some(profile) = expected {
        let mismatch = (plan.detected_ratio - profile.aspect_ratio).abs();
        debug!(
            rank,
            %source,
            detected = plan.detected_ratio,
            expected = profile.aspect_ratio,
            mismatch,
            "Aspect ratio compared"
        );
        if mismatch > tolerance {
            return Err(ScanError::AspectRatioMismatch {
                expected: profile.aspect_ratio,
                detected: plan.detected_ratio,
            });
        }
    }

    Ok(QuadCandidate {
        points,
        source,
        rank,
        detected_ratio: plan.detected_ratio,
    })
}

/// Area enclosed by four corners, taken in cyclic order.
pub(crate) fn quad_area(points: &[Point2; 4]) -> f64 {
    let ring = order_corners(points)
        .to_array()
        .map(|p| Point::new(p.x as f64, p.y as f64));
    contour_area(&ring)
}

/// Douglas-Peucker on a closed polygon.
///
/// The ring is split at an approximately farthest pair of vertices: the
/// vertex `a` farthest from the first one, then the vertex `b` farthest
/// from `a`. Both halves are simplified as open curves, so `a` and `b`
/// survive and the arbitrary starting vertex does not. A non-positive
/// `epsilon` returns the ring unchanged.
pub fn simplify_closed(ring: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if ring.len() < 3 || epsilon.is_nan() || epsilon <= 0.0 {
        return ring.to_vec();
    }
    let a = farthest_from(ring, ring[0]);
    let b = farthest_from(ring, ring[a]);
    if a == b {
        return ring.to_vec();
    }
    let (lo, hi) = (a.min(b), a.max(b));

    let mut wrapped = ring[hi..].to_vec();
    wrapped.extend_from_slice(&ring[..=lo]);

    let mut simplified = approximate_polygon_dp(&ring[lo..=hi], epsilon, false);
    simplified.pop();
    let mut second = approximate_polygon_dp(&wrapped[..], epsilon, false);
    second.pop();
    simplified.extend(second);
    simplified
}

fn farthest_from(ring: &[Point<i32>], origin: Point<i32>) -> usize {
    let mut best = (0, 0i64);
    for (i, p) in ring.iter().enumerate() {
        let dx = (p.x - origin.x) as i64;
        let dy = (p.y - origin.y) as i64;
        let d = dx * dx + dy * dy;
        if d > best.1 {
            best = (i, d);
        }
    }
    best.0
}

fn to_point2(p: Point<i32>) -> Point2 {
    Point2::new(p.x as f32, p.y as f32)
}
