// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometric value types shared by the detection pipeline.

use serde::{Deserialize, Serialize};

/// A sub-pixel point in image coordinates (x to the right, y down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point2) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        dx.hypot(dy)
    }

    /// Multiply both coordinates by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            x: (self.x as f64 * factor) as f32,
            y: (self.y as f64 * factor) as f32,
        }
    }
}

impl From<(f32, f32)> for Point2 {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl From<Point2> for (f32, f32) {
    fn from(p: Point2) -> Self {
        (p.x, p.y)
    }
}

/// Four corners in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderedCorners {
    pub top_left: Point2,
    pub top_right: Point2,
    pub bottom_right: Point2,
    pub bottom_left: Point2,
}

impl OrderedCorners {
    /// Corners as `[top_left, top_right, bottom_right, bottom_left]`.
    pub fn to_array(&self) -> [Point2; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Shift the corner cycle so that the old left edge becomes the top edge.
    ///
    /// Warping with the rotated cycle turns the content 90° clockwise.
    pub fn rotated_clockwise(&self) -> Self {
        Self {
            top_left: self.bottom_left,
            top_right: self.top_left,
            bottom_right: self.top_right,
            bottom_left: self.bottom_right,
        }
    }

    /// Longer of the top and bottom edges.
    pub fn measured_width(&self) -> f64 {
        let top = self.top_left.distance(&self.top_right);
        let bottom = self.bottom_left.distance(&self.bottom_right);
        top.max(bottom)
    }

    /// Longer of the left and right edges.
    pub fn measured_height(&self) -> f64 {
        let left = self.top_left.distance(&self.bottom_left);
        let right = self.top_right.distance(&self.bottom_right);
        left.max(right)
    }
}

/// How a quadrilateral candidate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateSource {
    /// Hull simplified to exactly four vertices.
    Polygon,
    /// Minimum-area rectangle around the hull (fallback).
    MinAreaRect,
    /// Intersections of the four dominant Hough lines.
    HoughLines,
}

impl std::fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Polygon => "polygon",
            Self::MinAreaRect => "min-area-rect",
            Self::HoughLines => "hough-lines",
        };
        f.write_str(label)
    }
}

/// An accepted quadrilateral, in original-image coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadCandidate {
    /// Corner points, unordered.
    pub points: [Point2; 4],
    pub source: CandidateSource,
    /// Index of the contour in the area ranking (0 = largest).
    pub rank: usize,
    /// Width / height of the provisional rectification.
    pub detected_ratio: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(w: f32, h: f32) -> OrderedCorners {
        OrderedCorners {
            top_left: Point2::new(0.0, 0.0),
            top_right: Point2::new(w, 0.0),
            bottom_right: Point2::new(w, h),
            bottom_left: Point2::new(0.0, h),
        }
    }

    #[test]
    fn measured_size_of_rectangle() {
        let corners = rect(300.0, 200.0);
        assert!((corners.measured_width() - 300.0).abs() < 1e-9);
        assert!((corners.measured_height() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn clockwise_rotation_swaps_measured_sides() {
        let rotated = rect(300.0, 200.0).rotated_clockwise();
        assert!((rotated.measured_width() - 200.0).abs() < 1e-9);
        assert!((rotated.measured_height() - 300.0).abs() < 1e-9);
        assert_eq!(rotated.top_left, Point2::new(0.0, 200.0));
    }

    #[test]
    fn point_scaling() {
        let p = Point2::new(10.0, 4.0).scaled(1.5);
        assert_eq!(p, Point2::new(15.0, 6.0));
    }
}
