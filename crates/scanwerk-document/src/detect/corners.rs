// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use scanwerk_core::{OrderedCorners, Point2};

/// Assign four unordered points to top-left, top-right, bottom-right and
/// bottom-left.
///
/// Top-left has the smallest `x + y` and bottom-right the largest.
/// Top-right has the smallest `y - x` and bottom-left the largest. Ties keep
/// the first point in input order. For badly skewed inputs the same point can
/// win two roles; callers treat the resulting zero-area quad as degenerate.
pub fn order_corners(points: &[Point2; 4]) -> OrderedCorners {
    let pick = |key: fn(&Point2) -> f32, largest: bool| -> Point2 {
        let mut best = points[0];
        for p in &points[1..] {
            let better = if largest {
                key(p) > key(&best)
            } else {
                key(p) < key(&best)
            };
            if better {
                best = *p;
            }
        }
        best
    };

    OrderedCorners {
        top_left: pick(|p| p.x + p.y, false),
        top_right: pick(|p| p.y - p.x, false),
        bottom_right: pick(|p| p.x + p.y, true),
        bottom_left: pick(|p| p.y - p.x, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Point2 {
        Point2::new(x, y)
    }

    #[test]
    fn orders_shuffled_rectangle() {
        let ordered = order_corners(&[p(10.0, 90.0), p(110.0, 10.0), p(10.0, 10.0), p(110.0, 90.0)]);
        assert_eq!(ordered.top_left, p(10.0, 10.0));
        assert_eq!(ordered.top_right, p(110.0, 10.0));
        assert_eq!(ordered.bottom_right, p(110.0, 90.0));
        assert_eq!(ordered.bottom_left, p(10.0, 90.0));
    }

    #[test]
    fn ordering_ignores_input_permutation() {
        let quad = [p(20.0, 15.0), p(180.0, 30.0), p(170.0, 140.0), p(12.0, 120.0)];
        let expected = order_corners(&quad);
        let rotations = [
            [quad[1], quad[2], quad[3], quad[0]],
            [quad[3], quad[1], quad[0], quad[2]],
            [quad[2], quad[0], quad[3], quad[1]],
        ];
        for rotation in rotations {
            assert_eq!(order_corners(&rotation), expected);
        }
    }

    #[test]
    fn slightly_rotated_quad() {
        let ordered = order_corners(&[p(105.0, 0.0), p(0.0, 5.0), p(100.0, 80.0), p(-5.0, 75.0)]);
        assert_eq!(ordered.top_left, p(0.0, 5.0));
        assert_eq!(ordered.top_right, p(105.0, 0.0));
        assert_eq!(ordered.bottom_right, p(100.0, 80.0));
        assert_eq!(ordered.bottom_left, p(-5.0, 75.0));
    }
}
