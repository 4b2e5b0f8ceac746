// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Foreground segmentation from a weak rectangular prior.
//
// Pixels outside a rectangle inset by `margin` are fixed background; pixels
// inside are probable foreground. Each round fits a Gaussian mixture colour
// model to the current foreground and background, then relabels the
// probable pixels by minimising data cost (negative log-likelihood) plus a
// contrast-sensitive neighbour agreement term.

use image::{GrayImage, Luma, RgbImage};
use nalgebra::{Matrix3, Vector3};
use scanwerk_core::config::SegmentationConfig;
use scanwerk_core::error::{Result, ScanError};
use tracing::{debug, info, instrument, warn};

/// Added to covariance diagonals so single-colour components stay invertible.
const COVARIANCE_EPSILON: f64 = 0.01;

/// Foreground must win by more than this; exact ties go to background.
const TIE_MARGIN: f64 = 1e-9;

type Color = [f64; 3];

/// Produces a binary foreground mask (0 / 255) from a working-resolution image.
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmentationConfig,
}

impl Segmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    /// Segment `image` into document (255) and background (0).
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn segment(&self, image: &RgbImage) -> Result<GrayImage> {
        let (width, height) = image.dimensions();
        let margin = self.config.margin;
        if width <= margin * 2 || height <= margin * 2 {
            return Err(ScanError::InvalidImage(format!(
                "{}x{} image leaves no room for a {} px foreground prior",
                width, height, margin
            )));
        }

        let w = width as usize;
        let colors: Vec<Color> = image
            .pixels()
            .map(|p| [p.0[0] as f64, p.0[1] as f64, p.0[2] as f64])
            .collect();
        let movable: Vec<bool> = (0..colors.len())
            .map(|i| {
                let (x, y) = ((i % w) as u32, (i / w) as u32);
                x >= margin && x < width - margin && y >= margin && y < height - margin
            })
            .collect();

        let mut labels = movable.clone();
        let k = self.config.components.max(1);
        let mut assignment: Vec<usize> = colors.iter().map(|c| luminance_band(c, k)).collect();
        let edges = NeighbourWeights::new(&colors, w, self.config.smoothness);

        for round in 0..self.config.iterations {
            let Some((fg, bg)) = fit_models(&colors, &labels, &assignment, k) else {
                if round == 0 {
                    warn!("Prior leaves one class empty; returning the prior rectangle");
                }
                break;
            };

            // Hard-assign every pixel to its best component, then refit.
            for (i, color) in colors.iter().enumerate() {
                let model = if labels[i] { &fg } else { &bg };
                assignment[i] = model.best_component(color);
            }
            let Some((fg, bg)) = fit_models(&colors, &labels, &assignment, k) else {
                break;
            };

            let fg_cost: Vec<f64> = colors.iter().map(|c| -fg.log_likelihood(c)).collect();
            let bg_cost: Vec<f64> = colors.iter().map(|c| -bg.log_likelihood(c)).collect();

            for i in 0..labels.len() {
                labels[i] = movable[i] && fg_cost[i] + TIE_MARGIN < bg_cost[i];
            }
            for _ in 0..self.config.refine_sweeps {
                edges.sweep(&mut labels, &movable, &fg_cost, &bg_cost);
            }

            debug!(
                round,
                foreground = labels.iter().filter(|&&l| l).count(),
                "Segmentation round complete"
            );
        }

        let mask = GrayImage::from_fn(width, height, |x, y| {
            let i = y as usize * w + x as usize;
            Luma([if labels[i] { 255 } else { 0 }])
        });
        info!(
            foreground = labels.iter().filter(|&&l| l).count(),
            "Segmentation complete"
        );
        Ok(mask)
    }
}

/// Initial component for a colour: its luminance band out of `k`.
fn luminance_band(color: &Color, k: usize) -> usize {
    let luma = 0.299 * color[0] + 0.587 * color[1] + 0.114 * color[2];
    ((luma * k as f64 / 256.0) as usize).min(k - 1)
}

fn fit_models(
    colors: &[Color],
    labels: &[bool],
    assignment: &[usize],
    k: usize,
) -> Option<(ColorModel, ColorModel)> {
    let fg = ColorModel::fit(colors, assignment, k, |i| labels[i])?;
    let bg = ColorModel::fit(colors, assignment, k, |i| !labels[i])?;
    Some((fg, bg))
}

// -- Colour model -------------------------------------------------------------

/// One weighted Gaussian of a mixture.
#[derive(Debug, Clone)]
struct Component {
    /// `ln(weight) - ln(sqrt((2*pi)^3 * det))`.
    log_scale: f64,
    mean: Vector3<f64>,
    inverse: Matrix3<f64>,
}

impl Component {
    fn log_density(&self, color: &Color) -> f64 {
        let d = Vector3::from(*color) - self.mean;
        let mahalanobis = d.dot(&(self.inverse * d));
        self.log_scale - 0.5 * mahalanobis
    }
}

#[derive(Debug, Clone, Default)]
struct Accumulator {
    count: usize,
    sum: Vector3<f64>,
    products: Matrix3<f64>,
}

impl Accumulator {
    fn add(&mut self, color: &Color) {
        let c = Vector3::from(*color);
        self.count += 1;
        self.sum += c;
        self.products += c * c.transpose();
    }

    fn finish(&self, total: usize) -> Option<Component> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        let mean = self.sum / n;
        let mut cov = self.products / n - mean * mean.transpose()
            + Matrix3::identity() * COVARIANCE_EPSILON;

        if cov.determinant() <= f64::EPSILON {
            cov += Matrix3::identity();
        }
        let det = cov.determinant();
        let inverse = cov.try_inverse()?;
        let weight = n / total as f64;
        let log_scale =
            weight.ln() - 0.5 * (3.0 * (2.0 * std::f64::consts::PI).ln() + det.ln());

        Some(Component {
            log_scale,
            mean,
            inverse,
        })
    }
}

/// Gaussian mixture over RGB with slots indexed by component id.
#[derive(Debug, Clone)]
struct ColorModel {
    components: Vec<Option<Component>>,
}

impl ColorModel {
    /// Fit from the pixels selected by `member`, grouped by `assignment`.
    /// `None` when no pixel is selected.
    fn fit(
        colors: &[Color],
        assignment: &[usize],
        k: usize,
        member: impl Fn(usize) -> bool,
    ) -> Option<Self> {
        let mut stats = vec![Accumulator::default(); k];
        let mut total = 0usize;
        for (i, color) in colors.iter().enumerate() {
            if member(i) {
                stats[assignment[i].min(k - 1)].add(color);
                total += 1;
            }
        }
        if total == 0 {
            return None;
        }
        Some(Self {
            components: stats.iter().map(|s| s.finish(total)).collect(),
        })
    }

    fn log_likelihood(&self, color: &Color) -> f64 {
        let densities: Vec<f64> = self
            .components
            .iter()
            .flatten()
            .map(|c| c.log_density(color))
            .collect();
        let max = densities.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return max;
        }
        max + densities.iter().map(|d| (d - max).exp()).sum::<f64>().ln()
    }

    fn best_component(&self, color: &Color) -> usize {
        self.components
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|c| (i, c.log_density(color))))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

// -- Neighbour agreement ------------------------------------------------------

/// Contrast-sensitive weights between 4-connected neighbours.
///
/// `right[i]` links pixel `i` to `i + 1`, `down[i]` links it to `i + width`.
/// Weights are `smoothness * exp(-beta * |dc|^2)` with
/// `beta = 1 / (2 * mean |dc|^2)`, so label changes are cheap across strong
/// colour edges and expensive inside flat regions.
struct NeighbourWeights {
    width: usize,
    right: Vec<f64>,
    down: Vec<f64>,
}

impl NeighbourWeights {
    fn new(colors: &[Color], width: usize, smoothness: f64) -> Self {
        let n = colors.len();
        let height = n / width;
        let dist2 = |a: &Color, b: &Color| {
            (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
        };

        let mut total = 0.0;
        let mut pairs = 0usize;
        for i in 0..n {
            let (x, y) = (i % width, i / width);
            if x + 1 < width {
                total += dist2(&colors[i], &colors[i + 1]);
                pairs += 1;
            }
            if y + 1 < height {
                total += dist2(&colors[i], &colors[i + width]);
                pairs += 1;
            }
        }
        let mean = if pairs > 0 { total / pairs as f64 } else { 0.0 };
        let beta = if mean > 0.0 { 1.0 / (2.0 * mean) } else { 0.0 };

        let mut right = vec![0.0; n];
        let mut down = vec![0.0; n];
        for i in 0..n {
            let (x, y) = (i % width, i / width);
            if x + 1 < width {
                right[i] = smoothness * (-beta * dist2(&colors[i], &colors[i + 1])).exp();
            }
            if y + 1 < height {
                down[i] = smoothness * (-beta * dist2(&colors[i], &colors[i + width])).exp();
            }
        }

        Self { width, right, down }
    }

    /// One in-place conditional-modes pass over the movable pixels.
    fn sweep(&self, labels: &mut [bool], movable: &[bool], fg_cost: &[f64], bg_cost: &[f64]) {
        let n = labels.len();
        let height = n / self.width;
        for i in 0..n {
            if !movable[i] {
                continue;
            }
            let (x, y) = (i % self.width, i / self.width);
            let mut neighbours = [(0usize, 0.0f64); 4];
            let mut count = 0;
            if x > 0 {
                neighbours[count] = (i - 1, self.right[i - 1]);
                count += 1;
            }
            if x + 1 < self.width {
                neighbours[count] = (i + 1, self.right[i]);
                count += 1;
            }
            if y > 0 {
                neighbours[count] = (i - self.width, self.down[i - self.width]);
                count += 1;
            }
            if y + 1 < height {
                neighbours[count] = (i + self.width, self.down[i]);
                count += 1;
            }

            let mut cost_fg = fg_cost[i];
            let mut cost_bg = bg_cost[i];
            for &(j, weight) in &neighbours[..count] {
                if labels[j] {
                    cost_bg += weight;
                } else {
                    cost_fg += weight;
                }
            }
            labels[i] = cost_fg + TIE_MARGIN < cost_bg;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::document_on_background;
    use image::Rgb;

    fn segmenter() -> Segmenter {
        Segmenter::new(SegmentationConfig::default())
    }

    #[test]
    fn bright_document_on_dark_background() {
        let image = document_on_background(200, 160, (50, 40, 150, 120));
        let mask = segmenter().segment(&image).expect("segmentation runs");

        assert_eq!(mask.dimensions(), (200, 160));
        assert_eq!(mask.get_pixel(100, 80).0[0], 255, "document centre");
        assert_eq!(mask.get_pixel(60, 50).0[0], 255, "inside document corner");
        assert_eq!(mask.get_pixel(20, 20).0[0], 0, "background inside prior");
        assert_eq!(mask.get_pixel(2, 2).0[0], 0, "outside prior");
        assert_eq!(mask.get_pixel(180, 140).0[0], 0, "background inside prior");
    }

    #[test]
    fn uniform_image_has_no_foreground() {
        let image = RgbImage::from_pixel(120, 100, Rgb([128, 128, 128]));
        let mask = segmenter().segment(&image).expect("segmentation runs");
        assert!(mask.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn tiny_image_is_rejected() {
        let image = RgbImage::new(15, 40);
        assert!(matches!(
            segmenter().segment(&image),
            Err(ScanError::InvalidImage(_))
        ));
    }

    #[test]
    fn single_colour_component_stays_invertible() {
        let mut acc = Accumulator::default();
        for _ in 0..10 {
            acc.add(&[120.0, 80.0, 40.0]);
        }
        let component = acc.finish(20).expect("non-empty component");
        assert!((component.mean - Vector3::new(120.0, 80.0, 40.0)).norm() < 1e-9);
        assert!(component.log_scale.is_finite());
        // The component prefers its own colour to a distant one.
        assert!(
            component.log_density(&[120.0, 80.0, 40.0]) > component.log_density(&[10.0, 200.0, 90.0])
        );
    }

    #[test]
    fn diagonal_covariance_density_matches_closed_form() {
        let component = Component {
            log_scale: 0.0,
            mean: Vector3::zeros(),
            inverse: Matrix3::from_diagonal(&Vector3::new(2.0, 4.0, 5.0))
                .try_inverse()
                .expect("diagonal is invertible"),
        };
        // -0.5 * (1/2 + 4/4 + 0/5)
        assert!((component.log_density(&[1.0, 2.0, 0.0]) + 0.75).abs() < 1e-12);
        assert!(Accumulator::default().finish(10).is_none());
    }

    #[test]
    fn luminance_bands_cover_range() {
        assert_eq!(luminance_band(&[0.0, 0.0, 0.0], 5), 0);
        assert_eq!(luminance_band(&[255.0, 255.0, 255.0], 5), 4);
        assert_eq!(luminance_band(&[128.0, 128.0, 128.0], 5), 2);
    }
}
