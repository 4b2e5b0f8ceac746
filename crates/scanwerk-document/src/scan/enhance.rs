// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Post-processing for rectified documents: adaptive and global
// binarization, and a Hough-based skew estimate.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::hough::{LineDetectionOptions, detect_lines};
use imageproc::integral_image::{integral_image, sum_image_pixels};
use scanwerk_core::config::{AdaptiveMethod, BinarizeConfig};
use tracing::{debug, info, instrument};

/// Blur applied before edge detection in the skew estimate (a 5x5 kernel).
const SKEW_BLUR_SIGMA: f32 = 1.1;
const SKEW_VOTE_THRESHOLD: u32 = 100;

// -- Binarization -------------------------------------------------------------

/// Adaptive local threshold to a black-and-white image.
///
/// Each pixel is compared against the mean of its `block_size` neighbourhood
/// minus `offset`; pixels above that become white. The mean is Gaussian
/// weighted or a plain box mean depending on `config.method`.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn binarize(image: &DynamicImage, config: &BinarizeConfig) -> GrayImage {
    info!("Applying adaptive binarization");
    let output = adaptive_threshold(&image.to_luma8(), config);
    debug!("Binarization complete");
    output
}

pub(crate) fn adaptive_threshold(gray: &GrayImage, config: &BinarizeConfig) -> GrayImage {
    let (width, height) = gray.dimensions();
    let offset = config.offset as f64;

    match config.method {
        AdaptiveMethod::Gaussian => {
            let local = gaussian_blur_f32(gray, config.sigma());
            GrayImage::from_fn(width, height, |x, y| {
                let mean = local.get_pixel(x, y).0[0] as f64;
                threshold_pixel(gray.get_pixel(x, y).0[0], mean - offset)
            })
        }
        AdaptiveMethod::Mean => {
            let integral = integral_image::<_, u64>(gray);
            let radius = config.block_radius();
            GrayImage::from_fn(width, height, |x, y| {
                // Window clipped to the image, bounds inclusive.
                let (left, top) = (x.saturating_sub(radius), y.saturating_sub(radius));
                let right = x.saturating_add(radius).min(width - 1);
                let bottom = y.saturating_add(radius).min(height - 1);
                let count = (right - left + 1) as f64 * (bottom - top + 1) as f64;
                let sum = sum_image_pixels(&integral, left, top, right, bottom)[0] as f64;
                threshold_pixel(gray.get_pixel(x, y).0[0], sum / count - offset)
            })
        }
    }
}

fn threshold_pixel(value: u8, threshold: f64) -> Luma<u8> {
    Luma([if value as f64 > threshold { 255 } else { 0 }])
}

/// Global binarization at the Otsu threshold.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn binarize_otsu(image: &DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    let level = otsu_level(&gray);
    debug!(level, "Otsu level computed");
    // Levels up to and including the Otsu level are background.
    threshold(&gray, level, ThresholdType::Binary)
}

// -- Skew ---------------------------------------------------------------------

/// Median angle (degrees, in [-45, 45]) of the dominant straight lines.
///
/// `None` when no line collects enough votes.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn estimate_skew(image: &DynamicImage) -> Option<f32> {
    let gray = image.to_luma8();
    let blurred = gaussian_blur_f32(&gray, SKEW_BLUR_SIGMA);
    let edges = canny(&blurred, 50.0, 150.0);
    let lines = detect_lines(
        &edges,
        LineDetectionOptions {
            vote_threshold: SKEW_VOTE_THRESHOLD,
            suppression_radius: 8,
        },
    );

    let mut angles: Vec<f32> = lines
        .iter()
        .map(|line| normalise_angle(line.angle_in_degrees as f32 - 90.0))
        .collect();
    let skew = median(&mut angles);
    debug!(lines = lines.len(), ?skew, "Skew estimated");
    skew
}

/// Whether the median line angle exceeds `threshold_degrees` in magnitude.
pub fn is_skewed(image: &DynamicImage, threshold_degrees: f32) -> bool {
    estimate_skew(image).is_some_and(|angle| angle.abs() > threshold_degrees)
}

/// Fold an angle into [-45, 45] so horizontal and vertical lines agree.
fn normalise_angle(angle: f32) -> f32 {
    if angle < -45.0 {
        angle + 90.0
    } else if angle > 45.0 {
        angle - 90.0
    } else {
        angle
    }
}

fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
    use imageproc::rect::Rect;

    fn page_with_stroke() -> DynamicImage {
        let mut gray = GrayImage::from_pixel(60, 40, Luma([210]));
        draw_filled_rect_mut(&mut gray, Rect::at(28, 5).of_size(3, 30), Luma([40]));
        DynamicImage::ImageLuma8(gray)
    }

    #[test]
    fn uniform_page_binarizes_white() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(32, 32, Rgb([180, 170, 160])));
        for method in [AdaptiveMethod::Gaussian, AdaptiveMethod::Mean] {
            let config = BinarizeConfig {
                method,
                ..BinarizeConfig::default()
            };
            let out = binarize(&img, &config);
            assert!(out.pixels().all(|p| p.0[0] == 255), "{method:?}");
        }
    }

    #[test]
    fn dark_stroke_becomes_black() {
        let img = page_with_stroke();
        for method in [AdaptiveMethod::Gaussian, AdaptiveMethod::Mean] {
            let config = BinarizeConfig {
                method,
                ..BinarizeConfig::default()
            };
            let out = binarize(&img, &config);
            assert_eq!(out.dimensions(), (60, 40));
            assert_eq!(out.get_pixel(29, 20).0[0], 0, "{method:?} stroke");
            assert_eq!(out.get_pixel(5, 20).0[0], 255, "{method:?} paper");
        }
    }

    #[test]
    fn otsu_splits_bimodal_image() {
        let gray = GrayImage::from_fn(40, 40, |x, _| Luma([if x < 20 { 30 } else { 220 }]));
        let out = binarize_otsu(&DynamicImage::ImageLuma8(gray));
        assert_eq!(out.get_pixel(5, 5).0[0], 0);
        assert_eq!(out.get_pixel(35, 5).0[0], 255);
    }

    #[test]
    fn box_mean_is_clipped_at_the_border() {
        // A dark left column: its clipped window mean stays well above it.
        let gray = GrayImage::from_fn(30, 30, |x, _| Luma([if x == 0 { 60 } else { 200 }]));
        let config = BinarizeConfig {
            method: AdaptiveMethod::Mean,
            ..BinarizeConfig::default()
        };
        let out = adaptive_threshold(&gray, &config);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(0, 29).0[0], 0);
        assert_eq!(out.get_pixel(29, 29).0[0], 255);
    }

    #[test]
    fn otsu_keeps_the_lower_class_black() {
        let gray = GrayImage::from_fn(20, 10, |x, _| Luma([if x < 10 { 100 } else { 101 }]));
        let out = binarize_otsu(&DynamicImage::ImageLuma8(gray));
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(19, 0).0[0], 255);
    }

    #[test]
    fn blank_image_has_no_skew() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(200, 200, Luma([200])));
        assert_eq!(estimate_skew(&img), None);
        assert!(!is_skewed(&img, 5.0));
    }

    #[test]
    fn straight_rules_are_not_skewed() {
        let mut gray = GrayImage::from_pixel(300, 300, Luma([230]));
        for y in (40..280).step_by(40) {
            draw_filled_rect_mut(&mut gray, Rect::at(20, y).of_size(260, 4), Luma([20]));
        }
        let img = DynamicImage::ImageLuma8(gray);
        let skew = estimate_skew(&img).expect("rules are detected");
        assert!(skew.abs() <= 2.0, "skew {skew}");
        assert!(!is_skewed(&img, 5.0));
    }

    #[test]
    fn tilted_rules_are_skewed() {
        let mut rgb = image::RgbImage::from_pixel(400, 400, Rgb([230, 230, 230]));
        let slope = 20f32.to_radians().tan();
        for offset in (0..10).map(|i| 60.0 + i as f32 * 24.0) {
            for thickness in 0..3 {
                let y0 = offset + thickness as f32;
                draw_line_segment_mut(
                    &mut rgb,
                    (20.0, y0),
                    (380.0, y0 + 360.0 * slope),
                    Rgb([20, 20, 20]),
                );
            }
        }
        let img = DynamicImage::ImageRgb8(rgb);
        let skew = estimate_skew(&img).expect("rules are detected");
        assert!((skew.abs() - 20.0).abs() <= 3.0, "skew {skew}");
        assert!(is_skewed(&img, 5.0));
    }

    #[test]
    fn angles_fold_into_quadrant() {
        assert_eq!(normalise_angle(-90.0), 0.0);
        assert_eq!(normalise_angle(80.0), -10.0);
        assert_eq!(normalise_angle(-60.0), 30.0);
        assert_eq!(normalise_angle(12.0), 12.0);
    }

    #[test]
    fn median_of_even_count_averages() {
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }
}
