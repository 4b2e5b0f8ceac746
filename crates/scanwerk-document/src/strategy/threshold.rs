// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fallback strategy: adaptive threshold instead of colour segmentation.

use image::DynamicImage;
use imageproc::filter::gaussian_blur_f32;
use scanwerk_core::config::{AdaptiveMethod, BinarizeConfig, BoundaryConfig, ScanConfig};
use scanwerk_core::error::Result;
use scanwerk_core::DocumentProfile;
use tracing::{debug, instrument};

use super::{DetectionStrategy, rectify_best_contour};
use crate::detect::{BoundaryExtractor, QuadrilateralSelector, Stage, StageObserver};
use crate::image::WorkingImage;
use crate::scan::RectifiedDocument;
use crate::scan::enhance::adaptive_threshold;

/// Pre-threshold blur, equivalent to a 5x5 kernel.
const BLUR_SIGMA: f32 = 1.1;

/// Binarise by local contrast and trace the resulting outlines.
///
/// Cheaper than segmentation and tolerant of uneven lighting, at the cost of
/// picking up more clutter; the area floor is raised to compensate.
#[derive(Debug, Clone)]
pub struct AdaptiveThresholdStrategy {
    working_height: u32,
    threshold: BinarizeConfig,
    extractor: BoundaryExtractor,
    selector: QuadrilateralSelector,
}

impl AdaptiveThresholdStrategy {
    pub fn new(config: &ScanConfig) -> Self {
        let boundary = BoundaryConfig {
            canny_low: 50.0,
            canny_high: 150.0,
            min_area_fraction: config.boundary.min_area_fraction.max(0.05),
            ..config.boundary.clone()
        };
        Self {
            working_height: config.working_height,
            threshold: BinarizeConfig {
                block_size: 11,
                offset: 2,
                method: AdaptiveMethod::Gaussian,
            },
            extractor: BoundaryExtractor::new(boundary),
            selector: QuadrilateralSelector::new(config.selection.clone()),
        }
    }
}

impl DetectionStrategy for AdaptiveThresholdStrategy {
    fn name(&self) -> &str {
        "adaptive-threshold"
    }

    #[instrument(skip_all, fields(strategy = "adaptive-threshold"))]
    fn detect(
        &self,
        image: &DynamicImage,
        profile: Option<&DocumentProfile>,
        observer: &mut dyn StageObserver,
    ) -> Result<RectifiedDocument> {
        let working = WorkingImage::new(image, self.working_height)?;
        let blurred = gaussian_blur_f32(&working.gray(), BLUR_SIGMA);
        let binary = adaptive_threshold(&blurred, &self.threshold);
        if observer.is_active() {
            observer.on_stage(Stage::Segmentation, &DynamicImage::ImageLuma8(binary.clone()));
        }

        let contours = self.extractor.trace_observed(&binary, observer);
        debug!(contours = contours.len(), "Threshold outlines traced");

        rectify_best_contour(
            self.name(),
            image,
            &working,
            &contours,
            &self.selector,
            profile,
            observer,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::NoopObserver;
    use crate::test_support::document_on_background;
    use image::{GrayImage, Luma};
    use scanwerk_core::error::ScanError;

    #[test]
    fn uses_gaussian_threshold_and_higher_area_floor() {
        let strategy = AdaptiveThresholdStrategy::new(&ScanConfig::default());
        assert_eq!(strategy.threshold.block_size, 11);
        assert_eq!(strategy.threshold.offset, 2);
        assert_eq!(strategy.threshold.method, AdaptiveMethod::Gaussian);

        // 40x40 is 4% of the frame: above the default floor, below this one.
        let mut binary = GrayImage::new(200, 200);
        for y in 80..120 {
            for x in 80..120 {
                binary.put_pixel(x, y, Luma([255]));
            }
        }
        let default_extractor = BoundaryExtractor::new(BoundaryConfig::default());
        assert_eq!(default_extractor.trace_candidates(&binary).len(), 1);
        assert!(strategy.extractor.trace_candidates(&binary).is_empty());
    }

    #[test]
    fn finds_high_contrast_sheet() {
        let image = DynamicImage::ImageRgb8(document_on_background(400, 500, (100, 100, 300, 400)));
        let strategy = AdaptiveThresholdStrategy::new(&ScanConfig::default());
        let doc = strategy
            .detect(&image, None, &mut NoopObserver)
            .expect("sheet outline is traced");
        assert_eq!(doc.strategy, "adaptive-threshold");
        assert!(doc.size.1 > doc.size.0);
    }

    #[test]
    fn flat_image_yields_no_candidate() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(200, 200, Luma([128])));
        let strategy = AdaptiveThresholdStrategy::new(&ScanConfig::default());
        assert!(matches!(
            strategy.detect(&image, None, &mut NoopObserver),
            Err(ScanError::NoCandidateFound)
        ));
    }
}
