// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Primary strategy: colour-model segmentation, then contour analysis.

use image::DynamicImage;
use scanwerk_core::config::ScanConfig;
use scanwerk_core::error::Result;
use scanwerk_core::DocumentProfile;
use tracing::{debug, instrument};

use super::{DetectionStrategy, rectify_best_contour};
use crate::detect::{BoundaryExtractor, QuadrilateralSelector, Segmenter, Stage, StageObserver};
use crate::image::{WorkingImage, apply_mask};
use crate::scan::RectifiedDocument;

/// Segment the document from a rectangular prior and trace its outline.
#[derive(Debug, Clone)]
pub struct GrabCutStrategy {
    working_height: u32,
    segmenter: Segmenter,
    extractor: BoundaryExtractor,
    selector: QuadrilateralSelector,
}

impl GrabCutStrategy {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            working_height: config.working_height,
            segmenter: Segmenter::new(config.segmentation.clone()),
            extractor: BoundaryExtractor::new(config.boundary.clone()),
            selector: QuadrilateralSelector::new(config.selection.clone()),
        }
    }
}

impl DetectionStrategy for GrabCutStrategy {
    fn name(&self) -> &str {
        "grab-cut"
    }

    #[instrument(skip_all, fields(strategy = "grab-cut"))]
    fn detect(
        &self,
        image: &DynamicImage,
        profile: Option<&DocumentProfile>,
        observer: &mut dyn StageObserver,
    ) -> Result<RectifiedDocument> {
        let working = WorkingImage::new(image, self.working_height)?;
        let mask = self.segmenter.segment(working.rgb())?;
        let masked = DynamicImage::ImageRgb8(apply_mask(working.rgb(), &mask));
        observer.on_stage(Stage::Segmentation, &masked);

        let contours = self.extractor.extract_observed(&masked, observer);
        debug!(contours = contours.len(), "Foreground outlines traced");

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
