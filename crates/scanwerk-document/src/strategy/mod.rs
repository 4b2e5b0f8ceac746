// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Detection strategies tried in turn by the scanner.

pub mod grabcut;
pub mod hough;
pub mod threshold;

pub use grabcut::GrabCutStrategy;
pub use hough::HoughLinesStrategy;
pub use threshold::AdaptiveThresholdStrategy;

use image::DynamicImage;
use scanwerk_core::config::{ScanConfig, StrategyKind};
use scanwerk_core::error::{Result, ScanError};
use scanwerk_core::{DocumentProfile, Point2, QuadCandidate};

use crate::detect::observer::{Stage, StageObserver, render_corners, render_outlines};
use crate::detect::{Contour, QuadrilateralSelector, Rectifier};
use crate::image::WorkingImage;
use crate::scan::RectifiedDocument;

/// One way of locating and rectifying a document.
///
/// `Err(NoCandidateFound)` (or another recoverable error) means nothing
/// usable was found; any other error is a fault in the strategy.
pub trait DetectionStrategy: Send + Sync {
    /// Stable identifier used in logs and reports.
    fn name(&self) -> &str;

    fn detect(
        &self,
        image: &DynamicImage,
        profile: Option<&DocumentProfile>,
        observer: &mut dyn StageObserver,
    ) -> Result<RectifiedDocument>;
}

/// Instantiate the strategies named in `config`, in order.
pub fn build_strategies(config: &ScanConfig) -> Vec<Box<dyn DetectionStrategy>> {
    config
        .strategies
        .iter()
        .map(|kind| -> Box<dyn DetectionStrategy> {
            match kind {
                StrategyKind::GrabCut => Box::new(GrabCutStrategy::new(config)),
                StrategyKind::AdaptiveThreshold => Box::new(AdaptiveThresholdStrategy::new(config)),
                StrategyKind::HoughLines => Box::new(HoughLinesStrategy::new(config)),
            }
        })
        .collect()
}

/// Select among ranked working-resolution contours, then rectify the
/// original image.
pub(crate) fn rectify_best_contour(
    strategy: &str,
    image: &DynamicImage,
    working: &WorkingImage,
    contours: &[Contour],
    selector: &QuadrilateralSelector,
    profile: Option<&DocumentProfile>,
    observer: &mut dyn StageObserver,
) -> Result<RectifiedDocument> {
    if observer.is_active() {
        let outlines: Vec<Vec<Point2>> = contours.iter().map(Contour::to_point2).collect();
        observer.on_stage(Stage::Contours, &render_outlines(working.rgb(), &outlines));
    }

    let candidate = selector
        .select(contours, working.inverse_scale(), profile)
        .ok_or(ScanError::NoCandidateFound)?;
    rectify_candidate(strategy, image, working, candidate, profile, observer)
}

/// Rectify an accepted candidate into the returned document.
pub(crate) fn rectify_candidate(
    strategy: &str,
    image: &DynamicImage,
    working: &WorkingImage,
    candidate: QuadCandidate,
    profile: Option<&DocumentProfile>,
    observer: &mut dyn StageObserver,
) -> Result<RectifiedDocument> {
    if observer.is_active() {
        let corners = candidate.points.map(|p| p.scaled(working.scale()));
        observer.on_stage(Stage::Corners, &render_corners(working.rgb(), &corners));
    }

    let rectified = Rectifier::rectify(image, &candidate.points, profile.map(|p| p.aspect_ratio));
    observer.on_stage(Stage::Rectified, &rectified.image);

    Ok(RectifiedDocument {
        image: rectified.image,
        corners: rectified.plan.corners,
        size: rectified.plan.size(),
        candidate,
        strategy: strategy.to_string(),
        skewed: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_registers_three_strategies_in_order() {
        let strategies = build_strategies(&ScanConfig::default());
        let names: Vec<&str> = strategies.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["grab-cut", "adaptive-threshold", "hough-lines"]);
    }

    #[test]
    fn configured_order_is_respected() {
        let config = ScanConfig {
            strategies: vec![StrategyKind::HoughLines, StrategyKind::GrabCut],
            ..ScanConfig::default()
        };
        let names: Vec<String> = build_strategies(&config)
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["hough-lines", "grab-cut"]);
    }

    #[test]
    fn strategies_are_thread_safe() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn DetectionStrategy>();
        assert_send_sync::<GrabCutStrategy>();
        assert_send_sync::<AdaptiveThresholdStrategy>();
        assert_send_sync::<HoughLinesStrategy>();
    }
}
