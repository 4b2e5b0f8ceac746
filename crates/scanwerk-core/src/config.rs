// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// Detection strategies the scanner can run, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Colour-model segmentation followed by contour analysis.
    GrabCut,
    /// Adaptive threshold followed by contour analysis.
    AdaptiveThreshold,
    /// Dominant straight edges from the Hough transform.
    HoughLines,
}

/// Top-level scanner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Height (px) images are scaled to before detection.
    pub working_height: u32,
    pub segmentation: SegmentationConfig,
    pub boundary: BoundaryConfig,
    pub selection: SelectionConfig,
    pub binarize: BinarizeConfig,
    /// Strategies to try, first to last.
    pub strategies: Vec<StrategyKind>,
    /// When set, returned documents are annotated with a skew check at this
    /// threshold. Never affects acceptance.
    pub skew_threshold_degrees: Option<f32>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            working_height: 500,
            segmentation: SegmentationConfig::default(),
            boundary: BoundaryConfig::default(),
            selection: SelectionConfig::default(),
            binarize: BinarizeConfig::default(),
            strategies: vec![
                StrategyKind::GrabCut,
                StrategyKind::AdaptiveThreshold,
                StrategyKind::HoughLines,
            ],
            skew_threshold_degrees: None,
        }
    }
}

impl ScanConfig {
    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings no stage can work with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(ScanError::InvalidConfig(msg.to_string()));

        if self.working_height < 32 {
            return invalid("working_height must be at least 32");
        }
        if self.segmentation.iterations == 0 {
            return invalid("segmentation.iterations must be positive");
        }
        if self.segmentation.components == 0 {
            return invalid("segmentation.components must be positive");
        }
        if self.segmentation.margin * 2 >= self.working_height {
            return invalid("segmentation.margin leaves no room for the foreground prior");
        }
        if self.boundary.max_candidates == 0 {
            return invalid("boundary.max_candidates must be positive");
        }
        if !(0.0..1.0).contains(&self.boundary.min_area_fraction) {
            return invalid("boundary.min_area_fraction must be in [0, 1)");
        }
        if self.boundary.canny_low > self.boundary.canny_high {
            return invalid("boundary.canny_low must not exceed canny_high");
        }
        if !(self.selection.epsilon_fraction > 0.0) {
            return invalid("selection.epsilon_fraction must be positive");
        }
        if !(self.selection.aspect_tolerance > 0.0) {
            return invalid("selection.aspect_tolerance must be positive");
        }
        if self.binarize.block_size < 3 || self.binarize.block_size % 2 == 0 {
            return invalid("binarize.block_size must be odd and at least 3");
        }
        if self.strategies.is_empty() {
            return invalid("at least one strategy must be configured");
        }
        Ok(())
    }
}

/// Foreground/background segmentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Inset (px, at working resolution) of the probable-foreground rectangle.
    pub margin: u32,
    /// Model refit / relabel rounds.
    pub iterations: u32,
    /// Gaussian components per colour model.
    pub components: usize,
    /// Weight of the neighbour agreement term.
    pub smoothness: f64,
    /// Conditional-mode sweeps per round.
    pub refine_sweeps: u32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            margin: 10,
            iterations: 5,
            components: 5,
            smoothness: 50.0,
            refine_sweeps: 2,
        }
    }
}

/// Candidate boundary extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Grey level separating masked-out black from foreground.
    pub foreground_cutoff: u8,
    pub canny_low: f32,
    pub canny_high: f32,
    /// How many of the largest contours are kept.
    pub max_candidates: usize,
    /// Contours enclosing less than this fraction of the frame are dropped.
    pub min_area_fraction: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            foreground_cutoff: 10,
            canny_low: 75.0,
            canny_high: 200.0,
            max_candidates: 5,
            min_area_fraction: 0.01,
        }
    }
}

/// Quadrilateral scoring settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Polygon simplification tolerance as a fraction of hull perimeter.
    pub epsilon_fraction: f64,
    /// Maximum absolute difference between detected and expected ratio.
    pub aspect_tolerance: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            epsilon_fraction: 0.02,
            aspect_tolerance: 0.15,
        }
    }
}

/// How the local threshold is averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdaptiveMethod {
    /// Box mean over the block.
    Mean,
    /// Gaussian-weighted mean over the block.
    Gaussian,
}

/// Adaptive binarization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinarizeConfig {
    /// Odd neighbourhood size in pixels.
    pub block_size: u32,
    /// Subtracted from the local mean before comparison.
    pub offset: i32,
    pub method: AdaptiveMethod,
}

impl Default for BinarizeConfig {
    fn default() -> Self {
        Self {
            block_size: 11,
            offset: 2,
            method: AdaptiveMethod::Gaussian,
        }
    }
}

impl BinarizeConfig {
    /// Half the block size, rounded down.
    pub fn block_radius(&self) -> u32 {
        self.block_size / 2
    }

    /// Gaussian sigma matching the block size (OpenCV's rule of thumb).
    pub fn sigma(&self) -> f32 {
        0.3 * ((self.block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = ScanConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.working_height, 500);
        assert_eq!(config.strategies[0], StrategyKind::GrabCut);
        assert!((config.selection.aspect_tolerance - 0.15).abs() < 1e-12);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = ScanConfig::from_json_str(
            r#"{"working_height": 400, "strategies": ["hough-lines"]}"#,
        )
        .expect("valid config");
        assert_eq!(config.working_height, 400);
        assert_eq!(config.strategies, vec![StrategyKind::HoughLines]);
        assert_eq!(config.segmentation.iterations, 5);
    }

    #[test]
    fn even_block_size_is_rejected() {
        let mut config = ScanConfig::default();
        config.binarize.block_size = 10;
        assert!(matches!(config.validate(), Err(ScanError::InvalidConfig(_))));
    }

    #[test]
    fn empty_strategy_list_is_rejected() {
        let config = ScanConfig {
            strategies: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn block_size_eleven_gives_sigma_two() {
        let config = BinarizeConfig::default();
        assert_eq!(config.block_radius(), 5);
        assert!((config.sigma() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        let json = ScanConfig::default().to_json_pretty().expect("serialize");
        file.write_all(json.as_bytes()).expect("write config");

        let loaded = ScanConfig::from_json_file(file.path()).expect("load config");
        assert_eq!(loaded, ScanConfig::default());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ScanConfig::from_json_file("/nonexistent/scanwerk.json").unwrap_err();
        assert!(matches!(err, ScanError::Io(_)));
    }
}
