// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The scanner: runs detection strategies in order until one succeeds.

use image::DynamicImage;
use scanwerk_core::config::ScanConfig;
use scanwerk_core::error::{Result, ScanError};
use scanwerk_core::{DocumentProfile, OrderedCorners, QuadCandidate};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::enhance::is_skewed;
use crate::detect::{NoopObserver, StageObserver};
use crate::strategy::{DetectionStrategy, build_strategies};

/// A located and rectified document.
#[derive(Debug, Clone)]
pub struct RectifiedDocument {
    /// Top-down image of the document alone.
    pub image: DynamicImage,
    /// Source corners the warp used, in original-image coordinates.
    pub corners: OrderedCorners,
    /// Output `(width, height)`.
    pub size: (u32, u32),
    pub candidate: QuadCandidate,
    /// Name of the strategy that found it.
    pub strategy: String,
    /// Skew annotation, present when a skew threshold is configured.
    pub skewed: Option<bool>,
}

/// What one strategy did during a scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum AttemptOutcome {
    Detected,
    NothingFound { reason: String },
    Fault { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyAttempt {
    pub strategy: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

/// Per-strategy record of a scan plus the document, if any.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub attempts: Vec<StrategyAttempt>,
    #[serde(skip)]
    pub document: Option<RectifiedDocument>,
}

impl ScanReport {
    /// Strategy that produced the document.
    pub fn detected_by(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.strategy.as_str())
    }

    /// Attempts that ended in a fault rather than a clean miss.
    pub fn faults(&self) -> impl Iterator<Item = &StrategyAttempt> {
        self.attempts
            .iter()
            .filter(|a| matches!(a.outcome, AttemptOutcome::Fault { .. }))
    }

    pub fn into_document(self) -> Option<RectifiedDocument> {
        self.document
    }
}

/// Runs the configured strategies against an image.
///
/// Holds no per-scan state, so one scanner can serve many threads.
pub struct Scanner {
    config: ScanConfig,
    strategies: Vec<Box<dyn DetectionStrategy>>,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("Scanner")
            .field("config", &self.config)
            .field("strategies", &names)
            .finish()
    }
}

impl Default for Scanner {
    fn default() -> Self {
        let config = ScanConfig::default();
        Self {
            strategies: build_strategies(&config),
            config,
        }
    }
}

impl Scanner {
    /// Validate `config` and register its strategies.
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            strategies: build_strategies(&config),
            config,
        })
    }

    /// Use caller-supplied strategies instead of the configured list.
    ///
    /// `config` is validated as in [`new`](Self::new).
    pub fn with_strategies(
        config: ScanConfig,
        strategies: Vec<Box<dyn DetectionStrategy>>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, strategies })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Locate and rectify the document, if any strategy finds one.
    pub fn scan(
        &self,
        image: &DynamicImage,
        profile: Option<&DocumentProfile>,
    ) -> Option<RectifiedDocument> {
        self.scan_with_report(image, profile).into_document()
    }

    /// [`scan`](Self::scan), keeping the per-strategy record.
    pub fn scan_with_report(
        &self,
        image: &DynamicImage,
        profile: Option<&DocumentProfile>,
    ) -> ScanReport {
        self.scan_observed(image, profile, &mut NoopObserver)
    }

    /// [`scan_with_report`](Self::scan_with_report), reporting intermediate
    /// images to `observer`.
    #[instrument(skip_all, fields(
        width = image.width(),
        height = image.height(),
        document = profile.map(|p| p.id.as_str()),
    ))]
    pub fn scan_observed(
        &self,
        image: &DynamicImage,
        profile: Option<&DocumentProfile>,
        observer: &mut dyn StageObserver,
    ) -> ScanReport {
        let mut report = ScanReport::default();

        for strategy in &self.strategies {
            let name = strategy.name();
            info!(strategy = name, "Trying detection strategy");

            match strategy.detect(image, profile, observer) {
                Ok(mut document) => {
                    if let Some(threshold) = self.config.skew_threshold_degrees {
                        document.skewed = Some(is_skewed(&document.image, threshold));
                    }
                    info!(
                        strategy = name,
                        width = document.size.0,
                        height = document.size.1,
                        source = %document.candidate.source,
                        skewed = ?document.skewed,
                        "Document detected"
                    );
                    report.attempts.push(StrategyAttempt {
                        strategy: name.to_string(),
                        outcome: AttemptOutcome::Detected,
                    });
                    report.document = Some(document);
                    return report;
                }
                Err(err) if err.is_recoverable() => {
                    info!(strategy = name, reason = %err, "Strategy found no document");
                    report.attempts.push(StrategyAttempt {
                        strategy: name.to_string(),
                        outcome: AttemptOutcome::NothingFound {
                            reason: err.to_string(),
                        },
                    });
                }
                Err(err) => {
                    let fault = ScanError::StrategyFault {
                        strategy: name.to_string(),
                        reason: err.to_string(),
                    };
                    warn!(error = %fault, "Strategy failed; trying the next one");
                    report.attempts.push(StrategyAttempt {
                        strategy: name.to_string(),
                        outcome: AttemptOutcome::Fault {
                            reason: err.to_string(),
                        },
                    });
                }
            }
        }

        info!(attempts = report.attempts.len(), "No document detected");
        report
    }
}
