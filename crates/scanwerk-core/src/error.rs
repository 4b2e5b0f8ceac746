// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Scanwerk.

use thiserror::Error;

/// Top-level error type for all Scanwerk operations.
#[derive(Debug, Error)]
pub enum ScanError {
    // -- Input --
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Detection --
    #[error("no document candidate found")]
    NoCandidateFound,

    #[error("aspect ratio mismatch: expected {expected:.3}, detected {detected:.3}")]
    AspectRatioMismatch { expected: f64, detected: f64 },

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("strategy {strategy} failed: {reason}")]
    StrategyFault { strategy: String, reason: String },

    // -- Catalog / configuration --
    #[error("unknown document type: {0}")]
    UnknownDocumentType(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScanError {
    /// Whether the error only means "nothing usable here, try the next thing".
    ///
    /// Recoverable errors end a candidate or a strategy quietly; everything
    /// else is a fault worth reporting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoCandidateFound
                | Self::AspectRatioMismatch { .. }
                | Self::DegenerateGeometry(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanError>;
