// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan module: the strategy-driven scanner and post-processing of its output.

pub mod enhance;
pub mod scanner;

pub use enhance::{binarize, binarize_otsu, estimate_skew, is_skewed};
pub use scanner::{AttemptOutcome, RectifiedDocument, ScanReport, Scanner, StrategyAttempt};
