// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk core types, document profiles, configuration and error
// definitions shared across all crates.

pub mod catalog;
pub mod config;
pub mod error;
pub mod types;

pub use catalog::{DocumentCatalog, DocumentProfile};
pub use config::ScanConfig;
pub use error::ScanError;
pub use types::*;
