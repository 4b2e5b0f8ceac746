// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Physical document profiles and the read-only catalog that holds them.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// Physical description of a document type.
///
/// `aspect_ratio` (width / height) is what detection matches against. It is
/// stored separately from the millimetre size because published ratios are
/// often rounded or supplied without a size at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentProfile {
    pub id: String,
    pub name: String,
    pub width_mm: f64,
    pub height_mm: f64,
    pub aspect_ratio: f64,
    #[serde(default)]
    pub description: String,
}

impl DocumentProfile {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        width_mm: f64,
        height_mm: f64,
        aspect_ratio: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            width_mm,
            height_mm,
            aspect_ratio,
            description: description.into(),
        }
    }

    /// Ad hoc profile known only by its aspect ratio.
    pub fn with_aspect_ratio(id: impl Into<String>, aspect_ratio: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            width_mm: 0.0,
            height_mm: 0.0,
            aspect_ratio,
            description: String::new(),
        }
    }

    /// Portrait documents are taller than they are wide.
    pub fn is_portrait(&self) -> bool {
        self.aspect_ratio < 1.0
    }
}

/// Immutable table of document profiles.
///
/// Built once (from [`DocumentCatalog::builtin`] or JSON) and passed by
/// reference to whoever needs a lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentCatalog {
    profiles: Vec<DocumentProfile>,
}

impl DocumentCatalog {
    /// The built-in document types.
    pub fn builtin() -> Self {
        Self {
            profiles: vec![
                DocumentProfile::new(
                    "aadhaar",
                    "Aadhaar Card",
                    85.6,
                    53.98,
                    1.588,
                    "Indian National ID Card",
                ),
                DocumentProfile::new(
                    "pan",
                    "PAN Card",
                    85.6,
                    53.98,
                    1.588,
                    "Permanent Account Number Card",
                ),
                DocumentProfile::new("passport", "Passport", 125.0, 88.0, 1.42, "Passport"),
                DocumentProfile::new(
                    "a4",
                    "A4 Document",
                    210.0,
                    297.0,
                    0.707,
                    "Standard A4 Paper",
                ),
                DocumentProfile::new(
                    "visitCard",
                    "Visiting card Document",
                    89.0,
                    51.0,
                    1.74,
                    "Standard Visiting Card",
                ),
                DocumentProfile::new("usd", "US Dollar", 156.0, 66.3, 2.35, "Standard US Dollar"),
            ],
        }
    }

    /// Build a catalog from explicit profiles. Ids must be unique and every
    /// aspect ratio must be positive.
    pub fn from_profiles(profiles: Vec<DocumentProfile>) -> Result<Self> {
        for (i, profile) in profiles.iter().enumerate() {
            if !(profile.aspect_ratio.is_finite() && profile.aspect_ratio > 0.0) {
                return Err(ScanError::InvalidConfig(format!(
                    "profile {} has non-positive aspect ratio {}",
                    profile.id, profile.aspect_ratio
                )));
            }
            if profiles[..i].iter().any(|p| p.id == profile.id) {
                return Err(ScanError::InvalidConfig(format!(
                    "duplicate profile id {}",
                    profile.id
                )));
            }
        }
        Ok(Self { profiles })
    }

    /// Parse a JSON array of profiles.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let profiles: Vec<DocumentProfile> = serde_json::from_str(json)?;
        Self::from_profiles(profiles)
    }

    pub fn get(&self, id: &str) -> Option<&DocumentProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Like [`get`](Self::get) but unknown ids are an error.
    pub fn require(&self, id: &str) -> Result<&DocumentProfile> {
        self.get(id)
            .ok_or_else(|| ScanError::UnknownDocumentType(id.to_string()))
    }

    pub fn profiles(&self) -> &[DocumentProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for DocumentCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
