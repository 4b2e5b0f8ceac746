// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: loading, working-resolution scaling and masking.

pub mod processor;

pub use processor::{WorkingImage, apply_mask, decode_image, ensure_usable, load_image};
