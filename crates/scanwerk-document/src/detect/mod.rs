// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Detection stages: segmentation, boundary tracing, quad selection,
// corner ordering and rectification.

pub mod boundary;
pub mod corners;
pub mod observer;
pub mod rectify;
pub mod segment;
pub mod select;

pub use boundary::{BoundaryExtractor, Contour};
pub use corners::order_corners;
pub use observer::{NoopObserver, Stage, StageObserver, TracingObserver};
pub use rectify::{Rectified, RectificationPlan, Rectifier};
pub use segment::Segmenter;
pub use select::{QuadrilateralSelector, simplify_closed};
