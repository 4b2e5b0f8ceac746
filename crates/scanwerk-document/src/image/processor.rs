// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image loading and the working-resolution copy every detector runs on.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use scanwerk_core::error::{Result, ScanError};
use tracing::{debug, info, instrument};

/// Load an image from a file path.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_image(path: impl AsRef<std::path::Path>) -> Result<DynamicImage> {
    let img = image::open(path.as_ref()).map_err(|err| {
        ScanError::InvalidImage(format!(
            "failed to open {}: {}",
            path.as_ref().display(),
            err
        ))
    })?;
    info!(width = img.width(), height = img.height(), "Image loaded");
    Ok(img)
}

/// Decode an image from raw encoded bytes (JPEG, PNG, etc.).
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    let img = image::load_from_memory(data)
        .map_err(|err| ScanError::InvalidImage(format!("failed to decode image: {}", err)))?;
    debug!(
        width = img.width(),
        height = img.height(),
        "Image decoded from bytes"
    );
    Ok(img)
}

/// Reject images no stage can work with.
pub fn ensure_usable(image: &DynamicImage) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ScanError::InvalidImage(format!(
            "image has no pixels ({}x{})",
            image.width(),
            image.height()
        )));
    }
    Ok(())
}

/// A colour copy of the input scaled to a fixed height.
///
/// Detection runs at this resolution so kernel sizes and margins behave the
/// same for every photo. `scale` maps original coordinates to working ones;
/// [`inverse_scale`](Self::inverse_scale) maps them back.
#[derive(Debug, Clone)]
pub struct WorkingImage {
    image: RgbImage,
    scale: f64,
}

impl WorkingImage {
    /// Scale `source` proportionally to `target_height` rows.
    #[instrument(skip(source), fields(src_w = source.width(), src_h = source.height()))]
    pub fn new(source: &DynamicImage, target_height: u32) -> Result<Self> {
        ensure_usable(source)?;
        if target_height == 0 {
            return Err(ScanError::InvalidConfig(
                "working height must be positive".into(),
            ));
        }

        let scale = target_height as f64 / source.height() as f64;
        let width = ((source.width() as f64 * scale).round() as u32).max(1);
        let rgb = source.to_rgb8();
        let image = if width == rgb.width() && target_height == rgb.height() {
            rgb
        } else {
            imageops::resize(&rgb, width, target_height, FilterType::Triangle)
        };

        debug!(width, height = target_height, scale, "Working image prepared");
        Ok(Self { image, scale })
    }

    pub fn rgb(&self) -> &RgbImage {
        &self.image
    }

    /// Luma copy of the working image.
    pub fn gray(&self) -> GrayImage {
        DynamicImage::ImageRgb8(self.image.clone()).to_luma8()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Original → working.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Working → original.
    pub fn inverse_scale(&self) -> f64 {
        1.0 / self.scale
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageRgb8(self.image.clone())
    }
}

/// Keep the original pixels where `mask` is set and paint the rest black.
pub fn apply_mask(image: &RgbImage, mask: &GrayImage) -> RgbImage {
    debug_assert_eq!(image.dimensions(), mask.dimensions());
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        if mask.get_pixel(x, y).0[0] > 0 {
            *image.get_pixel(x, y)
        } else {
            Rgb([0, 0, 0])
        }
    })
}
