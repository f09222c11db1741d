// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decodes captured photos into RGBA and turns extracted
// regions into PNG payloads, using the `image` crate.

use image::{DynamicImage, ImageFormat, RgbaImage, imageops};
use marginalia_core::error::MarginaliaError;
use marginalia_core::{NormRect, PixelRect};
use tracing::{debug, info, instrument};

/// A decoded photo held as RGBA, the layout every pixel stage reads.
///
/// Crops borrow the source and return a new `ImageProcessor`, so one decoded
/// photo can feed any number of region payloads.
///
/// ```ignore
/// let photo = ImageProcessor::from_bytes(&bytes)?;
/// let png = photo.crop_normalized(&region).to_png_bytes()?;
/// ```
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    image: RgbaImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, MarginaliaError> {
        let img = image::load_from_memory(data).map_err(|err| {
            MarginaliaError::ImageError(format!("failed to decode image: {}", err))
        })?;
        info!(width = img.width(), height = img.height(), "Photo decoded");
        Ok(Self::from_dynamic(img))
    }

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, MarginaliaError> {
        let img = image::open(path.as_ref()).map_err(|err| {
            MarginaliaError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "Photo loaded");
        Ok(Self::from_dynamic(img))
    }

    /// Convert an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            image: image.to_rgba8(),
        }
    }

    /// Wrap an RGBA buffer (e.g. a masked highlight render).
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    // -- Cropping -------------------------------------------------------------

    /// Crop a native pixel rectangle. Edges are snapped outwards to whole
    /// pixels and clamped to the image bounds; the crop is never empty.
    #[instrument(skip(self))]
    pub fn crop(&self, rect: &PixelRect) -> Self {
        let (img_w, img_h) = self.image.dimensions();

        let x = (rect.x.floor().max(0.0) as u32).min(img_w.saturating_sub(1));
        let y = (rect.y.floor().max(0.0) as u32).min(img_h.saturating_sub(1));
        let right = (rect.right().ceil().max(0.0) as u32).clamp(x + 1, img_w.max(x + 1));
        let bottom = (rect.bottom().ceil().max(0.0) as u32).clamp(y + 1, img_h.max(y + 1));
        let (w, h) = (right - x, bottom - y);

        debug!(x, y, w, h, "Cropping region");
        Self {
            image: imageops::crop_imm(&self.image, x, y, w, h).to_image(),
        }
    }

    /// Crop a normalized region (as emitted by the region assembler).
    pub fn crop_normalized(&self, region: &NormRect) -> Self {
        let (w, h) = (self.image.width() as f32, self.image.height() as f32);
        let rect = PixelRect::new(
            region.x * w,
            region.y * h,
            region.width * w,
            region.height * h,
        );
        self.crop(&rect)
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, MarginaliaError> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| MarginaliaError::ImageError(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Write the image to a file. The format is inferred from the file extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), MarginaliaError> {
        self.image.save(path.as_ref()).map_err(|err| {
            MarginaliaError::ImageError(format!(
                "failed to save image to {}: {}",
                path.as_ref().display(),
                err
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample() -> ImageProcessor {
        ImageProcessor::from_rgba(RgbaImage::from_pixel(200, 100, Rgba([10, 20, 30, 255])))
    }

    #[test]
    fn crop_normalized_uses_native_size() {
        let cropped = sample().crop_normalized(&NormRect::new(0.25, 0.5, 0.5, 0.25));
        assert_eq!((cropped.width(), cropped.height()), (100, 25));
    }

    #[test]
    fn crop_is_clamped_to_bounds() {
        let cropped = sample().crop(&PixelRect::new(180.0, 90.0, 50.0, 50.0));
        assert_eq!((cropped.width(), cropped.height()), (20, 10));
    }

    #[test]
    fn png_round_trip_decodes() {
        let png = sample().to_png_bytes().unwrap();
        let decoded = ImageProcessor::from_bytes(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 100));
    }

    #[test]
    fn garbage_bytes_are_an_image_error() {
        let err = ImageProcessor::from_bytes(b"not an image").err().unwrap();
        assert!(matches!(err, MarginaliaError::ImageError(_)));
    }
}
