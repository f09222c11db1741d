// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ink mask builder — luminance extraction, contrast boost, adaptive or fixed
// thresholding, and neighbour-count denoising over an analysis window.

use image::RgbaImage;
use marginalia_core::PixelRect;
use marginalia_core::config::MaskConfig;
use tracing::{debug, instrument};

/// Lower and upper bounds for the adaptive threshold.
const MIN_ADAPTIVE_THRESHOLD: f32 = 40.0;
const MAX_ADAPTIVE_THRESHOLD: f32 = 220.0;

/// An integer pixel window into the native bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Window {
    /// Snap a float rectangle outwards to whole pixels and clip it to an
    /// image of `image_w` x `image_h`. `None` if nothing remains.
    pub fn from_rect(rect: &PixelRect, image_w: u32, image_h: u32) -> Option<Self> {
        let left = rect.x.floor().max(0.0) as u32;
        let top = rect.y.floor().max(0.0) as u32;
        let right = (rect.right().ceil().max(0.0) as u32).min(image_w);
        let bottom = (rect.bottom().ceil().max(0.0) as u32).min(image_h);
        if right <= left || bottom <= top {
            return None;
        }
        Some(Self {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        })
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Binary ink/background classification of one analysis window.
///
/// Coordinates passed to the accessors are local to the window.
#[derive(Debug, Clone)]
pub struct InkMask {
    window: Window,
    /// One byte per pixel, row-major: 1 = ink, 0 = background.
    data: Vec<u8>,
    ink_count: usize,
    mean_luminance: f32,
}

impl InkMask {
    /// Classify every pixel of `window` in `image` as ink or background.
    ///
    /// The window must lie inside the image (use [`Window::from_rect`]).
    #[instrument(skip(image, config), fields(x = window.x, y = window.y, w = window.width, h = window.height))]
    pub fn build(image: &RgbaImage, window: Window, config: &MaskConfig) -> Self {
        let (w, h) = (window.width as usize, window.height as usize);
        let mut luminance = Vec::with_capacity(w * h);
        let mut sum = 0.0f64;

        for y in 0..window.height {
            for x in 0..window.width {
                let image::Rgba([r, g, b, _]) = *image.get_pixel(window.x + x, window.y + y);
                let l = 0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32;
                let adjusted = ((l - 128.0) * config.contrast + 128.0).clamp(0.0, 255.0);
                sum += adjusted as f64;
                luminance.push(adjusted);
            }
        }

        let mean_luminance = if luminance.is_empty() {
            255.0
        } else {
            (sum / luminance.len() as f64) as f32
        };

        let threshold = if config.adaptive {
            (mean_luminance - config.adaptive_offset)
                .clamp(MIN_ADAPTIVE_THRESHOLD, MAX_ADAPTIVE_THRESHOLD)
        } else {
            config.fixed_threshold
        };

        let mut data: Vec<u8> = luminance
            .iter()
            .map(|&l| u8::from(l < threshold))
            .collect();

        if config.denoise && config.min_neighbors > 0 {
            data = denoise(&data, w, h, config.min_neighbors);
        }

        let ink_count = data.iter().filter(|&&v| v == 1).count();
        debug!(threshold, mean_luminance, ink_count, "Ink mask built");

        Self {
            window,
            data,
            ink_count,
            mean_luminance,
        }
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn width(&self) -> u32 {
        self.window.width
    }

    pub fn height(&self) -> u32 {
        self.window.height
    }

    pub fn ink_count(&self) -> usize {
        self.ink_count
    }

    /// Mean contrast-adjusted luminance of the window.
    pub fn mean_luminance(&self) -> f32 {
        self.mean_luminance
    }

    /// Share of window pixels classified as ink.
    pub fn coverage(&self) -> f32 {
        if self.data.is_empty() {
            0.0
        } else {
            self.ink_count as f32 / self.data.len() as f32
        }
    }

    /// Whether the local pixel (x, y) is ink. Out-of-window reads are background.
    pub fn is_ink(&self, x: u32, y: u32) -> bool {
        x < self.window.width
            && y < self.window.height
            && self.data[(y * self.window.width + x) as usize] == 1
    }

    /// Convert a native rectangle into this window's local pixel space.
    pub fn local_rect(&self, rect: &PixelRect) -> PixelRect {
        PixelRect::new(
            rect.x - self.window.x as f32,
            rect.y - self.window.y as f32,
            rect.width,
            rect.height,
        )
    }

    /// Convert a local rectangle back into native pixel space.
    pub fn native_rect(&self, rect: &PixelRect) -> PixelRect {
        PixelRect::new(
            rect.x + self.window.x as f32,
            rect.y + self.window.y as f32,
            rect.width,
            rect.height,
        )
    }

    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |r| r.len()) as u32;
        let data: Vec<u8> = rows
            .iter()
            .flat_map(|r| r.bytes().map(|b| u8::from(b == b'#')))
            .collect();
        let ink_count = data.iter().filter(|&&v| v == 1).count();
        Self {
            window: Window {
                x: 0,
                y: 0,
                width,
                height,
            },
            data,
            ink_count,
            mean_luminance: 255.0,
        }
    }
}

/// Keep an ink pixel only when at least `min_neighbors` of its eight
/// neighbours are ink. Reads the input mask, writes a fresh one.
fn denoise(data: &[u8], w: usize, h: usize, min_neighbors: u8) -> Vec<u8> {
    let mut out = vec![0u8; data.len()];
    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            if data[idx] == 0 {
                continue;
            }
            let mut neighbors = 0u8;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                        continue;
                    }
                    neighbors += data[ny as usize * w + nx as usize];
                }
            }
            if neighbors >= min_neighbors {
                out[idx] = 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn full_window(img: &RgbaImage) -> Window {
        Window {
            x: 0,
            y: 0,
            width: img.width(),
            height: img.height(),
        }
    }

    #[test]
    fn blank_window_has_no_ink() {
        let img = RgbaImage::from_pixel(40, 30, WHITE);
        let mask = InkMask::build(&img, full_window(&img), &MaskConfig::default());
        assert_eq!(mask.ink_count(), 0);
        assert_eq!(mask.coverage(), 0.0);
        assert!(mask.mean_luminance() > 250.0);
    }

    #[test]
    fn dark_block_is_ink() {
        let mut img = RgbaImage::from_pixel(40, 30, WHITE);
        for y in 10..20 {
            for x in 10..30 {
                img.put_pixel(x, y, BLACK);
            }
        }
        let mask = InkMask::build(&img, full_window(&img), &MaskConfig::default());
        assert_eq!(mask.ink_count(), 200);
        assert!(mask.is_ink(15, 15));
        assert!(!mask.is_ink(5, 5));
        assert!(!mask.is_ink(100, 100));
    }

    #[test]
    fn isolated_speck_is_removed_by_denoise() {
        let mut img = RgbaImage::from_pixel(20, 20, WHITE);
        img.put_pixel(5, 5, BLACK);
        let window = full_window(&img);

        let mask = InkMask::build(&img, window, &MaskConfig::default());
        assert_eq!(mask.ink_count(), 0);

        let raw = MaskConfig {
            denoise: false,
            ..MaskConfig::default()
        };
        let mask = InkMask::build(&img, window, &raw);
        assert_eq!(mask.ink_count(), 1);
    }

    #[test]
    fn fixed_threshold_ignores_window_mean() {
        let img = RgbaImage::from_pixel(10, 10, Rgba([120, 120, 120, 255]));
        let config = MaskConfig {
            adaptive: false,
            fixed_threshold: 140.0,
            contrast: 1.0,
            ..MaskConfig::default()
        };
        let mask = InkMask::build(&img, full_window(&img), &config);
        assert_eq!(mask.ink_count(), 100);

        // Adaptive mode sees a uniform grey page as background.
        let adaptive = MaskConfig {
            contrast: 1.0,
            ..MaskConfig::default()
        };
        let mask = InkMask::build(&img, full_window(&img), &adaptive);
        assert_eq!(mask.ink_count(), 0);
    }

    #[test]
    fn window_is_offset_into_image() {
        let mut img = RgbaImage::from_pixel(50, 50, WHITE);
        for y in 30..34 {
            for x in 30..34 {
                img.put_pixel(x, y, BLACK);
            }
        }
        let window = Window::from_rect(&PixelRect::new(25.0, 25.0, 20.0, 20.0), 50, 50).unwrap();
        let mask = InkMask::build(&img, window, &MaskConfig::default());
        assert!(mask.is_ink(5, 5));
        assert_eq!(mask.ink_count(), 16);
        let native = mask.native_rect(&PixelRect::new(5.0, 5.0, 4.0, 4.0));
        assert_eq!(native, PixelRect::new(30.0, 30.0, 4.0, 4.0));
    }

    #[test]
    fn window_from_rect_clips_to_image() {
        let w = Window::from_rect(&PixelRect::new(-10.5, 5.2, 30.0, 100.0), 40, 50).unwrap();
        assert_eq!(w, Window { x: 0, y: 5, width: 20, height: 45 });
        assert!(Window::from_rect(&PixelRect::new(60.0, 0.0, 5.0, 5.0), 40, 50).is_none());
    }
}
