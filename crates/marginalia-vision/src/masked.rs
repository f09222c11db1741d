// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Masked-image mode — a full-resolution copy of the photo where everything
// outside the (dilated) highlighter path is blanked to white.
//
// The stroke is redrawn at native scale as a thick rounded line by stamping
// filled discs along every segment, widened beyond its display width so
// glyphs the highlighter only partly covered stay intact.

use image::{GrayImage, Luma, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;
use marginalia_core::Stroke;
use marginalia_core::config::RegionConfig;
use tracing::{debug, instrument, warn};

use crate::mapper::CoordinateMapper;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Render `image` with every pixel outside the stroke path forced to white.
///
/// Returns `None` when the display size is not laid out or there are no
/// strokes.
#[instrument(skip_all, fields(strokes = strokes.len()))]
pub fn render_masked_highlight(
    image: &RgbaImage,
    rendered: (f32, f32),
    strokes: &[Stroke],
    config: &RegionConfig,
) -> Option<RgbaImage> {
    let Some(mapper) = CoordinateMapper::new(image.dimensions(), rendered) else {
        warn!(?rendered, "Display size not laid out; cannot mask highlight");
        return None;
    };
    if strokes.is_empty() {
        return None;
    }

    let path = stroke_path_mask(image.width(), image.height(), &mapper, strokes, config);
    let mut kept = 0usize;
    let masked = RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        if path.get_pixel(x, y).0[0] > 0 {
            kept += 1;
            *image.get_pixel(x, y)
        } else {
            BACKGROUND
        }
    });

    debug!(kept, "Masked highlight rendered");
    Some(masked)
}

/// Binary mask of the dilated stroke path at native resolution.
fn stroke_path_mask(
    width: u32,
    height: u32,
    mapper: &CoordinateMapper,
    strokes: &[Stroke],
    config: &RegionConfig,
) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    let on = Luma([255u8]);

    for stroke in strokes {
        let thickness = mapper.line_width_to_native(stroke.line_width()) + config.masked_extra_width_px;
        let radius = (thickness / 2.0).max(1.0);
        let step = (radius / 2.0).max(1.0);

        let points: Vec<(f32, f32)> = stroke
            .points()
            .iter()
            .map(|p| mapper.point_to_native(p))
            .collect();

        let mut stamp = |x: f32, y: f32| {
            draw_filled_circle_mut(
                &mut mask,
                (x.round() as i32, y.round() as i32),
                radius.round() as i32,
                on,
            );
        };

        if let [(x, y)] = points.as_slice() {
            stamp(*x, *y);
            continue;
        }
        for seg in points.windows(2) {
            let ((x0, y0), (x1, y1)) = (seg[0], seg[1]);
            let length = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
            let steps = (length / step).ceil().max(1.0) as u32;
            for i in 0..=steps {
                let t = i as f32 / steps as f32;
                stamp(x0 + (x1 - x0) * t, y0 + (y1 - y0) * t);
            }
        }
    }

    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginalia_core::Point;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, _| Rgba([(x % 200) as u8, 0, 0, 255]))
    }

    #[test]
    fn pixels_off_the_path_are_white() {
        let img = gradient(200, 100);
        let mut s = Stroke::begin(Point::new(0.1, 0.5), 4.0);
        s.push(Point::new(0.9, 0.5));

        let out =
            render_masked_highlight(&img, (200.0, 100.0), &[s], &RegionConfig::default()).unwrap();
        assert_eq!(out.dimensions(), (200, 100));
        // On the path: original pixel kept.
        assert_eq!(out.get_pixel(100, 50), img.get_pixel(100, 50));
        // Within the widened radius (4 + 12) / 2 = 8 px.
        assert_eq!(out.get_pixel(100, 57), img.get_pixel(100, 57));
        // Far away: blanked.
        assert_eq!(*out.get_pixel(100, 10), BACKGROUND);
        assert_eq!(*out.get_pixel(5, 50), BACKGROUND);
    }

    #[test]
    fn path_is_scaled_to_native_resolution() {
        let img = gradient(400, 200);
        let mut s = Stroke::begin(Point::new(0.25, 0.5), 4.0);
        s.push(Point::new(0.75, 0.5));
        // Drawn at half size: native width is 8 + 12 = 20 px, radius 10.
        let out =
            render_masked_highlight(&img, (200.0, 100.0), &[s], &RegionConfig::default()).unwrap();
        assert_eq!(out.get_pixel(200, 109), img.get_pixel(200, 109));
        assert_eq!(*out.get_pixel(200, 115), BACKGROUND);
    }

    #[test]
    fn single_point_stroke_keeps_a_dot() {
        let img = gradient(100, 100);
        let s = Stroke::begin(Point::new(0.5, 0.5), 2.0);
        let out =
            render_masked_highlight(&img, (100.0, 100.0), &[s], &RegionConfig::default()).unwrap();
        assert_eq!(out.get_pixel(50, 50), img.get_pixel(50, 50));
        assert_eq!(*out.get_pixel(80, 80), BACKGROUND);
    }

    #[test]
    fn unlaid_out_display_yields_none() {
        let img = gradient(10, 10);
        let s = Stroke::begin(Point::new(0.5, 0.5), 2.0);
        assert!(render_masked_highlight(&img, (0.0, 10.0), &[s], &RegionConfig::default()).is_none());
    }
}
