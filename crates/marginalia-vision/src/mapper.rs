// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Coordinate mapping between the (possibly scaled) drawing surface and the
// native resolution of the captured bitmap.
//
// Scale factors are derived from the sizes passed in on every construction
// and never cached: the drawing surface can be resized between calls.

use marginalia_core::{NormRect, PixelRect, Point};

/// Maps normalized annotation coordinates to native pixels and back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    native_w: f32,
    native_h: f32,
    rendered_w: f32,
    rendered_h: f32,
}

impl CoordinateMapper {
    /// Build a mapper for an image of `native` size drawn at `rendered` size.
    ///
    /// Returns `None` when any dimension is zero (e.g. the photo has not been
    /// laid out yet), so callers skip mapping instead of dividing by zero.
    pub fn new(native: (u32, u32), rendered: (f32, f32)) -> Option<Self> {
        let (native_w, native_h) = (native.0 as f32, native.1 as f32);
        let (rendered_w, rendered_h) = rendered;
        let usable = |v: f32| v.is_finite() && v > 0.0;
        if !(usable(native_w) && usable(native_h) && usable(rendered_w) && usable(rendered_h)) {
            return None;
        }
        Some(Self {
            native_w,
            native_h,
            rendered_w,
            rendered_h,
        })
    }

    /// `(sx, sy)`: native pixels per rendered pixel.
    pub fn scale_factors(&self) -> (f32, f32) {
        (
            self.native_w / self.rendered_w,
            self.native_h / self.rendered_h,
        )
    }

    /// The whole image as a native rectangle.
    pub fn image_bounds(&self) -> PixelRect {
        PixelRect::new(0.0, 0.0, self.native_w, self.native_h)
    }

    pub fn to_native(&self, rect: &NormRect) -> PixelRect {
        let (sx, sy) = self.scale_factors();
        PixelRect::new(
            rect.x * self.rendered_w * sx,
            rect.y * self.rendered_h * sy,
            rect.width * self.rendered_w * sx,
            rect.height * self.rendered_h * sy,
        )
    }

    pub fn point_to_native(&self, point: &Point) -> (f32, f32) {
        let (sx, sy) = self.scale_factors();
        (
            point.x * self.rendered_w * sx,
            point.y * self.rendered_h * sy,
        )
    }

    /// Convert a line width in display pixels to native pixels.
    pub fn line_width_to_native(&self, display_width: f32) -> f32 {
        let (sx, sy) = self.scale_factors();
        display_width * sx.max(sy)
    }

    pub fn to_normalized(&self, rect: &PixelRect) -> NormRect {
        NormRect::new(
            rect.x / self.native_w,
            rect.y / self.native_h,
            rect.width / self.native_w,
            rect.height / self.native_h,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn zero_rendered_size_yields_no_mapper() {
        assert!(CoordinateMapper::new((4000, 3000), (0.0, 300.0)).is_none());
        assert!(CoordinateMapper::new((0, 3000), (400.0, 300.0)).is_none());
    }

    #[test]
    fn scale_factors_follow_native_over_rendered() {
        let m = CoordinateMapper::new((4000, 3000), (400.0, 300.0)).unwrap();
        assert_eq!(m.scale_factors(), (10.0, 10.0));
        assert!(approx(m.line_width_to_native(6.0), 60.0));
    }

    #[test]
    fn to_native_scales_by_native_size() {
        let m = CoordinateMapper::new((2000, 1000), (500.0, 250.0)).unwrap();
        let r = m.to_native(&NormRect::new(0.25, 0.5, 0.5, 0.25));
        assert!(approx(r.x, 500.0));
        assert!(approx(r.y, 500.0));
        assert!(approx(r.width, 1000.0));
        assert!(approx(r.height, 250.0));
    }

    #[test]
    fn round_trip_is_stable() {
        let m = CoordinateMapper::new((3024, 4032), (390.0, 520.0)).unwrap();
        let rects = [
            NormRect::new(0.0, 0.0, 1.0, 1.0),
            NormRect::new(0.1234, 0.4321, 0.2, 0.05),
            NormRect::new(0.9, 0.95, 0.1, 0.05),
        ];
        for r in rects {
            let back = m.to_normalized(&m.to_native(&r));
            assert!(approx(back.x, r.x));
            assert!(approx(back.y, r.y));
            assert!(approx(back.width, r.width));
            assert!(approx(back.height, r.height));
        }
    }

    #[test]
    fn resize_changes_scale_but_not_native_mapping() {
        let small = CoordinateMapper::new((1000, 1000), (250.0, 250.0)).unwrap();
        let large = CoordinateMapper::new((1000, 1000), (800.0, 800.0)).unwrap();
        let r = NormRect::new(0.3, 0.3, 0.2, 0.2);
        assert_ne!(small.scale_factors(), large.scale_factors());
        assert!(approx(small.to_native(&r).x, large.to_native(&r).x));
    }
}
