// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Component refiner — 8-connected flood fill over the ink mask to find
// glyph blobs, then a single tight box around the blobs that belong to the
// user's highlight.
//
// The fill uses an explicit stack and a bit array sized to the mask window,
// so large ink regions never recurse and never hash.

use marginalia_core::PixelRect;
use marginalia_core::config::ComponentConfig;
use tracing::debug;

use crate::mask::{InkMask, Window};

/// Inclusive pixel bounds, local to the mask window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl PixelBounds {
    fn at(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn extend(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn to_rect(&self) -> PixelRect {
        PixelRect::from_edges(
            self.min_x as f32,
            self.min_y as f32,
            (self.max_x + 1) as f32,
            (self.max_y + 1) as f32,
        )
    }
}

/// One connected ink blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Component {
    pub bounds: PixelBounds,
    pub pixel_count: u32,
}

impl Component {
    /// Share of this component's width lying inside `left..right`.
    pub fn horizontal_overlap(&self, left: f32, right: f32) -> f32 {
        let c_left = self.bounds.min_x as f32;
        let c_right = (self.bounds.max_x + 1) as f32;
        let shared = (right.min(c_right) - left.max(c_left)).max(0.0);
        shared / self.bounds.width() as f32
    }
}

/// Fixed-size visited set over the mask window.
struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
        }
    }

    /// Set the bit; returns `true` if it was previously clear.
    fn insert(&mut self, idx: usize) -> bool {
        let (word, bit) = (idx / 64, 1u64 << (idx % 64));
        let fresh = self.words[word] & bit == 0;
        self.words[word] |= bit;
        fresh
    }
}

/// Find every component with at least one pixel inside `roi`.
///
/// Growth is confined to `limit` (which should contain `roi`), so a blob
/// seeded in the ROI is captured whole up to that limit. Both rectangles are
/// local to the mask window.
pub fn find_components(mask: &InkMask, roi: &PixelRect, limit: &PixelRect) -> Vec<Component> {
    let (Some(roi), Some(limit)) = (
        Window::from_rect(roi, mask.width(), mask.height()),
        Window::from_rect(limit, mask.width(), mask.height()),
    ) else {
        return Vec::new();
    };

    let width = mask.width() as usize;
    let mut visited = BitSet::new(mask.window().area());
    let mut stack: Vec<(u32, u32)> = Vec::new();
    let mut components = Vec::new();

    let in_limit = |x: i64, y: i64| {
        x >= limit.x as i64
            && y >= limit.y as i64
            && x < (limit.x + limit.width) as i64
            && y < (limit.y + limit.height) as i64
    };

    for sy in roi.y..roi.y + roi.height {
        for sx in roi.x..roi.x + roi.width {
            if !mask.is_ink(sx, sy) || !visited.insert(sy as usize * width + sx as usize) {
                continue;
            }

            let mut bounds = PixelBounds::at(sx, sy);
            let mut pixel_count = 0u32;
            stack.push((sx, sy));

            while let Some((x, y)) = stack.pop() {
                pixel_count += 1;
                bounds.extend(x, y);

                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                        if !in_limit(nx, ny) {
                            continue;
                        }
                        let (nx, ny) = (nx as u32, ny as u32);
                        if mask.is_ink(nx, ny) && visited.insert(ny as usize * width + nx as usize)
                        {
                            stack.push((nx, ny));
                        }
                    }
                }
            }

            components.push(Component {
                bounds,
                pixel_count,
            });
        }
    }

    components
}

/// Tight box around the components that belong to a highlight.
///
/// Components smaller than `min_component_pixels` are speckle. When `extent`
/// (local `left..right`) is given, a component is kept only if enough of its
/// width lies under it. Returns `None` when nothing qualifies, which callers
/// treat as "no text here" rather than a failure.
pub fn refine(
    mask: &InkMask,
    roi: &PixelRect,
    limit: &PixelRect,
    extent: Option<(f32, f32)>,
    config: &ComponentConfig,
) -> Option<PixelRect> {
    let components = find_components(mask, roi, limit);
    let total = components.len();

    let kept: Vec<&Component> = components
        .iter()
        .filter(|c| c.pixel_count >= config.min_component_pixels)
        .filter(|c| match extent {
            Some((left, right)) => c.horizontal_overlap(left, right) >= config.min_horizontal_overlap,
            None => true,
        })
        .collect();

    debug!(total, kept = kept.len(), "Components refined");

    kept.iter()
        .map(|c| c.bounds.to_rect())
        .reduce(|acc, r| acc.union(&r))
}
