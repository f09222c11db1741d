// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Region assembler — turns a committed annotation into the normalized
// rectangles handed downstream for cropping.
//
// ## Highlight pipeline (tight-rectangle mode)
//
// 1. Map strokes to native pixels; raw box, padded by a share of line width
// 2. Build an ink mask over a window around the padded box
// 3. Bail out with `NoRegion` when the window is (nearly) blank
// 4. Detect text-line bands within the stroke's column span
// 5. Small gesture: one band, refined around the stroke
//    Large gesture: every well-covered band, merged down to `max_regions`,
//    each refined with the horizontal-overlap rule
// 6. Pad, grow to minimum size, fit inside the expansion envelope and image
// 7. Convert back to normalized coordinates

use image::RgbaImage;
use marginalia_core::config::ExtractionConfig;
use marginalia_core::{Annotation, NormRect, PixelRect, Stroke};
use tracing::{debug, info, instrument, warn};

use crate::bands::{self, Band};
use crate::components;
use crate::mapper::CoordinateMapper;
use crate::mask::{InkMask, Window};

/// Result of region assembly.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionOutcome {
    /// One or more clamped, non-empty normalized rectangles.
    Regions(Vec<NormRect>),
    /// Nothing to extract: blank window, no qualifying ink, or unmapped
    /// geometry. Not an error.
    NoRegion,
}

impl RegionOutcome {
    pub fn regions(&self) -> &[NormRect] {
        match self {
            Self::Regions(regions) => regions,
            Self::NoRegion => &[],
        }
    }

    fn from_regions(regions: Vec<NormRect>) -> Self {
        if regions.is_empty() {
            Self::NoRegion
        } else {
            Self::Regions(regions)
        }
    }
}

/// Computes extraction regions for selections and highlights.
#[derive(Debug, Clone, Default)]
pub struct RegionAssembler {
    config: ExtractionConfig,
}

/// Stroke geometry converted to native pixels.
struct NativeStrokes {
    paths: Vec<Vec<(f32, f32)>>,
    raw: PixelRect,
    line_width: f32,
}

impl NativeStrokes {
    fn new(strokes: &[Stroke], mapper: &CoordinateMapper) -> Option<Self> {
        let raw = strokes
            .iter()
            .map(|s| mapper.to_native(&s.bounds()))
            .reduce(|acc, r| acc.union(&r))?;
        let line_width = strokes
            .iter()
            .map(|s| mapper.line_width_to_native(s.line_width()))
            .fold(0.0f32, f32::max);
        let paths = strokes
            .iter()
            .map(|s| s.points().iter().map(|p| mapper.point_to_native(p)).collect())
            .collect();
        Some(Self {
            paths,
            raw,
            line_width,
        })
    }

    /// Horizontal span of the stroke path where it passes through rows
    /// `top..bottom`, widened by half the line width. `None` if the path
    /// never enters those rows.
    fn extent_within_rows(&self, top: f32, bottom: f32) -> Option<(f32, f32)> {
        let half = self.line_width / 2.0;
        let (top, bottom) = (top - half, bottom + half);
        let mut span: Option<(f32, f32)> = None;
        let mut include = |x: f32| {
            span = Some(match span {
                Some((lo, hi)) => (lo.min(x), hi.max(x)),
                None => (x, x),
            });
        };

        for path in &self.paths {
            if let [(x, y)] = path.as_slice() {
                if (top..=bottom).contains(y) {
                    include(*x);
                }
                continue;
            }
            for seg in path.windows(2) {
                let ((x0, y0), (x1, y1)) = (seg[0], seg[1]);
                let dy = y1 - y0;
                if dy.abs() < f32::EPSILON {
                    if (top..=bottom).contains(&y0) {
                        include(x0);
                        include(x1);
                    }
                    continue;
                }
                let ta = (top - y0) / dy;
                let tb = (bottom - y0) / dy;
                let t0 = ta.min(tb).max(0.0);
                let t1 = ta.max(tb).min(1.0);
                if t0 <= t1 {
                    include(x0 + (x1 - x0) * t0);
                    include(x0 + (x1 - x0) * t1);
                }
            }
        }

        span.map(|(lo, hi)| (lo - half, hi + half))
    }
}

impl RegionAssembler {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Assemble regions for `annotation` over `image` drawn at `rendered`
    /// display size. The coordinate mapper is rebuilt on every call.
    pub fn assemble(
        &self,
        image: &RgbaImage,
        rendered: (f32, f32),
        annotation: &Annotation,
    ) -> RegionOutcome {
        let Some(mapper) = CoordinateMapper::new(image.dimensions(), rendered) else {
            warn!(?rendered, "Display size not laid out; skipping region assembly");
            return RegionOutcome::NoRegion;
        };
        match annotation {
            Annotation::Selection(rect) => self.selection_region(&mapper, rect),
            Annotation::Highlight(strokes) => self.highlight_regions(image, &mapper, strokes),
        }
    }

    /// A selection maps straight through to one padded native rectangle.
    #[instrument(skip(self, mapper))]
    pub fn selection_region(&self, mapper: &CoordinateMapper, rect: &NormRect) -> RegionOutcome {
        let native = mapper.to_native(rect);
        if native.is_empty() {
            debug!("Zero-area selection");
            return RegionOutcome::NoRegion;
        }
        let regions = &self.config.regions;
        let envelope = native.grow(regions.max_expansion_px, regions.max_expansion_px);
        let candidate = native.grow(regions.selection_margin_px, regions.selection_margin_px);

        RegionOutcome::from_regions(
            self.finalize(mapper, &envelope, 0.0, candidate)
                .into_iter()
                .collect(),
        )
    }

    /// Tight-rectangle regions for a committed stroke set.
    #[instrument(skip_all, fields(strokes = strokes.len()))]
    pub fn highlight_regions(
        &self,
        image: &RgbaImage,
        mapper: &CoordinateMapper,
        strokes: &[Stroke],
    ) -> RegionOutcome {
        let regions = &self.config.regions;
        let Some(native) = NativeStrokes::new(strokes, mapper) else {
            return RegionOutcome::NoRegion;
        };

        let pad = regions.stroke_pad_fraction * native.line_width;
        let padded = native.raw.grow(pad, pad);
        let envelope = native
            .raw
            .grow(regions.max_expansion_px, regions.max_expansion_px);

        let analysis = padded.grow(regions.max_expansion_px, regions.window_pad_px);
        let Some(window) = Window::from_rect(&analysis, image.width(), image.height()) else {
            return RegionOutcome::NoRegion;
        };

        let mask = InkMask::build(image, window, &self.config.mask);
        if mask.coverage() < regions.min_coverage_ratio {
            info!(
                coverage = mask.coverage(),
                min = regions.min_coverage_ratio,
                "No ink under highlight"
            );
            return RegionOutcome::NoRegion;
        }

        let local_raw = mask.local_rect(&native.raw);
        let local_padded = mask.local_rect(&padded);
        let local_limit = mask.local_rect(&envelope);

        let center_x = local_padded.x + local_padded.width / 2.0;
        let half_span = local_padded.width.max(regions.min_rect_width) / 2.0;
        let columns = (center_x - half_span).floor().max(0.0) as u32
            ..(center_x + half_span).ceil().max(0.0) as u32;
        let lines = bands::detect_lines(&mask, Some(columns), &self.config.bands);

        // With no bands the stroke's own height stands in for the line height,
        // which always classifies the gesture as large.
        let estimated_line = bands::median_height(&lines).unwrap_or(local_raw.height);
        let small = local_raw.height < regions.small_stroke_ratio * estimated_line;
        debug!(
            bands = lines.len(),
            estimated_line,
            stroke_height = local_raw.height,
            small,
            "Highlight classified"
        );

        let candidates = if small {
            self.small_candidates(&mask, &lines, &local_padded, &local_limit)
        } else {
            self.large_candidates(&mask, &lines, &native, &local_raw, &local_padded, &local_limit)
        };

        let out: Vec<NormRect> = candidates
            .into_iter()
            .take(regions.max_regions)
            .filter_map(|local| {
                self.finalize(
                    mapper,
                    &envelope,
                    regions.region_padding_px,
                    mask.native_rect(&local),
                )
            })
            .collect();

        info!(regions = out.len(), "Highlight regions assembled");
        RegionOutcome::from_regions(out)
    }

    /// Single word or partial line: the nearest band the stroke touches.
    fn small_candidates(
        &self,
        mask: &InkMask,
        lines: &[Band],
        padded: &PixelRect,
        limit: &PixelRect,
    ) -> Vec<PixelRect> {
        let stroke_center = padded.center_y();
        let nearest = lines
            .iter()
            .filter(|b| b.overlap(padded.y, padded.bottom()) > 0.0)
            .min_by(|a, b| {
                let da = (a.center() - stroke_center).abs();
                let db = (b.center() - stroke_center).abs();
                da.total_cmp(&db)
            });

        let roi = match nearest {
            Some(band) => PixelRect::from_edges(
                padded.x,
                band.start as f32,
                padded.right(),
                band.end as f32,
            ),
            None => *padded,
        };

        components::refine(mask, &roi, limit, None, &self.config.components)
            .into_iter()
            .collect()
    }

    /// One or more full lines: a region per well-covered band.
    fn large_candidates(
        &self,
        mask: &InkMask,
        lines: &[Band],
        native: &NativeStrokes,
        raw: &PixelRect,
        padded: &PixelRect,
        limit: &PixelRect,
    ) -> Vec<PixelRect> {
        let regions = &self.config.regions;
        let covered: Vec<Band> = lines
            .iter()
            .copied()
            .filter(|b| {
                b.overlap(raw.y, raw.bottom()) >= regions.min_band_overlap * b.height() as f32
            })
            .collect();

        if covered.is_empty() {
            return components::refine(mask, padded, limit, None, &self.config.components)
                .into_iter()
                .collect();
        }

        let merged = merge_contiguous(&covered, regions.max_regions);
        if merged.len() < covered.len() {
            debug!(from = covered.len(), to = merged.len(), "Merged adjacent bands");
        }

        let window = mask.window();
        merged
            .iter()
            .filter_map(|band| {
                let native_top = (window.y + band.start) as f32;
                let native_bottom = (window.y + band.end) as f32;
                let (left, right) = native
                    .extent_within_rows(native_top, native_bottom)
                    .map(|(l, r)| (l - window.x as f32, r - window.x as f32))
                    .unwrap_or((padded.x, padded.right()));

                let roi =
                    PixelRect::from_edges(left, band.start as f32, right, band.end as f32);
                components::refine(
                    mask,
                    &roi,
                    limit,
                    Some((left, right)),
                    &self.config.components,
                )
            })
            .collect()
    }

    /// Shared size and clamp policy, then conversion to normalized space.
    fn finalize(
        &self,
        mapper: &CoordinateMapper,
        envelope: &PixelRect,
        padding: f32,
        candidate: PixelRect,
    ) -> Option<NormRect> {
        let regions = &self.config.regions;
        let bounds = envelope.intersect(&mapper.image_bounds())?;
        let rect = candidate
            .grow(padding, padding)
            .expand_to_min(regions.min_rect_width, regions.min_rect_height)
            .fit_within(&bounds)?;
        mapper.to_normalized(&rect).clamp_unit()
    }
}

/// Merge adjacent bands in contiguous chunks until at most `max` remain.
///
/// Chunk sizes differ by at most one, so exactly `max` bands come out when
/// there were more.
pub fn merge_contiguous(bands: &[Band], max: usize) -> Vec<Band> {
    if max == 0 || bands.len() <= max {
        return bands.to_vec();
    }
    let base = bands.len() / max;
    let extra = bands.len() % max;
    let mut out = Vec::with_capacity(max);
    let mut start = 0;
    for group in 0..max {
        let size = base + usize::from(group < extra);
        let first = bands[start];
        let last = bands[start + size - 1];
        out.push(first.merge(&last));
        start += size;
    }
    out
}
