// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Band detector — finds text lines as contiguous row ranges of high ink
// density in an analysis window.
//
// ## Pipeline
//
// 1. Count ink pixels per row (optionally within a column range)
// 2. Smooth the counts with a centered moving average
// 3. Peak threshold = max(max * relative, mean + k * std)
// 4. Contiguous qualifying rows form bands; short bands are dropped
// 5. A lone band covering most of the window is split on empty-row gaps

use std::ops::Range;

use marginalia_core::config::BandConfig;
use tracing::debug;

use crate::mask::InkMask;

/// A candidate text line: rows `start..end` local to the mask window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub start: u32,
    pub end: u32,
}

impl Band {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn height(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn center(&self) -> f32 {
        (self.start + self.end) as f32 / 2.0
    }

    /// Rows shared with the half-open float range `top..bottom`.
    pub fn overlap(&self, top: f32, bottom: f32) -> f32 {
        (bottom.min(self.end as f32) - top.max(self.start as f32)).max(0.0)
    }

    /// Smallest band covering both.
    pub fn merge(&self, other: &Band) -> Band {
        Band::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// Ink pixels per row, restricted to `columns` when given.
pub fn row_profile(mask: &InkMask, columns: Option<Range<u32>>) -> Vec<u32> {
    let cols = columns.unwrap_or(0..mask.width());
    let cols = cols.start.min(mask.width())..cols.end.min(mask.width());
    (0..mask.height())
        .map(|y| cols.clone().filter(|&x| mask.is_ink(x, y)).count() as u32)
        .collect()
}

/// Centered moving average; the window shrinks at the ends.
pub fn smooth(counts: &[u32], window: usize) -> Vec<f32> {
    let half = window.max(1) / 2;
    (0..counts.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(counts.len());
            let sum: u32 = counts[lo..hi].iter().sum();
            sum as f32 / (hi - lo) as f32
        })
        .collect()
}

/// Threshold the row profile into bands.
pub fn detect_bands(raw: &[u32], config: &BandConfig) -> Vec<Band> {
    if raw.is_empty() {
        return Vec::new();
    }
    let smoothed = smooth(raw, config.smoothing_window);

    let n = smoothed.len() as f32;
    let max = smoothed.iter().copied().fold(0.0f32, f32::max);
    let mean = smoothed.iter().sum::<f32>() / n;
    let variance = smoothed.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    let std = variance.sqrt();
    let threshold = (max * config.relative_threshold).max(mean + config.std_multiplier * std);

    let qualifies = |i: usize| smoothed[i] > threshold && raw[i] > config.min_ink_per_row;

    let mut bands = Vec::new();
    let mut start: Option<usize> = None;
    for i in 0..=raw.len() {
        let hit = i < raw.len() && qualifies(i);
        match (hit, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                if (i - s) as u32 >= config.min_line_height {
                    bands.push(Band::new(s as u32, i as u32));
                }
                start = None;
            }
            _ => {}
        }
    }

    debug!(max, mean, std, threshold, bands = bands.len(), "Row bands detected");
    bands
}

/// Whether a single band swallowed most of the window (lines ran together).
pub fn is_collapsed(bands: &[Band], window_height: u32, config: &BandConfig) -> bool {
    match bands {
        [band] => {
            band.height() as f32 > config.collapsed_band_ratio * window_height as f32
                && band.height() >= 2 * config.min_line_height
        }
        _ => false,
    }
}

/// Split a band on runs of at least `gap_rows` near-empty rows.
///
/// Returns the original band when no sub-band survives.
pub fn split_on_gaps(band: Band, raw: &[u32], config: &BandConfig) -> Vec<Band> {
    let end = (band.end as usize).min(raw.len());
    let is_empty = |i: usize| raw[i] <= config.min_ink_per_row;

    let mut parts = Vec::new();
    let mut ink_start: Option<usize> = None;
    let mut last_ink = 0usize;
    let mut gap = 0u32;

    for i in band.start as usize..end {
        if is_empty(i) {
            gap += 1;
            if gap >= config.gap_rows {
                if let Some(s) = ink_start.take() {
                    parts.push(Band::new(s as u32, last_ink as u32 + 1));
                }
            }
        } else {
            gap = 0;
            if ink_start.is_none() {
                ink_start = Some(i);
            }
            last_ink = i;
        }
    }
    if let Some(s) = ink_start {
        parts.push(Band::new(s as u32, last_ink as u32 + 1));
    }

    let parts: Vec<Band> = parts
        .into_iter()
        .filter(|b| b.height() >= config.min_line_height)
        .collect();

    if parts.is_empty() {
        vec![band]
    } else {
        debug!(parts = parts.len(), "Collapsed band split on row gaps");
        parts
    }
}

/// Full line detection over a mask: threshold, then the collapsed-band
/// fallback.
pub fn detect_lines(mask: &InkMask, columns: Option<Range<u32>>, config: &BandConfig) -> Vec<Band> {
    let raw = row_profile(mask, columns);
    let bands = detect_bands(&raw, config);
    if is_collapsed(&bands, mask.height(), config) {
        return split_on_gaps(bands[0], &raw, config);
    }
    bands
}

/// Median band height, used as the line height estimate.
pub fn median_height(bands: &[Band]) -> Option<f32> {
    if bands.is_empty() {
        return None;
    }
    let mut heights: Vec<u32> = bands.iter().map(Band::height).collect();
    heights.sort_unstable();
    let mid = heights.len() / 2;
    Some(if heights.len() % 2 == 0 {
        (heights[mid - 1] + heights[mid]) as f32 / 2.0
    } else {
        heights[mid] as f32
    })
}
