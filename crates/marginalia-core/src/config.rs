// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application and extraction-pipeline configuration.
//
// Every struct is `#[serde(default)]` so a partial settings file only
// overrides the values it names.

use serde::{Deserialize, Serialize};

use crate::error::{MarginaliaError, Result};
use crate::types::HighlightMode;

/// Persistent application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Tuning for the highlight-to-region pipeline.
    pub extraction: ExtractionConfig,
    /// Output mode used for highlight extraction when none is given.
    pub highlight_mode: HighlightMode,
}

/// Tuning for every stage of the extraction pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub mask: MaskConfig,
    pub bands: BandConfig,
    pub components: ComponentConfig,
    pub regions: RegionConfig,
}

/// Ink mask binarization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    /// Contrast factor applied around mid-grey before thresholding.
    pub contrast: f32,
    /// Threshold relative to the window mean instead of a fixed value.
    pub adaptive: bool,
    /// Subtracted from the window mean in adaptive mode.
    pub adaptive_offset: f32,
    /// Threshold used when `adaptive` is false.
    pub fixed_threshold: f32,
    /// Drop ink pixels with too few ink neighbours.
    pub denoise: bool,
    /// Minimum ink neighbours (of 8) for a pixel to survive denoising.
    pub min_neighbors: u8,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            contrast: 1.4,
            adaptive: true,
            adaptive_offset: 30.0,
            fixed_threshold: 140.0,
            denoise: true,
            min_neighbors: 2,
        }
    }
}

/// Row-projection band detection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandConfig {
    /// Width of the centered moving average over row counts.
    pub smoothing_window: usize,
    /// Fraction of the peak smoothed count a row must exceed.
    pub relative_threshold: f32,
    /// Standard deviations above the mean a row must exceed.
    pub std_multiplier: f32,
    /// Raw ink count a row must exceed to qualify.
    pub min_ink_per_row: u32,
    /// Bands shorter than this (rows) are discarded.
    pub min_line_height: u32,
    /// A lone band taller than this fraction of the window is split on gaps.
    pub collapsed_band_ratio: f32,
    /// Minimum run of empty rows that separates two lines in a collapsed band.
    pub gap_rows: u32,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 3,
            relative_threshold: 0.3,
            std_multiplier: 0.25,
            min_ink_per_row: 1,
            min_line_height: 6,
            collapsed_band_ratio: 0.6,
            gap_rows: 2,
        }
    }
}

/// Connected-component refinement settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentConfig {
    /// Components with fewer pixels are treated as speckle.
    pub min_component_pixels: u32,
    /// Share of a component's width that must lie under the highlight.
    pub min_horizontal_overlap: f32,
}

impl Default for ComponentConfig {
    fn default() -> Self {
        Self {
            min_component_pixels: 6,
            min_horizontal_overlap: 0.5,
        }
    }
}

/// Region assembly policy: padding, expansion and clamping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Raw stroke box padding, as a fraction of the native line width.
    pub stroke_pad_fraction: f32,
    /// Vertical padding of the analysis window around the stroke (native px).
    pub window_pad_px: f32,
    /// Strokes shorter than this fraction of a line height are "small".
    pub small_stroke_ratio: f32,
    /// Share of a band's height the stroke must cover for the band to count.
    pub min_band_overlap: f32,
    /// Maximum rectangles emitted for one highlight gesture.
    pub max_regions: usize,
    pub min_rect_width: f32,
    pub min_rect_height: f32,
    /// How far past the original annotation a region may grow (native px).
    pub max_expansion_px: f32,
    /// Padding added around a selection rectangle (native px).
    pub selection_margin_px: f32,
    /// Padding added around a refined ink box (native px).
    pub region_padding_px: f32,
    /// Below this ink share of the analysis window nothing is extracted.
    pub min_coverage_ratio: f32,
    /// Extra path width for masked-image mode beyond the stroke width.
    pub masked_extra_width_px: f32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            stroke_pad_fraction: 0.5,
            window_pad_px: 48.0,
            small_stroke_ratio: 0.6,
            min_band_overlap: 0.5,
            max_regions: 6,
            min_rect_width: 24.0,
            min_rect_height: 16.0,
            max_expansion_px: 48.0,
            selection_margin_px: 4.0,
            region_padding_px: 2.0,
            min_coverage_ratio: 0.002,
            masked_extra_width_px: 12.0,
        }
    }
}

impl ExtractionConfig {
    /// Reject settings that would make the pipeline misbehave.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(MarginaliaError::InvalidConfig(msg.to_string()));

        if self.mask.contrast.is_nan() || self.mask.contrast <= 0.0 {
            return invalid("mask.contrast must be positive");
        }
        if self.mask.min_neighbors > 8 {
            return invalid("mask.min_neighbors cannot exceed 8");
        }
        if self.bands.smoothing_window == 0 {
            return invalid("bands.smoothing_window must be at least 1");
        }
        if self.bands.min_line_height == 0 {
            return invalid("bands.min_line_height must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.bands.relative_threshold) {
            return invalid("bands.relative_threshold must be within [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.components.min_horizontal_overlap) {
            return invalid("components.min_horizontal_overlap must be within [0, 1]");
        }
        if self.regions.max_regions == 0 {
            return invalid("regions.max_regions must be at least 1");
        }
        if self.regions.min_rect_width < 0.0 || self.regions.min_rect_height < 0.0 {
            return invalid("regions minimum sizes cannot be negative");
        }
        if self.regions.max_expansion_px < 0.0
            || self.regions.window_pad_px < 0.0
            || self.regions.masked_extra_width_px < 0.0
        {
            return invalid("regions paddings cannot be negative");
        }
        if !(0.0..=1.0).contains(&self.regions.min_coverage_ratio) {
            return invalid("regions.min_coverage_ratio must be within [0, 1]");
        }
        Ok(())
    }
}
