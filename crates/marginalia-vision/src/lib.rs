// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// marginalia-vision — Highlight-to-region extraction for photographed pages.
//
// Turns a user's highlighter strokes or selection rectangle into precise
// pixel regions of the underlying text: coordinate mapping, ink masking,
// text-line band detection, connected-component refinement and region
// assembly. Everything here is synchronous and side-effect free.

pub mod assembler;
pub mod bands;
pub mod components;
pub mod image;
pub mod mapper;
pub mod mask;
pub mod masked;

pub use assembler::{RegionAssembler, RegionOutcome};
pub use self::image::processor::ImageProcessor;
pub use mapper::CoordinateMapper;
pub use mask::{InkMask, Window};
pub use masked::render_masked_highlight;
