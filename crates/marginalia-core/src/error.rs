// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Marginalia.

use thiserror::Error;

/// Top-level error type for all Marginalia operations.
///
/// Segmentation non-matches (no ink, no band, no component) are not errors;
/// they are reported as `RegionOutcome::NoRegion` by the assembler.
#[derive(Debug, Error)]
pub enum MarginaliaError {
    // -- Image errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Recognition service --
    #[error("text recognition failed: {0}")]
    Recognition(String),

    // -- Session errors --
    #[error("an extraction is already in progress")]
    ExtractionInFlight,

    #[error("no image has been captured")]
    NoImage,

    #[error("no {0} has been drawn")]
    NoAnnotation(&'static str),

    #[error("nothing to retry")]
    NothingToRetry,

    #[error("drawing mode mismatch: {0}")]
    DrawingMode(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MarginaliaError>;
