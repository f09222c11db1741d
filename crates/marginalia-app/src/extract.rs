// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Offline extraction — runs the region pipeline over a photo and an
// annotation file and writes the payloads a recognition service would get.
//
// Annotation file:
//
// ```json
// {
//   "display_width": 400, "display_height": 300,
//   "annotation": { "highlight": [ { "points": [{"x": 0.38, "y": 0.2}], "line_width": 8 } ] },
//   "mode": "tight"
// }
// ```

use std::path::{Path, PathBuf};

use marginalia_core::error::Result;
use marginalia_core::{Annotation, AppConfig, HighlightMode, NormRect};
use marginalia_vision::{ImageProcessor, RegionAssembler, render_masked_highlight};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// An annotation as drawn over a photo at a given display size.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationFile {
    pub display_width: f32,
    pub display_height: f32,
    pub annotation: Annotation,
    /// Highlight output mode; the configured default when absent.
    #[serde(default)]
    pub mode: Option<HighlightMode>,
}

/// What was written, printed as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub image: PathBuf,
    /// Set for highlights only.
    pub mode: Option<HighlightMode>,
    /// Normalized regions, empty when nothing was found or in masked mode.
    pub regions: Vec<NormRect>,
    pub files: Vec<PathBuf>,
}

#[instrument(skip(config))]
pub fn run(
    image_path: &Path,
    annotation_path: &Path,
    out_dir: &Path,
    config: &AppConfig,
) -> Result<ExtractionReport> {
    let file: AnnotationFile = serde_json::from_str(&std::fs::read_to_string(annotation_path)?)?;
    let photo = ImageProcessor::open(image_path)?;
    std::fs::create_dir_all(out_dir)?;

    let display = (file.display_width, file.display_height);
    let mode = match file.annotation {
        Annotation::Highlight(_) => Some(file.mode.unwrap_or(config.highlight_mode)),
        Annotation::Selection(_) => None,
    };

    let mut report = ExtractionReport {
        image: image_path.to_path_buf(),
        mode,
        regions: Vec::new(),
        files: Vec::new(),
    };

    if let (Some(HighlightMode::Masked), Annotation::Highlight(strokes)) = (mode, &file.annotation) {
        if let Some(masked) =
            render_masked_highlight(photo.as_rgba(), display, strokes, &config.extraction.regions)
        {
            let path = out_dir.join("masked.png");
            ImageProcessor::from_rgba(masked).save(&path)?;
            report.files.push(path);
        }
    } else {
        let assembler = RegionAssembler::new(config.extraction.clone());
        let outcome = assembler.assemble(photo.as_rgba(), display, &file.annotation);
        for (index, region) in outcome.regions().iter().enumerate() {
            let path = out_dir.join(format!("region-{:02}.png", index + 1));
            photo.crop_normalized(region).save(&path)?;
            report.files.push(path);
            report.regions.push(*region);
        }
    }

    info!(
        regions = report.regions.len(),
        files = report.files.len(),
        "Extraction written"
    );
    Ok(report)
}
