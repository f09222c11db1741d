// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Marginalia extraction engine.
//
// Two coordinate spaces meet here: normalized [0,1] coordinates captured
// against the displayed photo, and native pixel coordinates of the
// full-resolution bitmap. `NormRect` and `Point` live in the former,
// `PixelRect` in the latter.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a captured photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureId(pub Uuid);

impl CaptureId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CaptureId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CaptureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// -- Normalized space ----------------------------------------------------------

/// A point in normalized [0,1] display coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// Create a point, clamping both axes into [0,1].
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }
}

/// A normalized axis-aligned rectangle.
///
/// Used both for the user's selection rectangle and for the regions the
/// assembler hands downstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanned by two drag corners, in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Clamp all edges into [0,1].
    ///
    /// Returns `None` when nothing with positive width and height remains.
    pub fn clamp_unit(&self) -> Option<Self> {
        let left = clamp_unit(self.x);
        let top = clamp_unit(self.y);
        let right = clamp_unit(self.right());
        let bottom = clamp_unit(self.bottom());
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
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// A freehand highlighter stroke.
///
/// Points are appended while the user drags; the bounding box is kept up to
/// date on every push so the assembler never has to rescan the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StrokeRecord", into = "StrokeRecord")]
pub struct Stroke {
    points: Vec<Point>,
    line_width: f32,
    min: Point,
    max: Point,
}

impl Stroke {
    /// Start a stroke at `point` with a line width in display pixels.
    pub fn begin(point: Point, line_width: f32) -> Self {
        Self {
            points: vec![point],
            line_width: line_width.max(0.0),
            min: point,
            max: point,
        }
    }

    /// Append a point and extend the running bounding box.
    pub fn push(&mut self, point: Point) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.points.push(point);
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Line width in display pixels.
    pub fn line_width(&self) -> f32 {
        self.line_width
    }

    /// Bounding box of the stroke's points (zero width/height for a dot).
    pub fn bounds(&self) -> NormRect {
        NormRect::new(
            self.min.x,
            self.min.y,
            self.max.x - self.min.x,
            self.max.y - self.min.y,
        )
    }
}

#[derive(Serialize, Deserialize)]
struct StrokeRecord {
    points: Vec<Point>,
    line_width: f32,
}

impl TryFrom<StrokeRecord> for Stroke {
    type Error = &'static str;

    fn try_from(record: StrokeRecord) -> Result<Self, Self::Error> {
        let mut points = record.points.into_iter().map(|p| Point::new(p.x, p.y));
        let first = points.next().ok_or("a stroke needs at least one point")?;
        let mut stroke = Stroke::begin(first, record.line_width);
        for point in points {
            stroke.push(point);
        }
        Ok(stroke)
    }
}

impl From<Stroke> for StrokeRecord {
    fn from(stroke: Stroke) -> Self {
        Self {
            points: stroke.points,
            line_width: stroke.line_width,
        }
    }
}

/// The committed annotation over a photo. Only one kind is live at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Annotation {
    /// One or more committed highlighter strokes, treated as one gesture.
    Highlight(Vec<Stroke>),
    /// A rectangular selection.
    Selection(NormRect),
}

/// Which drawing tool is active over the photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawingMode {
    #[default]
    None,
    Highlight,
    Select,
}

/// How a highlight is turned into recognition payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightMode {
    /// One tight rectangle per detected text line under the stroke.
    #[default]
    Tight,
    /// A single full-resolution image blanked outside the stroke path.
    Masked,
}

/// The kind of extraction last attempted, replayed by retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionKind {
    FullImage,
    Selection,
    Highlight(HighlightMode),
}

/// A captured page photo.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub id: CaptureId,
    /// Encoded image bytes as captured (JPEG, PNG, ...).
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// Text from the most recent successful extraction, if any.
    pub extracted_text: Option<String>,
}

impl CapturedImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            id: CaptureId::new(),
            bytes,
            mime_type: mime_type.into(),
            extracted_text: None,
        }
    }
}

// -- Native pixel space --------------------------------------------------------

/// A rectangle in native pixel coordinates of the full-resolution bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_edges(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            x: left,
            y: top,
            width: (right - left).max(0.0),
            height: (bottom - top).max(0.0),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Grow by `dx` on the left and right and `dy` on the top and bottom.
    pub fn grow(&self, dx: f32, dy: f32) -> Self {
        Self::from_edges(
            self.x - dx,
            self.y - dy,
            self.right() + dx,
            self.bottom() + dy,
        )
    }

    pub fn union(&self, other: &Self) -> Self {
        Self::from_edges(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let rect = Self::from_edges(
            self.x.max(other.x),
            self.y.max(other.y),
            self.right().min(other.right()),
            self.bottom().min(other.bottom()),
        );
        (!rect.is_empty()).then_some(rect)
    }

    /// Grow symmetrically until the rectangle is at least `min_w` x `min_h`.
    pub fn expand_to_min(&self, min_w: f32, min_h: f32) -> Self {
        let dx = ((min_w - self.width) / 2.0).max(0.0);
        let dy = ((min_h - self.height) / 2.0).max(0.0);
        self.grow(dx, dy)
    }

    /// Move the rectangle inside `bounds`, shrinking only when `bounds` is
    /// smaller than the rectangle on that axis.
    pub fn fit_within(&self, bounds: &Self) -> Option<Self> {
        if bounds.is_empty() {
            return None;
        }
        let width = self.width.min(bounds.width);
        let height = self.height.min(bounds.height);
        let x = self.x.clamp(bounds.x, (bounds.right() - width).max(bounds.x));
        let y = self.y.clamp(bounds.y, (bounds.bottom() - height).max(bounds.y));
        let rect = Self::new(x, y, width, height);
        (!rect.is_empty()).then_some(rect)
    }
}
