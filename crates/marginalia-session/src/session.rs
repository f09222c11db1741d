// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extraction session — one captured photo, the annotation drawn over it, and
// the extraction state shown next to it.
//
// ## Extraction flow
//
// 1. Under the lock: reject if a job is in flight, snapshot the capture and
//    annotation, claim the in-flight slot and move to `Extracting(kind)`
// 2. Outside the lock: assemble regions, crop and encode payloads
// 3. Send payloads to the recognition service one at a time
// 4. Under the lock again: release the slot, drop the result if the photo
//    was replaced, otherwise record `Succeeded`, `SucceededEmpty` or `Failed`
//
// The in-flight slot outlives a photo change, so a stale job still blocks a
// second one until its service call returns. A job whose future is dropped
// releases the slot through `InFlight` and puts an `Extracting` state back to
// `Idle`.
//
// The lock is a plain `std::sync::Mutex` and is never held across an await.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use marginalia_core::config::ExtractionConfig;
use marginalia_core::error::{MarginaliaError, Result};
use marginalia_core::human_errors::{HumanError, humanize_error};
use marginalia_core::{
    Annotation, CaptureId, CapturedImage, DrawingMode, ExtractionKind, HighlightMode, NormRect,
    Point, Stroke,
};
use marginalia_vision::{ImageProcessor, RegionAssembler, RegionOutcome, render_masked_highlight};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::response::normalize_response;
use crate::service::{RecognitionRequest, RecognitionService};

const PNG_MIME: &str = "image/png";

/// Where an extraction stands, as presented next to the photo.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ExtractionState {
    #[default]
    Idle,
    Extracting(ExtractionKind),
    Succeeded(String),
    /// The extraction ran but found no text (blank area or empty response).
    SucceededEmpty,
    Failed(HumanError),
}

impl ExtractionState {
    pub fn is_extracting(&self) -> bool {
        matches!(self, Self::Extracting(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded(_) | Self::SucceededEmpty | Self::Failed(_)
        )
    }
}

// -- Internal state -------------------------------------------------------------

struct Capture {
    image: CapturedImage,
    pixels: Arc<ImageProcessor>,
}

#[derive(Default)]
struct SessionInner {
    capture: Option<Capture>,
    /// Bumped whenever the photo is replaced or cleared.
    generation: u64,
    next_job: u64,
    /// Job currently allowed to call the service.
    in_flight: Option<u64>,
    display_size: (f32, f32),
    drawing_mode: DrawingMode,
    strokes: Vec<Stroke>,
    active_stroke: Option<Stroke>,
    selection: Option<NormRect>,
    state: ExtractionState,
    last_kind: Option<ExtractionKind>,
}

impl SessionInner {
    fn require_mode(&self, mode: DrawingMode) -> Result<()> {
        if self.drawing_mode == mode {
            Ok(())
        } else {
            Err(MarginaliaError::DrawingMode(format!(
                "{mode:?} tool required, {:?} is active",
                self.drawing_mode
            )))
        }
    }

    fn clear_annotations(&mut self) {
        self.strokes.clear();
        self.active_stroke = None;
        self.selection = None;
    }
}

/// What an extraction sends.
enum Source {
    Original { bytes: Vec<u8>, mime_type: String },
    Annotated(Annotation),
}

/// Snapshot taken when an extraction starts.
struct Job {
    id: u64,
    generation: u64,
    kind: ExtractionKind,
    pixels: Arc<ImageProcessor>,
    display_size: (f32, f32),
    source: Source,
}

// -- Session --------------------------------------------------------------------

/// Releases the in-flight slot of a job whose future never reached `finish`.
struct InFlight<'a> {
    inner: &'a Mutex<SessionInner>,
    job: u64,
    generation: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.in_flight != Some(self.job) {
            return;
        }
        inner.in_flight = None;
        if inner.generation == self.generation && inner.state.is_extracting() {
            warn!(job = self.job, "Extraction cancelled");
            inner.state = ExtractionState::Idle;
        }
    }
}

/// Per-capture extraction session over a recognition service `S`.
pub struct ExtractionSession<S> {
    service: S,
    assembler: RegionAssembler,
    inner: Mutex<SessionInner>,
}

impl<S: RecognitionService> ExtractionSession<S> {
    pub fn new(service: S, config: ExtractionConfig) -> Self {
        Self {
            service,
            assembler: RegionAssembler::new(config),
            inner: Mutex::new(SessionInner::default()),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- Photo ------------------------------------------------------------------

    /// Decode and adopt a new photo. Strokes, selection and state are reset;
    /// a result still in flight for the previous photo will be discarded, and
    /// no new extraction starts until that call returns.
    #[instrument(skip_all, fields(len = bytes.len()))]
    pub fn set_image(&self, bytes: Vec<u8>, mime_type: impl Into<String>) -> Result<CaptureId> {
        let pixels = ImageProcessor::from_bytes(&bytes)?;
        let image = CapturedImage::new(bytes, mime_type);
        let id = image.id;

        let mut inner = self.lock();
        inner.capture = Some(Capture {
            image,
            pixels: Arc::new(pixels),
        });
        inner.generation += 1;
        inner.clear_annotations();
        inner.state = ExtractionState::Idle;
        inner.last_kind = None;

        info!(capture = %id, "Photo captured");
        Ok(id)
    }

    pub fn clear_image(&self) {
        let mut inner = self.lock();
        inner.capture = None;
        inner.generation += 1;
        inner.clear_annotations();
        inner.state = ExtractionState::Idle;
        inner.last_kind = None;
    }

    pub fn capture_id(&self) -> Option<CaptureId> {
        self.lock().capture.as_ref().map(|c| c.image.id)
    }

    /// Text from the latest successful extraction of the current photo.
    pub fn captured_text(&self) -> Option<String> {
        self.lock()
            .capture
            .as_ref()
            .and_then(|c| c.image.extracted_text.clone())
    }

    /// Size the photo is currently drawn at. Read afresh by every extraction.
    pub fn set_display_size(&self, width: f32, height: f32) {
        self.lock().display_size = (width, height);
    }

    // -- Drawing ----------------------------------------------------------------

    pub fn set_drawing_mode(&self, mode: DrawingMode) {
        let mut inner = self.lock();
        if mode != DrawingMode::Highlight {
            inner.active_stroke = None;
        }
        inner.drawing_mode = mode;
    }

    pub fn drawing_mode(&self) -> DrawingMode {
        self.lock().drawing_mode
    }

    pub fn begin_stroke(&self, point: Point, line_width: f32) -> Result<()> {
        let mut inner = self.lock();
        inner.require_mode(DrawingMode::Highlight)?;
        if inner.capture.is_none() {
            return Err(MarginaliaError::NoImage);
        }
        inner.active_stroke = Some(Stroke::begin(point, line_width));
        Ok(())
    }

    pub fn extend_stroke(&self, point: Point) -> Result<()> {
        let mut inner = self.lock();
        inner.require_mode(DrawingMode::Highlight)?;
        if let Some(stroke) = inner.active_stroke.as_mut() {
            stroke.push(point);
        }
        Ok(())
    }

    /// Commit the stroke being drawn. Replaces any live selection.
    pub fn commit_stroke(&self) -> Result<()> {
        let mut inner = self.lock();
        inner.require_mode(DrawingMode::Highlight)?;
        if let Some(stroke) = inner.active_stroke.take() {
            inner.selection = None;
            inner.strokes.push(stroke);
            debug!(strokes = inner.strokes.len(), "Stroke committed");
        }
        Ok(())
    }

    pub fn cancel_stroke(&self) {
        self.lock().active_stroke = None;
    }

    /// Set the selection rectangle. Drops committed strokes.
    pub fn set_selection(&self, rect: NormRect) -> Result<()> {
        let mut inner = self.lock();
        inner.require_mode(DrawingMode::Select)?;
        if inner.capture.is_none() {
            return Err(MarginaliaError::NoImage);
        }
        inner.strokes.clear();
        inner.active_stroke = None;
        inner.selection = Some(rect);
        Ok(())
    }

    pub fn clear_annotations(&self) {
        self.lock().clear_annotations();
    }

    /// The committed annotation, if any.
    pub fn annotation(&self) -> Option<Annotation> {
        let inner = self.lock();
        match (&inner.selection, inner.strokes.is_empty()) {
            (Some(rect), _) => Some(Annotation::Selection(*rect)),
            (None, false) => Some(Annotation::Highlight(inner.strokes.clone())),
            (None, true) => None,
        }
    }

    // -- Extraction state -------------------------------------------------------

    pub fn state(&self) -> ExtractionState {
        self.lock().state.clone()
    }

    /// Dismiss a finished extraction.
    pub fn acknowledge(&self) {
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            inner.state = ExtractionState::Idle;
        }
    }

    pub async fn extract_full_image(&self) -> Result<ExtractionState> {
        self.run(ExtractionKind::FullImage).await
    }

    pub async fn extract_selection(&self) -> Result<ExtractionState> {
        self.run(ExtractionKind::Selection).await
    }

    pub async fn extract_highlight(&self, mode: HighlightMode) -> Result<ExtractionState> {
        self.run(ExtractionKind::Highlight(mode)).await
    }

    /// Replay the last attempted extraction against the stored annotation.
    pub async fn retry(&self) -> Result<ExtractionState> {
        let kind = self.last_kind().ok_or(MarginaliaError::NothingToRetry)?;
        self.run(kind).await
    }

    fn last_kind(&self) -> Option<ExtractionKind> {
        self.lock().last_kind
    }

    // -- Pipeline ---------------------------------------------------------------

    async fn run(&self, kind: ExtractionKind) -> Result<ExtractionState> {
        let job = self.begin(kind)?;
        let _slot = InFlight {
            inner: &self.inner,
            job: job.id,
            generation: job.generation,
        };
        let outcome = self.execute(&job).await;
        Ok(self.finish(&job, outcome))
    }

    fn begin(&self, kind: ExtractionKind) -> Result<Job> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        if inner.in_flight.is_some() {
            return Err(MarginaliaError::ExtractionInFlight);
        }
        let capture = inner.capture.as_ref().ok_or(MarginaliaError::NoImage)?;

        let source = match kind {
            ExtractionKind::FullImage => Source::Original {
                bytes: capture.image.bytes.clone(),
                mime_type: capture.image.mime_type.clone(),
            },
            ExtractionKind::Selection => {
                let rect = inner
                    .selection
                    .ok_or(MarginaliaError::NoAnnotation("selection"))?;
                Source::Annotated(Annotation::Selection(rect))
            }
            ExtractionKind::Highlight(_) => {
                if inner.strokes.is_empty() {
                    return Err(MarginaliaError::NoAnnotation("highlight"));
                }
                Source::Annotated(Annotation::Highlight(inner.strokes.clone()))
            }
        };

        inner.next_job += 1;
        let job = Job {
            id: inner.next_job,
            generation: inner.generation,
            kind,
            pixels: Arc::clone(&capture.pixels),
            display_size: inner.display_size,
            source,
        };
        info!(capture = %capture.image.id, job = job.id, ?kind, "Extraction started");
        inner.in_flight = Some(job.id);
        inner.state = ExtractionState::Extracting(kind);
        inner.last_kind = Some(kind);

        Ok(job)
    }

    /// Build the payloads for a job. Empty means there is nothing to read.
    fn requests(&self, job: &Job) -> Result<Vec<RecognitionRequest>> {
        let annotation = match &job.source {
            Source::Original { bytes, mime_type } => {
                return Ok(vec![RecognitionRequest::strict(
                    bytes.clone(),
                    mime_type.clone(),
                )]);
            }
            Source::Annotated(annotation) => annotation,
        };

        match (job.kind, annotation) {
            (ExtractionKind::Highlight(HighlightMode::Masked), Annotation::Highlight(strokes)) => {
                let masked = render_masked_highlight(
                    job.pixels.as_rgba(),
                    job.display_size,
                    strokes,
                    &self.assembler.config().regions,
                );
                match masked {
                    Some(image) => Ok(vec![RecognitionRequest::strict(
                        ImageProcessor::from_rgba(image).to_png_bytes()?,
                        PNG_MIME,
                    )]),
                    None => Ok(Vec::new()),
                }
            }
            _ => match self
                .assembler
                .assemble(job.pixels.as_rgba(), job.display_size, annotation)
            {
                RegionOutcome::NoRegion => Ok(Vec::new()),
                RegionOutcome::Regions(regions) => regions
                    .iter()
                    .map(|region| {
                        let png = job.pixels.crop_normalized(region).to_png_bytes()?;
                        Ok(RecognitionRequest::strict(png, PNG_MIME))
                    })
                    .collect(),
            },
        }
    }

    #[instrument(skip_all, fields(kind = ?job.kind))]
    async fn execute(&self, job: &Job) -> Result<String> {
        let requests = self.requests(job)?;
        if requests.is_empty() {
            info!("No region to extract");
            return Ok(String::new());
        }

        let total = requests.len();
        let mut texts = Vec::with_capacity(total);
        for (index, request) in requests.into_iter().enumerate() {
            let raw = self.service.recognize(request).await?;
            let text = normalize_response(&raw);
            debug!(index, total, chars = text.len(), "Region recognized");
            if !text.is_empty() {
                texts.push(text);
            }
        }
        Ok(texts.join("\n"))
    }

    fn finish(&self, job: &Job, outcome: Result<String>) -> ExtractionState {
        let mut guard = self.lock();
        let inner = &mut *guard;

        if inner.in_flight == Some(job.id) {
            inner.in_flight = None;
        }

        let current = inner.generation == job.generation;
        let Some(capture) = inner.capture.as_mut().filter(|_| current) else {
            warn!(kind = ?job.kind, "Photo replaced during extraction; result discarded");
            return ExtractionState::Idle;
        };

        inner.state = match outcome {
            Ok(text) if text.is_empty() => ExtractionState::SucceededEmpty,
            Ok(text) => {
                capture.image.extracted_text = Some(text.clone());
                ExtractionState::Succeeded(text)
            }
            Err(err) => {
                warn!(%err, kind = ?job.kind, "Extraction failed");
                ExtractionState::Failed(humanize_error(&err))
            }
        };
        info!(state = ?inner.state, "Extraction finished");
        inner.state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;

    use image::{Rgba, RgbaImage};

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([20, 20, 20, 255]);

    /// Replies from a script and records every request.
    #[derive(Default)]
    struct ScriptedService {
        replies: Mutex<VecDeque<Result<String>>>,
        requests: Mutex<Vec<RecognitionRequest>>,
        delay: Option<Duration>,
    }

    impl ScriptedService {
        fn replying<I: IntoIterator<Item = Result<String>>>(replies: I) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                ..Self::default()
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl RecognitionService for ScriptedService {
        async fn recognize(&self, request: RecognitionRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let reply = self.replies.lock().unwrap().pop_front();
            reply.unwrap_or_else(|| Ok(String::new()))
        }
    }

    fn ok(text: &str) -> Result<String> {
        Ok(text.to_string())
    }

    fn png(img: RgbaImage) -> Vec<u8> {
        ImageProcessor::from_rgba(img).to_png_bytes().unwrap()
    }

    /// Three lines of glyph blocks at rows 60, 90 and 120 on a 400x300 page.
    fn lined_page() -> Vec<u8> {
        let mut img = RgbaImage::from_pixel(400, 300, WHITE);
        for top in [60u32, 90, 120] {
            for y in top..top + 14 {
                let mut x0 = 40;
                while x0 + 8 <= 360 {
                    for x in x0..x0 + 8 {
                        img.put_pixel(x, y, BLACK);
                    }
                    x0 += 12;
                }
            }
        }
        png(img)
    }

    fn session(service: ScriptedService) -> ExtractionSession<ScriptedService> {
        ExtractionSession::new(service, ExtractionConfig::default())
    }

    fn draw(session: &ExtractionSession<ScriptedService>, from: Point, to: Point, width: f32) {
        session.set_drawing_mode(DrawingMode::Highlight);
        session.begin_stroke(from, width).unwrap();
        session.extend_stroke(to).unwrap();
        session.commit_stroke().unwrap();
    }

    fn blank_session(service: ScriptedService) -> ExtractionSession<ScriptedService> {
        let s = session(service);
        s.set_image(png(RgbaImage::from_pixel(200, 200, WHITE)), "image/png")
            .unwrap();
        s.set_display_size(200.0, 200.0);
        draw(&s, Point::new(0.2, 0.5), Point::new(0.8, 0.5), 10.0);
        s
    }

    #[tokio::test]
    async fn blank_highlight_succeeds_empty_without_calling_service() {
        let s = blank_session(ScriptedService::default());
        let state = s.extract_highlight(HighlightMode::Tight).await.unwrap();
        assert_eq!(state, ExtractionState::SucceededEmpty);
        assert_eq!(s.service().calls(), 0);
        assert_eq!(s.captured_text(), None);
    }

    #[tokio::test]
    async fn masked_mode_always_sends_one_payload() {
        let s = blank_session(ScriptedService::replying([ok(
            "```json\n{\"text\": \"margin note\"}\n```",
        )]));
        let state = s.extract_highlight(HighlightMode::Masked).await.unwrap();
        assert_eq!(state, ExtractionState::Succeeded("margin note".into()));
        assert_eq!(s.service().calls(), 1);

        let requests = s.service().requests.lock().unwrap();
        assert_eq!(requests[0].mime_type, "image/png");
        let sent = ImageProcessor::from_bytes(&requests[0].image).unwrap();
        assert_eq!((sent.width(), sent.height()), (200, 200));
    }

    #[tokio::test]
    async fn one_call_per_line_joined_with_newlines() {
        let s = session(ScriptedService::replying([
            ok("first line"),
            ok("{\"text\": \"second line\"}"),
            ok("third line"),
        ]));
        s.set_image(lined_page(), "image/png").unwrap();
        s.set_display_size(400.0, 300.0);
        draw(
            &s,
            Point::new(152.0 / 400.0, 62.0 / 300.0),
            Point::new(152.0 / 400.0, 132.0 / 300.0),
            8.0,
        );

        let state = s.extract_highlight(HighlightMode::Tight).await.unwrap();
        let expected = "first line\nsecond line\nthird line";
        assert_eq!(state, ExtractionState::Succeeded(expected.into()));
        assert_eq!(s.service().calls(), 3);
        assert_eq!(s.captured_text().as_deref(), Some(expected));

        // Every payload is a small PNG crop, not the whole page.
        for request in s.service().requests.lock().unwrap().iter() {
            let crop = ImageProcessor::from_bytes(&request.image).unwrap();
            assert!(crop.width() < 100 && crop.height() < 40);
        }
    }

    #[tokio::test]
    async fn full_image_sends_original_bytes() {
        let bytes = lined_page();
        let s = session(ScriptedService::replying([ok("whole page")]));
        s.set_image(bytes.clone(), "image/png").unwrap();

        let state = s.extract_full_image().await.unwrap();
        assert_eq!(state, ExtractionState::Succeeded("whole page".into()));
        let requests = s.service().requests.lock().unwrap();
        assert_eq!(requests[0].image, bytes);
        assert_eq!(requests[0].instruction, crate::STRICT_INSTRUCTION);
    }

    #[tokio::test]
    async fn failure_is_humanized_and_retry_replays() {
        let s = session(ScriptedService::replying([
            Err(MarginaliaError::Recognition("request timed out".into())),
            ok("second time lucky"),
        ]));
        s.set_image(lined_page(), "image/png").unwrap();
        s.set_display_size(400.0, 300.0);
        s.set_drawing_mode(DrawingMode::Select);
        s.set_selection(NormRect::new(0.1, 0.2, 0.5, 0.1)).unwrap();

        match s.extract_selection().await.unwrap() {
            ExtractionState::Failed(human) => assert!(human.retriable),
            other => panic!("expected failure, got {other:?}"),
        }

        let state = s.retry().await.unwrap();
        assert_eq!(state, ExtractionState::Succeeded("second time lucky".into()));
        assert_eq!(s.service().calls(), 2);
    }

    #[tokio::test]
    async fn second_trigger_while_extracting_is_rejected() {
        let s = session(ScriptedService::replying([ok("done")]).slow(Duration::from_millis(30)));
        s.set_image(lined_page(), "image/png").unwrap();

        let (first, second) = tokio::join!(s.extract_full_image(), s.extract_full_image());
        assert_eq!(first.unwrap(), ExtractionState::Succeeded("done".into()));
        assert!(matches!(second, Err(MarginaliaError::ExtractionInFlight)));
        assert_eq!(s.service().calls(), 1);
    }

    #[tokio::test]
    async fn result_for_replaced_photo_is_discarded() {
        let s = session(ScriptedService::replying([ok("stale")]).slow(Duration::from_millis(50)));
        s.set_image(lined_page(), "image/png").unwrap();

        let (state, replaced) = tokio::join!(s.extract_full_image(), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            s.set_image(lined_page(), "image/png")
        });
        replaced.unwrap();
        assert_eq!(state.unwrap(), ExtractionState::Idle);
        assert_eq!(s.state(), ExtractionState::Idle);
        assert_eq!(s.captured_text(), None);
    }

    #[tokio::test]
    async fn new_photo_waits_for_the_stale_call() {
        let service = ScriptedService::replying([ok("stale"), ok("fresh")]);
        let s = session(service.slow(Duration::from_millis(50)));
        s.set_image(lined_page(), "image/png").unwrap();

        let (stale, second) = tokio::join!(s.extract_full_image(), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            s.set_image(lined_page(), "image/png").unwrap();
            s.extract_full_image().await
        });
        assert!(matches!(second, Err(MarginaliaError::ExtractionInFlight)));
        assert_eq!(stale.unwrap(), ExtractionState::Idle);
        assert_eq!(s.service().calls(), 1);

        let state = s.extract_full_image().await.unwrap();
        assert_eq!(state, ExtractionState::Succeeded("fresh".into()));
    }

    #[tokio::test]
    async fn dropped_extraction_frees_the_session() {
        let s = session(ScriptedService::replying([ok("fresh")]).slow(Duration::from_millis(50)));
        s.set_image(lined_page(), "image/png").unwrap();

        let timed_out =
            tokio::time::timeout(Duration::from_millis(5), s.extract_full_image()).await;
        assert!(timed_out.is_err());
        assert_eq!(s.state(), ExtractionState::Idle);

        let state = s.extract_full_image().await.unwrap();
        assert_eq!(state, ExtractionState::Succeeded("fresh".into()));
        assert_eq!(s.service().calls(), 2);
    }

    #[tokio::test]
    async fn acknowledge_returns_to_idle() {
        let s = blank_session(ScriptedService::default());
        s.extract_highlight(HighlightMode::Tight).await.unwrap();
        assert!(s.state().is_terminal());
        s.acknowledge();
        assert_eq!(s.state(), ExtractionState::Idle);
    }

    #[tokio::test]
    async fn missing_preconditions_are_errors() {
        let s = session(ScriptedService::default());
        assert!(matches!(
            s.extract_full_image().await,
            Err(MarginaliaError::NoImage)
        ));
        assert!(matches!(s.retry().await, Err(MarginaliaError::NothingToRetry)));

        s.set_image(lined_page(), "image/png").unwrap();
        assert!(matches!(
            s.extract_highlight(HighlightMode::Tight).await,
            Err(MarginaliaError::NoAnnotation("highlight"))
        ));
        assert!(matches!(
            s.extract_selection().await,
            Err(MarginaliaError::NoAnnotation("selection"))
        ));
        assert_eq!(s.state(), ExtractionState::Idle);
    }

    #[test]
    fn drawing_requires_the_matching_tool() {
        let s = session(ScriptedService::default());
        s.set_image(lined_page(), "image/png").unwrap();

        assert!(matches!(
            s.begin_stroke(Point::new(0.1, 0.1), 4.0),
            Err(MarginaliaError::DrawingMode(_))
        ));
        s.set_drawing_mode(DrawingMode::Highlight);
        assert!(matches!(
            s.set_selection(NormRect::new(0.1, 0.1, 0.2, 0.2)),
            Err(MarginaliaError::DrawingMode(_))
        ));
    }

    #[test]
    fn selection_and_strokes_replace_each_other() {
        let s = session(ScriptedService::default());
        s.set_image(lined_page(), "image/png").unwrap();

        draw(&s, Point::new(0.1, 0.1), Point::new(0.4, 0.1), 4.0);
        assert!(matches!(s.annotation(), Some(Annotation::Highlight(ref v)) if v.len() == 1));

        s.set_drawing_mode(DrawingMode::Select);
        let rect = NormRect::new(0.2, 0.2, 0.3, 0.3);
        s.set_selection(rect).unwrap();
        assert_eq!(s.annotation(), Some(Annotation::Selection(rect)));

        draw(&s, Point::new(0.1, 0.5), Point::new(0.4, 0.5), 4.0);
        assert!(matches!(s.annotation(), Some(Annotation::Highlight(_))));
    }

    #[test]
    fn new_photo_clears_annotations() {
        let s = session(ScriptedService::default());
        let first = s.set_image(lined_page(), "image/png").unwrap();
        draw(&s, Point::new(0.1, 0.1), Point::new(0.4, 0.1), 4.0);
        s.begin_stroke(Point::new(0.5, 0.5), 4.0).unwrap();

        let second = s.set_image(lined_page(), "image/png").unwrap();
        assert_ne!(first, second);
        assert_eq!(s.annotation(), None);
        s.commit_stroke().unwrap();
        assert_eq!(s.annotation(), None);
    }

    #[test]
    fn undecodable_photo_is_rejected() {
        let s = session(ScriptedService::default());
        assert!(matches!(
            s.set_image(b"nope".to_vec(), "image/jpeg"),
            Err(MarginaliaError::ImageError(_))
        ));
        assert_eq!(s.capture_id(), None);
    }
}
