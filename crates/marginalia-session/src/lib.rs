// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// marginalia-session — Per-capture extraction session.
//
// Owns the captured photo and the user's annotation, drives the region
// pipeline, and sends the resulting payloads to a text-recognition service.
// The service call is the only await point; everything else is synchronous.

pub mod response;
pub mod service;
pub mod session;

pub use response::normalize_response;
pub use service::{RecognitionRequest, RecognitionService, STRICT_INSTRUCTION};
pub use session::{ExtractionSession, ExtractionState};
