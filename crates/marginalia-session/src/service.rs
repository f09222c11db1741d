// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition service seam. The session never talks to a network client
// directly; hosts plug an implementation of `RecognitionService` in.

use std::future::Future;

use marginalia_core::error::Result;
use serde::Serialize;

/// Instruction sent with every payload, whatever the extraction kind.
pub const STRICT_INSTRUCTION: &str = "Transcribe only the text whose ink is visible in this image. \
Do not guess or complete words that are cut off or missing. \
If only part of the text is legible, return just that part. \
Respond with JSON of the form {\"text\": \"...\"}.";

/// One image payload for the recognition service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecognitionRequest {
    /// Encoded image bytes.
    #[serde(skip)]
    pub image: Vec<u8>,
    pub mime_type: String,
    pub instruction: String,
}

impl RecognitionRequest {
    /// A request carrying the strict instruction.
    pub fn strict(image: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            image,
            mime_type: mime_type.into(),
            instruction: STRICT_INSTRUCTION.to_string(),
        }
    }
}

/// External text-recognition service.
///
/// Returns the raw response body; the session normalizes it. Failures should
/// be reported as `MarginaliaError::Recognition` with the service's detail.
pub trait RecognitionService: Send + Sync {
    fn recognize(&self, request: RecognitionRequest)
    -> impl Future<Output = Result<String>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_request_carries_instruction() {
        let req = RecognitionRequest::strict(vec![1, 2, 3], "image/png");
        assert_eq!(req.mime_type, "image/png");
        assert_eq!(req.instruction, STRICT_INSTRUCTION);
        assert!(req.instruction.contains("Do not guess"));
    }
}
