// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages shown when an extraction fails.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The severity drives how the failure is presented next to the photo.

use serde::Serialize;

use crate::error::MarginaliaError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    /// Network blip or service hiccup; retrying is likely to help.
    Transient,
    /// User must do something (take a photo, draw a highlight).
    ActionRequired,
    /// Retrying the same input will not help.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether offering a Retry button makes sense.
    pub retriable: bool,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

/// Convert a `MarginaliaError` into a `HumanError` for the extraction sheet.
pub fn humanize_error(err: &MarginaliaError) -> HumanError {
    match err {
        MarginaliaError::ImageError(_) => HumanError {
            message: "There's a problem with this photo.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try taking the photo again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        MarginaliaError::Recognition(detail) => humanize_recognition_error(detail),

        MarginaliaError::ExtractionInFlight => HumanError {
            message: "We're still reading the previous selection.".into(),
            suggestion: "Wait for the current extraction to finish, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        MarginaliaError::NoImage => HumanError {
            message: "There's no photo to read yet.".into(),
            suggestion: "Take a photo of the page or pick one from your library first.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        MarginaliaError::NoAnnotation(what) => HumanError {
            message: format!("No {what} has been drawn."),
            suggestion: "Draw over the text you want to keep, then tap Extract.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        MarginaliaError::NothingToRetry => HumanError {
            message: "There's nothing to try again.".into(),
            suggestion: "Start an extraction first.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        MarginaliaError::DrawingMode(_) => HumanError {
            message: "That drawing tool isn't active.".into(),
            suggestion: "Pick the highlighter or the selection tool, then draw again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        MarginaliaError::InvalidConfig(detail) => HumanError {
            message: "The extraction settings look wrong.".into(),
            suggestion: format!("Reset the settings to their defaults. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        MarginaliaError::Io(_) => HumanError {
            message: "There was a problem reading or writing a file.".into(),
            suggestion: "Try again. If this keeps happening, your device's storage may be full.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        MarginaliaError::Serialization(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

/// Parse recognition-service failure details into human-readable messages.
fn humanize_recognition_error(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("timed out") || lower.contains("timeout") {
        HumanError {
            message: "Text recognition took too long.".into(),
            suggestion: "Check your connection and tap Retry.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("rate limit") || lower.contains("429") {
        HumanError {
            message: "Text recognition is busy right now.".into(),
            suggestion: "Wait a few seconds, then tap Retry.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("too large") || lower.contains("413") {
        HumanError {
            message: "This selection is too big to read in one go.".into(),
            suggestion: "Highlight a smaller part of the page and try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("unauthorized") || lower.contains("401") || lower.contains("403") {
        HumanError {
            message: "You're signed out of text recognition.".into(),
            suggestion: "Sign in again, then tap Retry.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        }
    } else {
        HumanError {
            message: "We couldn't read the text.".into(),
            suggestion: format!("Tap Retry. If this keeps happening, try a clearer photo. (Detail: {detail})"),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}
