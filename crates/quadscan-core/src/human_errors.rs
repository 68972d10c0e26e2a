// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every technical error is mapped to plain English with a clear suggestion,
// plus a severity that front ends use to decide how to present it.

use crate::error::QuadscanError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Another operation is running; trying again shortly will work.
    Transient,
    /// The user must change something (move a handle, load an image).
    ActionRequired,
    /// Cannot be fixed by retrying: bad file, bad configuration.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Whether simply repeating the request may succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `QuadscanError` into a `HumanError`.
pub fn humanize_error(err: &QuadscanError) -> HumanError {
    match err {
        QuadscanError::InvalidSelection { .. } => HumanError {
            message: "The selected area is empty.".into(),
            suggestion: "Drag the corner handles apart so they enclose the document, then crop again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        QuadscanError::InvalidHandleIndex(index) => HumanError {
            message: "That corner handle doesn't exist.".into(),
            suggestion: format!("Use a handle number from 0 to 3 (got {index})."),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        QuadscanError::NoSourceImage => HumanError {
            message: "No photo is open.".into(),
            suggestion: "Open a photo of your document first.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        QuadscanError::BusyRejected => HumanError {
            message: "Still working on the previous step.".into(),
            suggestion: "Wait a moment, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
        QuadscanError::InvalidBuffer { .. } | QuadscanError::ImageError(_) => HumanError {
            message: "We couldn't read this image.".into(),
            suggestion: format!("Try saving the photo as PNG or JPEG and open it again. ({err})"),
            retriable: false,
            severity: Severity::Permanent,
        },
        QuadscanError::Detector(detail) => HumanError {
            message: "Automatic corner detection failed.".into(),
            suggestion: format!("Place the corner handles by hand. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        QuadscanError::InvalidConfig(detail) => HumanError {
            message: "The settings file has a mistake in it.".into(),
            suggestion: format!("Fix the setting and try again. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },
        QuadscanError::Io(io_err) => HumanError {
            message: "A file could not be read or written.".into(),
            suggestion: format!("Check the file path and permissions. ({io_err})"),
            retriable: false,
            severity: Severity::Permanent,
        },
        QuadscanError::Serialization(json_err) => HumanError {
            message: "The settings file could not be understood.".into(),
            suggestion: format!("Make sure it is valid JSON. ({json_err})"),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}
