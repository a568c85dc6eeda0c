// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every wire error code is mapped to plain English with a suggestion and the
// action the UI should offer (retry, restart the engine, or just dismiss).

use crate::error::{ErrorCode, PenscriptError};

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip, timeout, engine hiccup.
    Transient,
    /// User must do something (pick another file, shorten the text).
    ActionRequired,
    /// Cannot be fixed by retrying.
    Permanent,
}

/// What the dialog should offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Retry,
    /// Tear down and relaunch the rendering engine.
    Restart,
    Dismiss,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    pub action: UserAction,
    pub severity: Severity,
}

impl HumanError {
    fn new(message: &str, suggestion: &str, action: UserAction, severity: Severity) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            action,
            severity,
        }
    }

    pub fn retriable(&self) -> bool {
        self.action != UserAction::Dismiss
    }
}

/// Map a wire error code to a user-facing message.
pub fn humanize(code: ErrorCode) -> HumanError {
    use Severity::*;
    use UserAction::*;

    match code {
        ErrorCode::NetworkOffline => HumanError::new(
            "You're offline.",
            "Handwriting fonts need an internet connection the first time. Connect and try again.",
            Retry,
            Transient,
        ),
        ErrorCode::WebviewCrash => HumanError::new(
            "The page renderer stopped unexpectedly.",
            "Restart the renderer. Anything that was being generated will need to be started again.",
            Restart,
            Transient,
        ),
        ErrorCode::WebviewError | ErrorCode::LibraryNotLoaded => HumanError::new(
            "The page renderer isn't ready.",
            "Restart the renderer and try again.",
            Restart,
            Transient,
        ),
        ErrorCode::PdfPasswordProtected => HumanError::new(
            "This PDF is password protected.",
            "Remove the password in another app, then import the PDF again.",
            Dismiss,
            ActionRequired,
        ),
        ErrorCode::PdfInvalid => HumanError::new(
            "This file doesn't look like a valid PDF.",
            "The file may be damaged. Try exporting it again or choose a different file.",
            Dismiss,
            Permanent,
        ),
        ErrorCode::PdfExtractError => HumanError::new(
            "We couldn't read the text in this PDF.",
            "Scanned PDFs often contain pictures of text rather than text. Try another file.",
            Dismiss,
            Permanent,
        ),
        ErrorCode::PaginationOverflow => HumanError::new(
            "The text couldn't be split into pages.",
            "Try a smaller font size or shorter text.",
            Dismiss,
            ActionRequired,
        ),
        ErrorCode::StyleError | ErrorCode::PreviewError => HumanError::new(
            "The page style couldn't be applied.",
            "Check the font, colour and spacing settings, then try again.",
            Retry,
            ActionRequired,
        ),
        ErrorCode::NoImages => HumanError::new(
            "There are no pages to save yet.",
            "Generate the handwriting pages first, then create the PDF.",
            Dismiss,
            ActionRequired,
        ),
        ErrorCode::PdfBlobError | ErrorCode::GenerationError => HumanError::new(
            "Generating the pages failed.",
            "Try again. Very long text may need to be split into several documents.",
            Retry,
            Transient,
        ),
        ErrorCode::TransferError => HumanError::new(
            "The file didn't arrive in one piece.",
            "Try again. Large files are sent in parts and one of them went missing.",
            Retry,
            Transient,
        ),
        ErrorCode::Unknown => HumanError::new(
            "Something went wrong.",
            "Try again. If this keeps happening, restart the app.",
            Retry,
            Transient,
        ),
    }
}

/// Convert a `PenscriptError` into a `HumanError`.
///
/// Errors without a dedicated wire code get a more specific message than the
/// generic `UNKNOWN` text where the variant says more.
pub fn humanize_error(err: &PenscriptError) -> HumanError {
    match err {
        PenscriptError::Timeout { .. } => HumanError::new(
            "This is taking longer than expected.",
            "You can keep waiting or cancel and try again with shorter text.",
            UserAction::Retry,
            Severity::Transient,
        ),
        PenscriptError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
            HumanError::new(
                "The file couldn't be found.",
                "It may have been moved or deleted. Try choosing the file again.",
                UserAction::Dismiss,
                Severity::ActionRequired,
            )
        }
        PenscriptError::PlatformUnavailable => HumanError::new(
            "This feature isn't available on your device.",
            "Some features need a specific platform.",
            UserAction::Dismiss,
            Severity::Permanent,
        ),
        other => humanize(other.code()),
    }
}
