// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Penscript.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error code carried by `ERROR` events on the wire.
///
/// Codes are never collapsed: each failure kind keeps its own code so the
/// host can show a specific message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    PdfPasswordProtected,
    PdfInvalid,
    PdfExtractError,
    #[serde(alias = "PDFJS_NOT_LOADED")]
    LibraryNotLoaded,
    GenerationError,
    StyleError,
    PreviewError,
    PaginationOverflow,
    PdfBlobError,
    NoImages,
    NetworkOffline,
    TransferError,
    WebviewCrash,
    WebviewError,
    #[serde(other)]
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PdfPasswordProtected => "PDF_PASSWORD_PROTECTED",
            Self::PdfInvalid => "PDF_INVALID",
            Self::PdfExtractError => "PDF_EXTRACT_ERROR",
            Self::LibraryNotLoaded => "LIBRARY_NOT_LOADED",
            Self::GenerationError => "GENERATION_ERROR",
            Self::StyleError => "STYLE_ERROR",
            Self::PreviewError => "PREVIEW_ERROR",
            Self::PaginationOverflow => "PAGINATION_OVERFLOW",
            Self::PdfBlobError => "PDF_BLOB_ERROR",
            Self::NoImages => "NO_IMAGES",
            Self::NetworkOffline => "NETWORK_OFFLINE",
            Self::TransferError => "TRANSFER_ERROR",
            Self::WebviewCrash => "WEBVIEW_CRASH",
            Self::WebviewError => "WEBVIEW_ERROR",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for all Penscript operations.
#[derive(Debug, Error)]
pub enum PenscriptError {
    // -- Connectivity --
    #[error("this operation needs an internet connection")]
    Offline,

    // -- Transfer protocol --
    #[error("transfer {transfer_id} failed: {reason}")]
    Transfer { transfer_id: String, reason: String },

    #[error("transfer {transfer_id} ended with {received} of {expected} chunks")]
    TransferIncomplete {
        transfer_id: String,
        received: usize,
        expected: usize,
    },

    // -- Rendering pipeline --
    #[error("invalid style configuration: {0}")]
    Style(String),

    #[error("preview failed: {0}")]
    Preview(String),

    #[error("pagination exceeded {limit} iterations for {tokens} tokens")]
    PaginationOverflow { limit: usize, tokens: usize },

    #[error("page generation failed: {0}")]
    Generation(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Document assembly --
    #[error("no page images to assemble")]
    NoImages,

    #[error("PDF encoding failed: {0}")]
    PdfBlob(String),

    // -- Text extraction --
    #[error("the PDF is password protected")]
    PdfPasswordProtected,

    #[error("the PDF is invalid or corrupted: {0}")]
    PdfInvalid(String),

    #[error("text extraction failed: {0}")]
    PdfExtract(String),

    // -- Engine lifecycle --
    #[error("rendering engine is not loaded: {0}")]
    LibraryNotLoaded(String),

    #[error("rendering engine (generation {generation}) terminated unexpectedly")]
    EngineCrashed { generation: u64 },

    /// An `ERROR` event reported by the engine, surfaced on the host.
    #[error("engine reported {code}: {message}")]
    Engine { code: ErrorCode, message: String },

    #[error("bridge error: {0}")]
    Bridge(String),

    #[error("timed out after {seconds}s waiting for {operation}")]
    Timeout { operation: String, seconds: u64 },

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

impl PenscriptError {
    /// Stable wire code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Offline => ErrorCode::NetworkOffline,
            Self::Transfer { .. } | Self::TransferIncomplete { .. } => ErrorCode::TransferError,
            Self::Style(_) => ErrorCode::StyleError,
            Self::Preview(_) => ErrorCode::PreviewError,
            Self::PaginationOverflow { .. } => ErrorCode::PaginationOverflow,
            Self::Generation(_) | Self::ImageError(_) => ErrorCode::GenerationError,
            Self::NoImages => ErrorCode::NoImages,
            Self::PdfBlob(_) => ErrorCode::PdfBlobError,
            Self::PdfPasswordProtected => ErrorCode::PdfPasswordProtected,
            Self::PdfInvalid(_) => ErrorCode::PdfInvalid,
            Self::PdfExtract(_) => ErrorCode::PdfExtractError,
            Self::LibraryNotLoaded(_) => ErrorCode::LibraryNotLoaded,
            Self::EngineCrashed { .. } => ErrorCode::WebviewCrash,
            Self::Engine { code, .. } => *code,
            Self::Bridge(_) => ErrorCode::WebviewError,
            Self::Timeout { .. }
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::PlatformUnavailable => ErrorCode::Unknown,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PenscriptError>;
