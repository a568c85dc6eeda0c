// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire envelope exchanged between the host and the sandboxed engine.
//
// Every message is a JSON object tagged by `type`, e.g.
// `{"type":"PDF_DATA_CHUNK","transferId":"pdf-…","chunkIndex":3,…}`.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, PenscriptError, Result};
use crate::types::{GenerationConfig, ProgressStep, TransferId};

/// Messages posted by the host into the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum HostMessage {
    UpdatePreview {
        text: String,
        config: GenerationConfig,
    },
    GenerateImage {
        text: String,
        config: GenerationConfig,
    },
    GeneratePdf {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        images: Option<Vec<String>>,
    },
    ExtractTextFromPdf {
        data: String,
    },
    PdfDataStart {
        transfer_id: TransferId,
        total_chunks: usize,
    },
    PdfDataChunk {
        transfer_id: TransferId,
        chunk_index: usize,
        chunk: String,
        is_last: bool,
    },
    PdfDataEnd {
        transfer_id: TransferId,
    },
}

/// Messages posted by the engine back to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum EngineMessage {
    WebviewReady,
    Success {
        images: Vec<String>,
    },
    PreviewReady {
        image: String,
    },
    PdfSuccess {
        data: String,
    },
    PdfTextExtracted {
        data: String,
    },
    Progress {
        step: ProgressStep,
        current: usize,
        total: usize,
        message: String,
    },
    Error {
        data: String,
        code: ErrorCode,
    },
    PdfResultStart {
        transfer_id: TransferId,
        total_chunks: usize,
    },
    PdfResultChunk {
        transfer_id: TransferId,
        chunk_index: usize,
        chunk: String,
        is_last: bool,
    },
    PdfResultEnd {
        transfer_id: TransferId,
    },
}

/// Direction-neutral view of one transfer-protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferFrame {
    Start {
        transfer_id: TransferId,
        total_chunks: usize,
    },
    Chunk {
        transfer_id: TransferId,
        chunk_index: usize,
        chunk: String,
        is_last: bool,
    },
    End {
        transfer_id: TransferId,
    },
}

impl HostMessage {
    /// Short name used in logs (the wire `type` tag).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpdatePreview { .. } => "UPDATE_PREVIEW",
            Self::GenerateImage { .. } => "GENERATE_IMAGE",
            Self::GeneratePdf { .. } => "GENERATE_PDF",
            Self::ExtractTextFromPdf { .. } => "EXTRACT_TEXT_FROM_PDF",
            Self::PdfDataStart { .. } => "PDF_DATA_START",
            Self::PdfDataChunk { .. } => "PDF_DATA_CHUNK",
            Self::PdfDataEnd { .. } => "PDF_DATA_END",
        }
    }

    /// Returns the transfer frame carried by this message, if any.
    pub fn as_transfer_frame(&self) -> Option<TransferFrame> {
        match self {
            Self::PdfDataStart {
                transfer_id,
                total_chunks,
            } => Some(TransferFrame::Start {
                transfer_id: transfer_id.clone(),
                total_chunks: *total_chunks,
            }),
            Self::PdfDataChunk {
                transfer_id,
                chunk_index,
                chunk,
                is_last,
            } => Some(TransferFrame::Chunk {
                transfer_id: transfer_id.clone(),
                chunk_index: *chunk_index,
                chunk: chunk.clone(),
                is_last: *is_last,
            }),
            Self::PdfDataEnd { transfer_id } => Some(TransferFrame::End {
                transfer_id: transfer_id.clone(),
            }),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl EngineMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WebviewReady => "WEBVIEW_READY",
            Self::Success { .. } => "SUCCESS",
            Self::PreviewReady { .. } => "PREVIEW_READY",
            Self::PdfSuccess { .. } => "PDF_SUCCESS",
            Self::PdfTextExtracted { .. } => "PDF_TEXT_EXTRACTED",
            Self::Progress { .. } => "PROGRESS",
            Self::Error { .. } => "ERROR",
            Self::PdfResultStart { .. } => "PDF_RESULT_START",
            Self::PdfResultChunk { .. } => "PDF_RESULT_CHUNK",
            Self::PdfResultEnd { .. } => "PDF_RESULT_END",
        }
    }

    /// Build an `ERROR` event from an engine-local failure.
    pub fn from_error(err: &PenscriptError) -> Self {
        Self::Error {
            data: err.to_string(),
            code: err.code(),
        }
    }

    pub fn as_transfer_frame(&self) -> Option<TransferFrame> {
        match self {
            Self::PdfResultStart {
                transfer_id,
                total_chunks,
            } => Some(TransferFrame::Start {
                transfer_id: transfer_id.clone(),
                total_chunks: *total_chunks,
            }),
            Self::PdfResultChunk {
                transfer_id,
                chunk_index,
                chunk,
                is_last,
            } => Some(TransferFrame::Chunk {
                transfer_id: transfer_id.clone(),
                chunk_index: *chunk_index,
                chunk: chunk.clone(),
                is_last: *is_last,
            }),
            Self::PdfResultEnd { transfer_id } => Some(TransferFrame::End {
                transfer_id: transfer_id.clone(),
            }),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Build host-to-engine messages for a chunked `PDF_DATA_*` transfer.
pub fn host_frame(frame: TransferFrame) -> HostMessage {
    match frame {
        TransferFrame::Start {
            transfer_id,
            total_chunks,
        } => HostMessage::PdfDataStart {
            transfer_id,
            total_chunks,
        },
        TransferFrame::Chunk {
            transfer_id,
            chunk_index,
            chunk,
            is_last,
        } => HostMessage::PdfDataChunk {
            transfer_id,
            chunk_index,
            chunk,
            is_last,
        },
        TransferFrame::End { transfer_id } => HostMessage::PdfDataEnd { transfer_id },
    }
}

/// Build engine-to-host messages for a chunked `PDF_RESULT_*` transfer.
pub fn engine_frame(frame: TransferFrame) -> EngineMessage {
    match frame {
        TransferFrame::Start {
            transfer_id,
            total_chunks,
        } => EngineMessage::PdfResultStart {
            transfer_id,
            total_chunks,
        },
        TransferFrame::Chunk {
            transfer_id,
            chunk_index,
            chunk,
            is_last,
        } => EngineMessage::PdfResultChunk {
            transfer_id,
            chunk_index,
            chunk,
            is_last,
        },
        TransferFrame::End { transfer_id } => EngineMessage::PdfResultEnd { transfer_id },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_message_uses_wire_names() {
        let msg = HostMessage::PdfDataChunk {
            transfer_id: "pdf-1".into(),
            chunk_index: 2,
            chunk: "QUJD".into(),
            is_last: true,
        };
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "PDF_DATA_CHUNK");
        assert_eq!(json["transferId"], "pdf-1");
        assert_eq!(json["chunkIndex"], 2);
        assert_eq!(json["isLast"], true);
    }

    #[test]
    fn ready_signal_parses_without_payload() {
        let msg = EngineMessage::from_json(r#"{"type":"WEBVIEW_READY"}"#).unwrap();
        assert_eq!(msg, EngineMessage::WebviewReady);
    }

    #[test]
    fn generate_pdf_images_are_optional() {
        let msg = HostMessage::from_json(r#"{"type":"GENERATE_PDF"}"#).unwrap();
        assert_eq!(msg, HostMessage::GeneratePdf { images: None });
        assert_eq!(msg.to_json().unwrap(), r#"{"type":"GENERATE_PDF"}"#);
    }

    #[test]
    fn error_event_carries_stable_code() {
        let msg = EngineMessage::from_error(&PenscriptError::PdfPasswordProtected);
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "ERROR");
        assert_eq!(json["code"], "PDF_PASSWORD_PROTECTED");
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(EngineMessage::from_json(r#"{"type":"NOPE"}"#).is_err());
        assert!(HostMessage::from_json("not json").is_err());
    }

    #[test]
    fn frames_map_back_to_messages() {
        let frame = TransferFrame::End {
            transfer_id: "pdf-9".into(),
        };
        let msg = host_frame(frame.clone());
        assert_eq!(msg.as_transfer_frame(), Some(frame.clone()));
        assert_eq!(engine_frame(frame.clone()).as_transfer_frame(), Some(frame));
    }
}
