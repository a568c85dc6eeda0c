// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Chunked transfer of large text payloads across the message channel.
//
// A payload that fits in one chunk is sent as a single ordinary message.
// Anything larger is framed as START, CHUNK x N, END, all tagged with one
// transfer id. The receiver keeps at most one session per direction; a new
// START discards whatever was in flight.

use std::collections::BTreeMap;

use tracing::{debug, info, instrument, warn};

use penscript_core::config::ChunkProfile;
use penscript_core::error::{PenscriptError, Result};
use penscript_core::messages::TransferFrame;
use penscript_core::types::TransferId;

/// Whether `payload` has to be split for `profile`.
pub fn needs_chunking(payload: &str, profile: &ChunkProfile) -> bool {
    payload.len() > profile.chunk_size
}

/// Split `payload` into pieces of at most `chunk_size` bytes, never cutting
/// a UTF-8 character in half.
///
/// For ASCII payloads (base64) this yields exactly `ceil(len / chunk_size)`
/// pieces.
pub fn plan_chunks(payload: &str, chunk_size: usize) -> Vec<&str> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::with_capacity(payload.len().div_ceil(chunk_size));
    let mut start = 0;
    while start < payload.len() {
        let mut end = (start + chunk_size).min(payload.len());
        while !payload.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            // Chunk smaller than one character: take the whole character.
            end = start + 1;
            while !payload.is_char_boundary(end) {
                end += 1;
            }
        }
        chunks.push(&payload[start..end]);
        start = end;
    }
    chunks
}

/// Send `payload` as a framed transfer, pausing after every chunk so the
/// receiving side is never flooded.
///
/// `emit` posts one frame; the first error aborts the transfer.
#[instrument(skip_all, fields(bytes = payload.len()))]
pub async fn send_chunked<F>(
    payload: &str,
    profile: &ChunkProfile,
    mut emit: F,
) -> Result<TransferId>
where
    F: FnMut(TransferFrame) -> Result<()>,
{
    let transfer_id = TransferId::new();
    let chunks = plan_chunks(payload, profile.chunk_size);
    let total_chunks = chunks.len();
    let pause = profile.yield_for(total_chunks);
    info!(%transfer_id, total_chunks, "starting chunked transfer");

    emit(TransferFrame::Start {
        transfer_id: transfer_id.clone(),
        total_chunks,
    })?;

    for (chunk_index, chunk) in chunks.into_iter().enumerate() {
        emit(TransferFrame::Chunk {
            transfer_id: transfer_id.clone(),
            chunk_index,
            chunk: chunk.to_string(),
            is_last: chunk_index + 1 == total_chunks,
        })?;
        tokio::time::sleep(pause).await;
    }

    emit(TransferFrame::End {
        transfer_id: transfer_id.clone(),
    })?;
    debug!(%transfer_id, "chunked transfer sent");
    Ok(transfer_id)
}

/// One in-flight receive session.
///
/// Chunks are held by index as they arrive; nothing is reserved up front for
/// the announced count.
#[derive(Debug)]
pub struct TransferSession {
    pub transfer_id: TransferId,
    pub total_chunks: usize,
    received: BTreeMap<usize, String>,
}

impl TransferSession {
    fn new(transfer_id: TransferId, total_chunks: usize) -> Self {
        Self {
            transfer_id,
            total_chunks,
            received: BTreeMap::new(),
        }
    }

    pub fn received_count(&self) -> usize {
        self.received.len()
    }

    pub fn is_complete(&self) -> bool {
        self.received_count() == self.total_chunks
    }
}

/// Reassembles framed transfers for one direction.
#[derive(Debug, Default)]
pub struct TransferReceiver {
    session: Option<TransferSession>,
}

impl TransferReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&TransferSession> {
        self.session.as_ref()
    }

    /// Drop any in-flight session.
    pub fn reset(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(transfer_id = %session.transfer_id, "transfer session cleared");
        }
    }

    /// Feed one frame. Returns the reassembled payload when an `END` for the
    /// active session completes it.
    ///
    /// Frames for any other transfer id are discarded silently.
    pub fn accept(&mut self, frame: TransferFrame) -> Result<Option<String>> {
        match frame {
            TransferFrame::Start {
                transfer_id,
                total_chunks,
            } => {
                if total_chunks == 0 {
                    return Err(PenscriptError::Transfer {
                        transfer_id: transfer_id.0,
                        reason: "announced zero chunks".into(),
                    });
                }
                if let Some(old) = self.session.take() {
                    warn!(
                        discarded = %old.transfer_id,
                        received = old.received_count(),
                        expected = old.total_chunks,
                        "new transfer replaces unfinished session"
                    );
                }
                debug!(%transfer_id, total_chunks, "transfer session opened");
                self.session = Some(TransferSession::new(transfer_id, total_chunks));
                Ok(None)
            }

            TransferFrame::Chunk {
                transfer_id,
                chunk_index,
                chunk,
                is_last,
            } => {
                let Some(session) = self.active_for(&transfer_id) else {
                    return Ok(None);
                };
                if chunk_index >= session.total_chunks {
                    return Err(PenscriptError::Transfer {
                        transfer_id: transfer_id.0,
                        reason: format!(
                            "chunk index {chunk_index} out of range for {} chunks",
                            session.total_chunks
                        ),
                    });
                }
                if is_last && chunk_index + 1 != session.total_chunks {
                    debug!(%transfer_id, chunk_index, "isLast set on a non-final index");
                }
                session.received.insert(chunk_index, chunk);
                Ok(None)
            }

            TransferFrame::End { transfer_id } => {
                if self.active_for(&transfer_id).is_none() {
                    return Ok(None);
                }
                let Some(session) = self.session.take() else {
                    return Ok(None);
                };
                let received = session.received_count();
                if received != session.total_chunks {
                    return Err(PenscriptError::TransferIncomplete {
                        transfer_id: transfer_id.0,
                        received,
                        expected: session.total_chunks,
                    });
                }
                let payload: String = session.received.into_values().collect();
                info!(%transfer_id, bytes = payload.len(), "transfer reassembled");
                Ok(Some(payload))
            }
        }
    }

    fn active_for(&mut self, transfer_id: &TransferId) -> Option<&mut TransferSession> {
        match self.session.as_mut() {
            Some(session) if &session.transfer_id == transfer_id => Some(session),
            _ => {
                debug!(%transfer_id, "discarding frame for inactive transfer");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_profile(chunk_size: usize) -> ChunkProfile {
        ChunkProfile {
            chunk_size,
            yield_short_ms: 0,
            yield_long_ms: 0,
            long_threshold: 20,
        }
    }

    fn start(id: &str, total_chunks: usize) -> TransferFrame {
        TransferFrame::Start {
            transfer_id: id.into(),
            total_chunks,
        }
    }

    fn chunk(id: &str, chunk_index: usize, data: &str) -> TransferFrame {
        TransferFrame::Chunk {
            transfer_id: id.into(),
            chunk_index,
            chunk: data.into(),
            is_last: false,
        }
    }

    fn end(id: &str) -> TransferFrame {
        TransferFrame::End {
            transfer_id: id.into(),
        }
    }

    #[test]
    fn chunk_count_is_ceiling_of_length_over_size() {
        let payload = "A".repeat(1_000_001);
        let chunks = plan_chunks(&payload, 250_000);
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[4].len(), 1);
        assert_eq!(plan_chunks(&"A".repeat(500_000), 250_000).len(), 2);
        assert!(plan_chunks("", 10).is_empty());
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let payload = "éàü".repeat(10);
        let chunks = plan_chunks(&payload, 5);
        assert!(chunks.iter().all(|c| c.len() <= 5));
        assert_eq!(chunks.concat(), payload);
    }

    #[test]
    fn out_of_order_chunks_reassemble_by_index() {
        let mut rx = TransferReceiver::new();
        rx.accept(start("t1", 3)).unwrap();
        rx.accept(chunk("t1", 2, "ghi")).unwrap();
        rx.accept(chunk("t1", 0, "abc")).unwrap();
        rx.accept(chunk("t1", 1, "def")).unwrap();
        assert_eq!(rx.accept(end("t1")).unwrap().as_deref(), Some("abcdefghi"));
        assert!(rx.session().is_none());
    }

    #[test]
    fn new_start_discards_stale_session() {
        let mut rx = TransferReceiver::new();
        rx.accept(start("old", 2)).unwrap();
        rx.accept(chunk("old", 0, "xx")).unwrap();
        rx.accept(start("new", 1)).unwrap();
        // Late frames from the abandoned transfer are ignored.
        rx.accept(chunk("old", 1, "yy")).unwrap();
        assert_eq!(rx.accept(end("old")).unwrap(), None);
        rx.accept(chunk("new", 0, "payload")).unwrap();
        assert_eq!(rx.accept(end("new")).unwrap().as_deref(), Some("payload"));
    }

    #[test]
    fn end_with_missing_chunks_is_an_error() {
        let mut rx = TransferReceiver::new();
        rx.accept(start("t", 3)).unwrap();
        rx.accept(chunk("t", 0, "a")).unwrap();
        let err = rx.accept(end("t")).unwrap_err();
        assert!(matches!(
            err,
            PenscriptError::TransferIncomplete {
                received: 1,
                expected: 3,
                ..
            }
        ));
        assert!(rx.session().is_none());
    }

    #[test]
    fn huge_announced_count_reserves_nothing() {
        let mut rx = TransferReceiver::new();
        rx.accept(start("big", 1 << 60)).unwrap();
        rx.accept(chunk("big", 7, "seven")).unwrap();
        assert_eq!(rx.session().unwrap().received_count(), 1);

        let err = rx.accept(end("big")).unwrap_err();
        assert!(matches!(
            err,
            PenscriptError::TransferIncomplete {
                received: 1,
                expected,
                ..
            } if expected == 1 << 60
        ));

        // The receiver is still usable afterwards.
        rx.accept(start("next", 1)).unwrap();
        rx.accept(chunk("next", 0, "ok")).unwrap();
        assert_eq!(rx.accept(end("next")).unwrap().as_deref(), Some("ok"));
    }

    #[test]
    fn out_of_range_index_and_zero_chunks_are_rejected() {
        let mut rx = TransferReceiver::new();
        assert!(rx.accept(start("z", 0)).is_err());
        rx.accept(start("t", 1)).unwrap();
        assert!(rx.accept(chunk("t", 1, "x")).is_err());
        assert!(rx.session().is_some());
    }

    #[tokio::test]
    async fn sender_output_reassembles_byte_exact() {
        let payload: String = (0..2_000).map(|i| char::from(b'A' + (i % 26) as u8)).collect();
        let mut frames = Vec::new();
        let id = send_chunked(&payload, &tiny_profile(300), |f| {
            frames.push(f);
            Ok(())
        })
        .await
        .unwrap();

        // START + 7 chunks + END
        assert_eq!(frames.len(), 9);
        assert!(matches!(&frames[0], TransferFrame::Start { total_chunks: 7, .. }));
        assert!(matches!(&frames[7], TransferFrame::Chunk { chunk_index: 6, is_last: true, .. }));

        let mut rx = TransferReceiver::new();
        let mut out = None;
        for frame in frames {
            if let Some(done) = rx.accept(frame).unwrap() {
                out = Some(done);
            }
        }
        assert_eq!(out.as_deref(), Some(payload.as_str()));
        assert!(id.0.starts_with("pdf-"));
    }

    #[test]
    fn small_payload_goes_direct() {
        let profile = tiny_profile(10);
        assert!(!needs_chunking("0123456789", &profile));
        assert!(needs_chunking("0123456789a", &profile));
    }
}
