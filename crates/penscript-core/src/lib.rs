// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Penscript — Core types, wire messages, and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod messages;
pub mod types;

pub use config::{AppConfig, ChunkProfile};
pub use error::{ErrorCode, PenscriptError};
pub use messages::{EngineMessage, HostMessage, TransferFrame};
pub use types::*;
