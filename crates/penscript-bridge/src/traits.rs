// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Trait seams between the bridge and everything it does not own: how the
// engine is hosted, where connectivity comes from, and the host platform's
// storage, share and picker capabilities.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc::UnboundedSender;

use penscript_core::error::Result;

/// Something the engine host reports back to the bridge.
///
/// Every event carries the generation of the engine instance it came from so
/// the bridge can drop events from instances it has already replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A serialized `EngineMessage`.
    Message { generation: u64, raw: String },
    /// The engine instance is gone. `did_crash` is false for a clean exit.
    Terminated { generation: u64, did_crash: bool },
}

/// Handle to one running engine instance.
pub trait EngineLink: Send + Sync {
    /// Post one serialized `HostMessage` into the engine. Fire-and-forget.
    fn post(&self, raw: String) -> Result<()>;

    /// Tear the instance down. Any termination event it reports afterwards
    /// is stale and ignored.
    fn shutdown(&self);
}

/// Starts engine instances.
pub trait EngineLauncher: Send + Sync {
    /// Launch a fresh engine instance for `generation`, reporting its
    /// messages and termination on `events`.
    fn launch(
        &self,
        generation: u64,
        events: UnboundedSender<EngineEvent>,
    ) -> Result<Box<dyn EngineLink>>;
}

/// Online/offline flag consulted before network-dependent sends.
pub trait ConnectivitySource: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Read and write binary documents in app storage.
pub trait DocumentStore: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write `bytes` under `name` and return where they landed.
    fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Share content via the OS share sheet.
pub trait ShareTarget: Send + Sync {
    fn share_file(&self, path: &Path, mime_type: &str) -> Result<()>;
}

/// Pick files from the device storage.
pub trait FilePicker: Send + Sync {
    /// Show a file picker filtered to the given MIME types.
    /// Returns the file chosen, or None if cancelled.
    fn pick_file(&self, mime_types: &[&str]) -> Result<Option<PathBuf>>;
}
