// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop/CI implementations of the host platform traits.
//
// Storage is a plain directory. There is no share sheet on desktop, and the
// "picker" hands back a path chosen up front (e.g. on the command line).

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use penscript_core::error::{PenscriptError, Result};

use crate::traits::{DocumentStore, FilePicker, ShareTarget};

/// Document store rooted at a directory on the local filesystem.
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DocumentStore for FsDocumentStore {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let full = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        debug!(path = %full.display(), "reading document");
        Ok(std::fs::read(full)?)
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let target = if Path::new(name).is_absolute() {
            PathBuf::from(name)
        } else {
            self.root.join(name)
        };
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, bytes)?;
        debug!(path = %target.display(), bytes = bytes.len(), "document written");
        Ok(target)
    }
}

/// Picker that returns a path supplied ahead of time.
pub struct PresetFilePicker {
    choice: Option<PathBuf>,
}

impl PresetFilePicker {
    pub fn new(choice: Option<PathBuf>) -> Self {
        Self { choice }
    }
}

impl FilePicker for PresetFilePicker {
    fn pick_file(&self, mime_types: &[&str]) -> Result<Option<PathBuf>> {
        debug!(?mime_types, chosen = ?self.choice, "preset file pick");
        Ok(self.choice.clone())
    }
}

/// No share sheet outside mobile platforms.
pub struct StubShare;

impl ShareTarget for StubShare {
    fn share_file(&self, _path: &Path, _mime_type: &str) -> Result<()> {
        warn!("ShareTarget::share_file called on stub platform");
        Err(PenscriptError::PlatformUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_writes_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let path = store.write("out/handwriting.pdf", b"%PDF-1.7").unwrap();
        assert!(path.starts_with(dir.path()));
        assert_eq!(store.read(Path::new("out/handwriting.pdf")).unwrap(), b"%PDF-1.7");
    }

    #[test]
    fn reading_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        assert!(matches!(
            store.read(Path::new("nope.pdf")),
            Err(PenscriptError::Io(_))
        ));
    }

    #[test]
    fn share_is_unavailable() {
        assert!(matches!(
            StubShare.share_file(Path::new("a.pdf"), "application/pdf"),
            Err(PenscriptError::PlatformUnavailable)
        ));
    }

    #[test]
    fn preset_picker_returns_choice() {
        let picker = PresetFilePicker::new(Some(PathBuf::from("in.pdf")));
        assert_eq!(
            picker.pick_file(&["application/pdf"]).unwrap(),
            Some(PathBuf::from("in.pdf"))
        );
        assert_eq!(PresetFilePicker::new(None).pick_file(&[]).unwrap(), None);
    }
}
