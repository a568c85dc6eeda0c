// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One command-line session: a running engine behind the bridge, plus the
// document store the command reads from and writes to.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use penscript_bridge::connectivity::{RouteConnectivity, SharedConnectivity};
use penscript_bridge::stub::FsDocumentStore;
use penscript_bridge::traits::{ConnectivitySource, DocumentStore};
use penscript_bridge::BridgeHost;
use penscript_core::config::AppConfig;
use penscript_core::error::{PenscriptError, Result};
use penscript_core::types::{GenerationConfig, TextLengthCheck};
use penscript_engine::TaskEngineLauncher;
use tracing::{info, instrument, warn};

/// Files produced by one `generate` run.
#[derive(Debug)]
pub struct GeneratedDocument {
    pub pdf: PathBuf,
    pub pages: usize,
    pub images: Vec<PathBuf>,
}

pub struct Session {
    host: BridgeHost,
    store: FsDocumentStore,
}

impl Session {
    /// Launch an engine and wait for it to become ready.
    pub async fn start(config: AppConfig, root: impl Into<PathBuf>) -> Result<Self> {
        let connectivity: Arc<dyn ConnectivitySource> = if config.require_network_for_rendering {
            Arc::new(RouteConnectivity::default())
        } else {
            Arc::new(SharedConnectivity::new(true))
        };
        let launcher = Arc::new(TaskEngineLauncher::from_config(&config));
        let host = BridgeHost::spawn(launcher, connectivity, config)?;
        host.wait_ready().await?;
        Ok(Self {
            host,
            store: FsDocumentStore::new(root),
        })
    }

    pub fn config(&self) -> &AppConfig {
        self.host.config()
    }

    // -- Generate --------------------------------------------------------------

    /// Render `text_file` and write the PDF to `out`. With `images_dir`, the
    /// page JPEGs are kept as `page-001.jpg`, `page-002.jpg`, ...
    #[instrument(skip(self, style))]
    pub async fn generate(
        &self,
        text_file: &Path,
        out: &Path,
        style: &GenerationConfig,
        images_dir: Option<&Path>,
    ) -> Result<GeneratedDocument> {
        let bytes = self.store.read(text_file)?;
        let text = String::from_utf8(bytes).map_err(|err| {
            PenscriptError::Generation(format!("{} is not UTF-8 text: {err}", text_file.display()))
        })?;

        match self.config().check_text_length(&text) {
            TextLengthCheck::Ok => {}
            TextLengthCheck::NearLimit { chars } => {
                warn!(chars, limit = self.config().max_text_length, "text is close to the recommended limit");
            }
            TextLengthCheck::TooLong {
                chars,
                estimated_pages,
            } => {
                warn!(chars, estimated_pages, "text is longer than recommended; generation may be slow");
            }
        }

        let timeout = self.config().operation_timeout();
        let images = self
            .host
            .generate_images(&text, style)?
            .wait_with_progress(timeout, |current, total, message| {
                info!(current, total, "{message}");
            })
            .await?;

        let mut written = Vec::new();
        if let Some(dir) = images_dir {
            for (index, image) in images.iter().enumerate() {
                let jpeg = BASE64
                    .decode(image)
                    .map_err(|err| PenscriptError::Generation(format!("page {}: {err}", index + 1)))?;
                let name = dir.join(format!("page-{:03}.jpg", index + 1));
                written.push(self.store.write(&name.to_string_lossy(), &jpeg)?);
            }
        }

        let pdf = self
            .host
            .generate_pdf(None)?
            .wait_with_progress(timeout, |current, total, message| {
                info!(current, total, "{message}");
            })
            .await?;
        let pdf = BASE64
            .decode(pdf)
            .map_err(|err| PenscriptError::PdfBlob(format!("undecodable PDF payload: {err}")))?;
        let path = self.store.write(&out.to_string_lossy(), &pdf)?;

        info!(path = %path.display(), pages = images.len(), "PDF written");
        Ok(GeneratedDocument {
            pdf: path,
            pages: images.len(),
            images: written,
        })
    }

    // -- Extract ---------------------------------------------------------------

    /// Extract the text of `pdf_file`.
    #[instrument(skip(self))]
    pub async fn extract(&self, pdf_file: &Path) -> Result<String> {
        let bytes = self.store.read(pdf_file)?;
        let encoded = BASE64.encode(bytes);
        let text = self
            .host
            .extract_text(&encoded)
            .await?
            .wait_with_progress(self.config().operation_timeout(), |current, total, message| {
                info!(current, total, "{message}");
            })
            .await?;
        info!(chars = text.chars().count(), "text extracted");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use penscript_core::config::ChunkProfile;
    use penscript_core::error::ErrorCode;
    use penscript_core::types::QualityTier;
    use penscript_document::PdfReader;

    fn quick_config() -> AppConfig {
        AppConfig {
            chunk_profile: ChunkProfile {
                chunk_size: 8 * 1024,
                yield_short_ms: 0,
                yield_long_ms: 0,
                long_threshold: 20,
            },
            operation_timeout_secs: 60,
            ..AppConfig::default()
        }
    }

    fn low_quality() -> GenerationConfig {
        GenerationConfig {
            quality: QualityTier::Low,
            ..GenerationConfig::default()
        }
    }

    #[tokio::test]
    async fn generate_writes_pdf_and_page_images() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "Dear diary,\n\nToday was long.").unwrap();
        let session = Session::start(quick_config(), dir.path()).await.unwrap();

        let doc = session
            .generate(
                Path::new("notes.txt"),
                Path::new("notes.pdf"),
                &low_quality(),
                Some(Path::new("pages")),
            )
            .await
            .unwrap();

        assert_eq!(doc.pages, 1);
        assert_eq!(doc.images, vec![dir.path().join("pages").join("page-001.jpg")]);
        let pdf = std::fs::read(&doc.pdf).unwrap();
        assert_eq!(PdfReader::from_bytes(&pdf).unwrap().page_count(), 1);

        // Pages are images, so nothing comes back as text.
        let text = session.extract(Path::new("notes.pdf")).await.unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn extracting_garbage_is_pdf_invalid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.pdf"), b"plain text, not a pdf").unwrap();
        let session = Session::start(quick_config(), dir.path()).await.unwrap();

        let err = session.extract(Path::new("bad.pdf")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PdfInvalid);
    }

    #[tokio::test]
    async fn missing_input_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::start(quick_config(), dir.path()).await.unwrap();
        let err = session
            .generate(Path::new("absent.txt"), Path::new("out.pdf"), &low_quality(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PenscriptError::Io(_)));
    }
}
