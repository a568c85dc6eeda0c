// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async host facade over the bridge.
//
// `BridgeHost` owns the event pump (one tokio task draining engine events
// into the bridge) and offers request helpers that correlate replies by
// message type. Sends are fire-and-forget; waiting for the reply is a
// separate, restartable step on the returned `PendingOperation`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use penscript_core::config::AppConfig;
use penscript_core::error::{PenscriptError, Result};
use penscript_core::messages::{EngineMessage, HostMessage, host_frame};
use penscript_core::types::{GenerationConfig, ProgressStep};

use crate::bridge::Bridge;
use crate::dispatcher::Subscription;
use crate::traits::{ConnectivitySource, EngineEvent, EngineLauncher};
use crate::transfer::{needs_chunking, send_chunked};

/// Running bridge plus its event pump.
pub struct BridgeHost {
    bridge: Arc<Bridge>,
    config: AppConfig,
    pump: JoinHandle<()>,
}

impl BridgeHost {
    /// Launch the first engine instance and start pumping its events.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        launcher: Arc<dyn EngineLauncher>,
        connectivity: Arc<dyn ConnectivitySource>,
        config: AppConfig,
    ) -> Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<EngineEvent>();
        let bridge = Arc::new(Bridge::new(launcher, connectivity, tx));
        bridge.start()?;

        let pump_bridge = Arc::clone(&bridge);
        let pump = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                pump_bridge.on_event(event);
            }
            debug!("engine event channel closed");
        });

        info!("bridge host started");
        Ok(Self {
            bridge,
            config,
            pump,
        })
    }

    pub fn bridge(&self) -> &Arc<Bridge> {
        &self.bridge
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Wait for the engine's ready signal, up to the configured timeout.
    pub async fn wait_ready(&self) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = self.bridge.subscribe(move |m| {
            if matches!(m, EngineMessage::WebviewReady) {
                let _ = tx.send(());
            }
        });
        if self.bridge.is_ready() {
            return Ok(());
        }
        let limit = self.config.ready_timeout();
        match tokio::time::timeout(limit, rx.recv()).await {
            Ok(Some(())) => Ok(()),
            _ => Err(PenscriptError::LibraryNotLoaded(format!(
                "no ready signal within {}s",
                limit.as_secs()
            ))),
        }
    }

    /// Relaunch the engine. See [`Bridge::restart`].
    pub fn restart(&self) -> Result<u64> {
        self.bridge.restart()
    }

    // -- Requests ------------------------------------------------------------

    /// Render the first page at preview quality. Resolves to a base64 JPEG.
    #[instrument(skip_all, fields(chars = text.len()))]
    pub fn preview(&self, text: &str, style: &GenerationConfig) -> Result<PendingOperation<String>> {
        let pending = PendingOperation::register(&self.bridge, "PREVIEW_READY", ProgressStep::Image, |m| {
            match m {
                EngineMessage::PreviewReady { image } => Some(image.clone()),
                _ => None,
            }
        });
        self.bridge.send(
            &HostMessage::UpdatePreview {
                text: text.to_string(),
                config: style.clone(),
            },
            self.config.require_network_for_rendering,
        )?;
        Ok(pending)
    }

    /// Render every page. Resolves to base64 JPEGs in page order.
    #[instrument(skip_all, fields(chars = text.len()))]
    pub fn generate_images(
        &self,
        text: &str,
        style: &GenerationConfig,
    ) -> Result<PendingOperation<Vec<String>>> {
        let pending = PendingOperation::register(&self.bridge, "SUCCESS", ProgressStep::Image, |m| {
            match m {
                EngineMessage::Success { images } => Some(images.clone()),
                _ => None,
            }
        });
        self.bridge.send(
            &HostMessage::GenerateImage {
                text: text.to_string(),
                config: style.clone(),
            },
            self.config.require_network_for_rendering,
        )?;
        Ok(pending)
    }

    /// Assemble a PDF. With `None` the engine uses the last generated pages.
    /// Resolves to the base64-encoded document.
    #[instrument(skip_all, fields(pages = images.as_ref().map(Vec::len)))]
    pub fn generate_pdf(&self, images: Option<Vec<String>>) -> Result<PendingOperation<String>> {
        let pending = PendingOperation::register(&self.bridge, "PDF_SUCCESS", ProgressStep::Pdf, |m| {
            match m {
                EngineMessage::PdfSuccess { data } => Some(data.clone()),
                _ => None,
            }
        });
        self.bridge.send(&HostMessage::GeneratePdf { images }, false)?;
        Ok(pending)
    }

    /// Extract plain text from a base64-encoded PDF, chunking large input.
    #[instrument(skip_all, fields(bytes = pdf_base64.len()))]
    pub async fn extract_text(&self, pdf_base64: &str) -> Result<PendingOperation<String>> {
        let pending = PendingOperation::register(
            &self.bridge,
            "PDF_TEXT_EXTRACTED",
            ProgressStep::Extract,
            |m| match m {
                EngineMessage::PdfTextExtracted { data } => Some(data.clone()),
                _ => None,
            },
        );

        let profile = self.config.chunk_profile;
        if needs_chunking(pdf_base64, &profile) {
            let bridge = Arc::clone(&self.bridge);
            send_chunked(pdf_base64, &profile, move |frame| {
                bridge.send(&host_frame(frame), false).map(|_| ())
            })
            .await?;
        } else {
            self.bridge.send(
                &HostMessage::ExtractTextFromPdf {
                    data: pdf_base64.to_string(),
                },
                false,
            )?;
        }
        Ok(pending)
    }
}

impl Drop for BridgeHost {
    fn drop(&mut self) {
        self.pump.abort();
        self.bridge.shutdown();
    }
}

/// Progress or completion of one request.
#[derive(Debug)]
enum Update<T> {
    Progress {
        current: usize,
        total: usize,
        message: String,
    },
    Done(Result<T>),
}

/// Handle on a request whose reply has not arrived yet.
///
/// A timed-out `wait` leaves the handle usable, so the caller can decide to
/// keep waiting. Dropping the handle stops local waiting only; the engine
/// still finishes the work.
pub struct PendingOperation<T> {
    operation: &'static str,
    rx: mpsc::UnboundedReceiver<Update<T>>,
    _subscription: Subscription,
}

impl<T: Send + 'static> PendingOperation<T> {
    fn register<F>(bridge: &Bridge, operation: &'static str, step: ProgressStep, complete: F) -> Self
    where
        F: Fn(&EngineMessage) -> Option<T> + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = bridge.subscribe(move |message| {
            let update = match message {
                EngineMessage::Progress {
                    step: s,
                    current,
                    total,
                    message,
                } if *s == step => Update::Progress {
                    current: *current,
                    total: *total,
                    message: message.clone(),
                },
                EngineMessage::Error { data, code } => Update::Done(Err(PenscriptError::Engine {
                    code: *code,
                    message: data.clone(),
                })),
                other => match complete(other) {
                    Some(value) => Update::Done(Ok(value)),
                    None => return,
                },
            };
            let _ = tx.send(update);
        });
        Self {
            operation,
            rx,
            _subscription: subscription,
        }
    }

    /// Wait up to `timeout` for the reply.
    pub async fn wait(&mut self, timeout: Duration) -> Result<T> {
        self.wait_with_progress(timeout, |_, _, _| {}).await
    }

    /// Like [`wait`](Self::wait), reporting `(current, total, message)` for
    /// every progress event of this operation's step.
    pub async fn wait_with_progress<P>(&mut self, timeout: Duration, mut on_progress: P) -> Result<T>
    where
        P: FnMut(usize, usize, &str),
    {
        let operation = self.operation;
        let rx = &mut self.rx;
        let outcome = tokio::time::timeout(timeout, async move {
            loop {
                match rx.recv().await {
                    Some(Update::Progress {
                        current,
                        total,
                        message,
                    }) => on_progress(current, total, &message),
                    Some(Update::Done(result)) => return result,
                    None => {
                        return Err(PenscriptError::Bridge(format!(
                            "bridge closed while waiting for {operation}"
                        )));
                    }
                }
            }
        })
        .await;

        match outcome {
            Ok(result) => result,
            Err(_) => Err(PenscriptError::Timeout {
                operation: operation.to_string(),
                seconds: timeout.as_secs(),
            }),
        }
    }
}
