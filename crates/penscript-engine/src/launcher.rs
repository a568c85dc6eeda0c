// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hosts each engine generation as its own tokio task.
//
// The task's mailbox is the only way in. A watcher awaits the task and reports
// its end to the bridge; a panic inside the engine becomes a crash of that
// generation.

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info};

use penscript_bridge::{EngineEvent, EngineLauncher, EngineLink};
use penscript_core::config::AppConfig;
use penscript_core::error::{PenscriptError, Result};

use crate::engine::{Engine, EngineOptions};

/// Launches engines on the current tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct TaskEngineLauncher {
    options: EngineOptions,
}

impl TaskEngineLauncher {
    pub fn new(options: EngineOptions) -> Self {
        Self { options }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(EngineOptions::from_config(config))
    }
}

impl EngineLauncher for TaskEngineLauncher {
    fn launch(
        &self,
        generation: u64,
        events: UnboundedSender<EngineEvent>,
    ) -> Result<Box<dyn EngineLink>> {
        let runtime = Handle::try_current().map_err(|err| {
            PenscriptError::LibraryNotLoaded(format!("no async runtime to host the engine: {err}"))
        })?;

        let (inbox, mailbox) = mpsc::unbounded_channel::<String>();
        let engine = Engine::new(generation, events.clone(), self.options);
        let task = runtime.spawn(engine.run(mailbox));
        let abort = task.abort_handle();
        runtime.spawn(watch(generation, task, events));

        info!(generation, "engine task spawned");
        Ok(Box::new(TaskEngineLink {
            generation,
            inbox,
            abort,
        }))
    }
}

struct TaskEngineLink {
    generation: u64,
    inbox: UnboundedSender<String>,
    abort: AbortHandle,
}

impl EngineLink for TaskEngineLink {
    fn post(&self, raw: String) -> Result<()> {
        self.inbox.send(raw).map_err(|_| {
            PenscriptError::Bridge(format!("engine generation {} has stopped", self.generation))
        })
    }

    fn shutdown(&self) {
        self.abort.abort();
        debug!(generation = self.generation, "engine task aborted");
    }
}

/// Await an engine task and report how it ended.
pub async fn watch(generation: u64, task: JoinHandle<()>, events: UnboundedSender<EngineEvent>) {
    let did_crash = match task.await {
        Ok(()) => false,
        Err(err) if err.is_panic() => {
            error!(generation, "engine panicked");
            true
        }
        Err(_) => {
            debug!(generation, "engine task cancelled");
            false
        }
    };
    let _ = events.send(EngineEvent::Terminated {
        generation,
        did_crash,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use penscript_bridge::BridgeHost;
    use penscript_bridge::connectivity::SharedConnectivity;
    use penscript_core::config::ChunkProfile;
    use penscript_core::messages::EngineMessage;
    use penscript_core::types::{GenerationConfig, QualityTier};
    use penscript_document::PdfReader;

    const WAIT: Duration = Duration::from_secs(60);

    fn small_chunks() -> AppConfig {
        AppConfig {
            chunk_profile: ChunkProfile {
                chunk_size: 4096,
                yield_short_ms: 0,
                yield_long_ms: 0,
                long_threshold: 20,
            },
            ..AppConfig::default()
        }
    }

    fn spawn_host(config: AppConfig) -> BridgeHost {
        BridgeHost::spawn(
            Arc::new(TaskEngineLauncher::from_config(&config)),
            Arc::new(SharedConnectivity::new(true)),
            config,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn text_to_pdf_and_back_through_the_bridge() {
        let host = spawn_host(small_chunks());
        host.wait_ready().await.unwrap();

        let style = GenerationConfig {
            quality: QualityTier::Low,
            ..GenerationConfig::default()
        };
        let images = host
            .generate_images("Meeting notes for Tuesday.", &style)
            .unwrap()
            .wait(WAIT)
            .await
            .unwrap();
        assert_eq!(images.len(), 1);

        // Larger than one chunk in both directions.
        let pdf = host.generate_pdf(None).unwrap().wait(WAIT).await.unwrap();
        assert!(pdf.len() > 4096);
        let bytes = BASE64.decode(&pdf).unwrap();
        assert_eq!(PdfReader::from_bytes(&bytes).unwrap().page_count(), 1);

        let text = host.extract_text(&pdf).await.unwrap().wait(WAIT).await.unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn restarted_engine_becomes_ready_again() {
        let host = spawn_host(AppConfig::default());
        host.wait_ready().await.unwrap();
        assert_eq!(host.restart().unwrap(), 1);
        host.wait_ready().await.unwrap();

        let err = host.generate_pdf(None).unwrap().wait(WAIT).await.unwrap_err();
        assert_eq!(err.code(), penscript_core::error::ErrorCode::NoImages);
    }

    #[tokio::test]
    async fn shutdown_is_not_reported_as_a_crash() {
        let (events, mut rx) = mpsc::unbounded_channel();
        let link = TaskEngineLauncher::default().launch(3, events).unwrap();

        let ready = rx.recv().await.unwrap();
        let EngineEvent::Message { generation, raw } = ready else {
            panic!("expected the ready message");
        };
        assert_eq!(generation, 3);
        assert_eq!(EngineMessage::from_json(&raw).unwrap(), EngineMessage::WebviewReady);

        link.shutdown();
        assert_eq!(
            rx.recv().await,
            Some(EngineEvent::Terminated {
                generation: 3,
                did_crash: false
            })
        );
        assert!(link.post("{}".into()).is_err());
    }

    #[tokio::test]
    async fn panicking_engine_is_reported_as_a_crash() {
        let (events, mut rx) = mpsc::unbounded_channel();
        let task: JoinHandle<()> = tokio::spawn(async { panic!("render surface exploded") });
        watch(5, task, events).await;
        assert_eq!(
            rx.recv().await,
            Some(EngineEvent::Terminated {
                generation: 5,
                did_crash: true
            })
        );
    }

    #[test]
    fn launching_outside_a_runtime_is_library_not_loaded() {
        let (events, _rx) = mpsc::unbounded_channel();
        let err = TaskEngineLauncher::default().launch(0, events).err().unwrap();
        assert!(matches!(err, PenscriptError::LibraryNotLoaded(_)));
    }
}
