// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge state machine: readiness handshake, pre-readiness queue, dispatch,
// and crash/restart recovery.
//
// All mutable state lives behind one mutex. Subscriber callbacks are always
// invoked after that lock is released, so a callback may call back into the
// bridge (e.g. to send the next message) without deadlocking.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

use penscript_core::error::{ErrorCode, PenscriptError, Result};
use penscript_core::messages::{EngineMessage, HostMessage};

use crate::dispatcher::{Dispatcher, Subscription};
use crate::state::Readiness;
use crate::traits::{ConnectivitySource, EngineEvent, EngineLauncher, EngineLink};
use crate::transfer::TransferReceiver;

/// What `send` did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Posted to the running engine.
    Dispatched,
    /// Held until the engine signals readiness.
    Queued,
}

struct QueuedMessage {
    kind: &'static str,
    raw: String,
}

struct BridgeState {
    readiness: Readiness,
    generation: u64,
    queue: VecDeque<QueuedMessage>,
    link: Option<Box<dyn EngineLink>>,
    /// Return-path (`PDF_RESULT_*`) reassembly.
    inbound: TransferReceiver,
}

/// Host-side handle on the sandboxed engine.
pub struct Bridge {
    state: Mutex<BridgeState>,
    dispatcher: Dispatcher,
    connectivity: Arc<dyn ConnectivitySource>,
    launcher: Arc<dyn EngineLauncher>,
    events: UnboundedSender<EngineEvent>,
}

impl Bridge {
    /// Create a bridge with no engine running. Call [`Bridge::start`] to
    /// launch the first instance.
    pub fn new(
        launcher: Arc<dyn EngineLauncher>,
        connectivity: Arc<dyn ConnectivitySource>,
        events: UnboundedSender<EngineEvent>,
    ) -> Self {
        Self {
            state: Mutex::new(BridgeState {
                readiness: Readiness::NotReady,
                generation: 0,
                queue: VecDeque::new(),
                link: None,
                inbound: TransferReceiver::new(),
            }),
            dispatcher: Dispatcher::new(),
            connectivity,
            launcher,
            events,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BridgeState>> {
        self.state
            .lock()
            .map_err(|e| PenscriptError::Bridge(format!("bridge state lock poisoned: {e}")))
    }

    // -- Lifecycle -----------------------------------------------------------

    /// Launch the engine for the current generation if none is running.
    pub fn start(&self) -> Result<()> {
        let mut state = self.lock()?;
        if state.link.is_some() {
            return Ok(());
        }
        let link = self.launcher.launch(state.generation, self.events.clone())?;
        info!(generation = state.generation, "engine launched");
        state.link = Some(link);
        Ok(())
    }

    /// Tear down the current engine and launch a fresh, unready one.
    pub fn restart(&self) -> Result<u64> {
        let observed = self.generation();
        self.restart_from(observed)
    }

    /// Restart only if the generation is still `observed`.
    ///
    /// Concurrent callers that observed the same generation race for one
    /// restart; the losers get the already-bumped generation back.
    #[instrument(skip(self))]
    pub fn restart_from(&self, observed: u64) -> Result<u64> {
        let mut state = self.lock()?;
        if state.generation != observed {
            debug!(current = state.generation, "restart already performed");
            return Ok(state.generation);
        }

        if let Some(link) = state.link.take() {
            link.shutdown();
        }
        let dropped = state.queue.len();
        state.queue.clear();
        state.inbound.reset();
        state.generation += 1;
        state.readiness = state.readiness.on_restart();

        let link = self.launcher.launch(state.generation, self.events.clone())?;
        state.link = Some(link);
        info!(generation = state.generation, dropped, "engine restarted");
        Ok(state.generation)
    }

    /// Stop the running engine for good. Queued messages are dropped.
    pub fn shutdown(&self) {
        if let Ok(mut state) = self.lock() {
            state.queue.clear();
            state.readiness = Readiness::NotReady;
            if let Some(link) = state.link.take() {
                link.shutdown();
                info!(generation = state.generation, "engine shut down");
            }
        }
    }

    // -- Outbound ------------------------------------------------------------

    /// Post `message` to the engine, or queue it until the engine is ready.
    ///
    /// Network-dependent messages fail fast while offline and are dropped,
    /// not queued. A serialization failure affects only this call.
    pub fn send(&self, message: &HostMessage, requires_network: bool) -> Result<SendOutcome> {
        if requires_network && !self.connectivity.is_online() {
            warn!(kind = message.kind(), "offline; dropping network-dependent message");
            return Err(PenscriptError::Offline);
        }
        let raw = message.to_json()?;

        let mut state = self.lock()?;
        if state.readiness.is_ready() {
            let Some(link) = state.link.as_ref() else {
                return Err(PenscriptError::Bridge("ready engine has no link".into()));
            };
            link.post(raw)?;
            debug!(kind = message.kind(), "dispatched");
            Ok(SendOutcome::Dispatched)
        } else {
            state.queue.push_back(QueuedMessage {
                kind: message.kind(),
                raw,
            });
            debug!(
                kind = message.kind(),
                queued = state.queue.len(),
                readiness = ?state.readiness,
                "queued until ready"
            );
            Ok(SendOutcome::Queued)
        }
    }

    // -- Inbound -------------------------------------------------------------

    pub fn on_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::Message { generation, raw } => self.on_incoming(generation, &raw),
            EngineEvent::Terminated {
                generation,
                did_crash,
            } => self.on_terminated(generation, did_crash),
        }
    }

    /// Handle one serialized message from engine instance `generation`.
    ///
    /// Malformed messages and messages from replaced instances are dropped.
    pub fn on_incoming(&self, generation: u64, raw: &str) {
        let message = match EngineMessage::from_json(raw) {
            Ok(m) => m,
            Err(e) => {
                debug!(error = %e, "ignoring malformed engine message");
                return;
            }
        };

        let to_publish = match self.lock() {
            Ok(mut state) => {
                if state.generation != generation {
                    debug!(
                        kind = message.kind(),
                        stale = generation,
                        current = state.generation,
                        "ignoring message from replaced engine"
                    );
                    return;
                }
                Self::absorb(&mut state, message)
            }
            Err(e) => {
                warn!(error = %e, "dropping engine message");
                return;
            }
        };

        for message in to_publish {
            self.dispatcher.publish(&message);
        }
    }

    /// Update state for `message` and return what subscribers should see.
    fn absorb(state: &mut BridgeState, message: EngineMessage) -> Vec<EngineMessage> {
        if let Some(frame) = message.as_transfer_frame() {
            return match state.inbound.accept(frame) {
                Ok(Some(data)) => vec![EngineMessage::PdfSuccess { data }],
                Ok(None) => Vec::new(),
                Err(e) => {
                    warn!(error = %e, "return-path transfer failed");
                    vec![EngineMessage::from_error(&e)]
                }
            };
        }

        match &message {
            EngineMessage::WebviewReady => {
                state.readiness = state.readiness.on_ready_signal();
                if state.readiness.is_ready() {
                    Self::flush(state);
                }
            }
            EngineMessage::Error {
                code: ErrorCode::WebviewError,
                data,
            } => {
                warn!(detail = %data, "engine reported a non-fatal error");
            }
            _ => {}
        }
        vec![message]
    }

    /// Post every queued message in FIFO order, exactly once.
    fn flush(state: &mut BridgeState) {
        let queued: Vec<QueuedMessage> = state.queue.drain(..).collect();
        if queued.is_empty() {
            info!(generation = state.generation, "engine ready");
            return;
        }
        info!(
            generation = state.generation,
            count = queued.len(),
            "engine ready; flushing queue"
        );
        let Some(link) = state.link.as_ref() else {
            warn!(dropped = queued.len(), "ready signal without a link");
            return;
        };
        for item in queued {
            if let Err(e) = link.post(item.raw) {
                warn!(kind = item.kind, error = %e, "failed to flush queued message");
            }
        }
    }

    /// Handle termination of engine instance `generation`.
    pub fn on_terminated(&self, generation: u64, did_crash: bool) {
        let crashed_generation = match self.lock() {
            Ok(mut state) => {
                if state.generation != generation {
                    debug!(stale = generation, "ignoring termination of replaced engine");
                    return;
                }
                state.link = None;
                let dropped = state.queue.len();
                state.queue.clear();
                state.inbound.reset();
                state.generation += 1;
                state.readiness = state.readiness.on_terminated();
                if did_crash {
                    warn!(generation, dropped, "engine crashed");
                } else {
                    warn!(generation, dropped, "engine exited unexpectedly");
                }
                generation
            }
            Err(e) => {
                warn!(error = %e, "cannot record engine termination");
                return;
            }
        };

        let err = PenscriptError::EngineCrashed {
            generation: crashed_generation,
        };
        self.dispatcher.publish(&EngineMessage::from_error(&err));
    }

    // -- Observation ---------------------------------------------------------

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&EngineMessage) + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(callback)
    }

    pub fn readiness(&self) -> Readiness {
        self.lock().map(|s| s.readiness).unwrap_or(Readiness::Crashed)
    }

    pub fn is_ready(&self) -> bool {
        self.readiness().is_ready()
    }

    pub fn generation(&self) -> u64 {
        self.lock().map(|s| s.generation).unwrap_or(0)
    }

    pub fn queued_len(&self) -> usize {
        self.lock().map(|s| s.queue.len()).unwrap_or(0)
    }
}
