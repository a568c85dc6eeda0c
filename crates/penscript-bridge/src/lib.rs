// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Penscript — Host-side bridge to the sandboxed rendering engine.
//
// The engine runs isolated and may crash at any time. Everything the host
// knows about it arrives as serialized messages tagged with the engine
// generation that produced them.

pub mod bridge;
pub mod connectivity;
pub mod dispatcher;
pub mod host;
pub mod state;
pub mod stub;
pub mod traits;
pub mod transfer;

pub use bridge::{Bridge, SendOutcome};
pub use dispatcher::Subscription;
pub use host::{BridgeHost, PendingOperation};
pub use state::Readiness;
pub use traits::{ConnectivitySource, EngineEvent, EngineLauncher, EngineLink};
