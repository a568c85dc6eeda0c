// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// penscript-engine — The isolated rendering engine.
//
// The engine owns the render surface and processes its mailbox one message at
// a time. It only ever sees serialized `HostMessage`s and answers with
// serialized `EngineMessage`s; a panic anywhere inside it is reported to the
// bridge as a crash of that engine generation.

pub mod engine;
pub mod launcher;

pub use engine::{Engine, EngineOptions};
pub use launcher::TaskEngineLauncher;
