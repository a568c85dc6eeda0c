// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine readiness state machine.

/// Readiness of the current engine instance.
///
/// ```text
/// NotReady --WEBVIEW_READY--> Ready --crash--> Crashed --restart--> NotReady
///     \_____________________crash____________________/
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readiness {
    /// Launched (or relaunching), ready signal not yet seen.
    #[default]
    NotReady,
    Ready,
    /// Terminated; waiting for the caller to restart.
    Crashed,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// State after a ready signal. A crashed instance cannot become ready
    /// without a restart.
    pub fn on_ready_signal(self) -> Self {
        match self {
            Self::Crashed => Self::Crashed,
            _ => Self::Ready,
        }
    }

    pub fn on_terminated(self) -> Self {
        Self::Crashed
    }

    pub fn on_restart(self) -> Self {
        Self::NotReady
    }
}
