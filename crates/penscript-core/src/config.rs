// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{GenerationConfig, TextLengthCheck};

/// Chunk sizing and pacing for the transfer protocol.
///
/// Memory-constrained targets use smaller chunks with longer pauses between
/// them; everything else uses the standard profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkProfile {
    /// Maximum chunk length in bytes.
    pub chunk_size: usize,
    pub yield_short_ms: u64,
    pub yield_long_ms: u64,
    /// Transfers with more chunks than this use the long yield.
    pub long_threshold: usize,
}

impl ChunkProfile {
    pub const fn constrained() -> Self {
        Self {
            chunk_size: 250 * 1024,
            yield_short_ms: 15,
            yield_long_ms: 30,
            long_threshold: 20,
        }
    }

    pub const fn standard() -> Self {
        Self {
            chunk_size: 500 * 1024,
            yield_short_ms: 10,
            yield_long_ms: 20,
            long_threshold: 20,
        }
    }

    /// Pause inserted after each chunk of a transfer with `total_chunks` chunks.
    pub fn yield_for(&self, total_chunks: usize) -> Duration {
        if total_chunks > self.long_threshold {
            Duration::from_millis(self.yield_long_ms)
        } else {
            Duration::from_millis(self.yield_short_ms)
        }
    }
}

impl Default for ChunkProfile {
    fn default() -> Self {
        Self::standard()
    }
}

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub chunk_profile: ChunkProfile,
    /// How long to wait for the engine's ready signal before giving up.
    pub ready_timeout_secs: u64,
    /// Host-side wait for a single generate/assemble/extract reply.
    pub operation_timeout_secs: u64,
    /// Recommended maximum input length in characters.
    pub max_text_length: usize,
    /// Fraction of `max_text_length` at which a warning is shown.
    pub text_warning_ratio: f32,
    /// Rough characters-per-page figure used for page estimates.
    pub chars_per_page: usize,
    /// Page count above which images are recompressed before assembly.
    pub compress_threshold: usize,
    /// Refuse to start rendering while offline (remote fonts).
    pub require_network_for_rendering: bool,
    /// Style applied when the caller does not supply one.
    pub generation: GenerationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chunk_profile: ChunkProfile::standard(),
            ready_timeout_secs: 10,
            operation_timeout_secs: 30,
            max_text_length: 50_000,
            text_warning_ratio: 0.8,
            chars_per_page: 2_000,
            compress_threshold: 10,
            require_network_for_rendering: false,
            generation: GenerationConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Classify `text` against the recommended length limits.
    ///
    /// Long text is never rejected; the result only drives a warning.
    pub fn check_text_length(&self, text: &str) -> TextLengthCheck {
        let chars = text.chars().count();
        let warn_at = (self.max_text_length as f32 * self.text_warning_ratio) as usize;
        if chars > self.max_text_length {
            TextLengthCheck::TooLong {
                chars,
                estimated_pages: chars.div_ceil(self.chars_per_page.max(1)),
            }
        } else if chars > warn_at {
            TextLengthCheck::NearLimit { chars }
        } else {
            TextLengthCheck::Ok
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_yield_kicks_in_past_threshold() {
        let profile = ChunkProfile::constrained();
        assert_eq!(profile.yield_for(20), Duration::from_millis(15));
        assert_eq!(profile.yield_for(21), Duration::from_millis(30));
    }

    #[test]
    fn text_length_bands() {
        let config = AppConfig::default();
        assert_eq!(config.check_text_length("hello"), TextLengthCheck::Ok);
        assert_eq!(
            config.check_text_length(&"a".repeat(45_000)),
            TextLengthCheck::NearLimit { chars: 45_000 }
        );
        assert_eq!(
            config.check_text_length(&"a".repeat(50_001)),
            TextLengthCheck::TooLong {
                chars: 50_001,
                estimated_pages: 26
            }
        );
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"compress_threshold": 4}"#).unwrap();
        assert_eq!(config.compress_threshold, 4);
        assert_eq!(config.chunk_profile, ChunkProfile::standard());
        assert_eq!(config.operation_timeout(), Duration::from_secs(30));
    }
}
