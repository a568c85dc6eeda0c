// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for handwriting generation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Points per millimetre (72 pt per inch, 25.4 mm per inch).
const PT_PER_MM: f32 = 72.0 / 25.4;

/// Identifier tagging every message of one chunked transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(pub String);

impl TransferId {
    pub fn new() -> Self {
        Self(format!("pdf-{}", Uuid::new_v4().simple()))
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransferId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }

    /// Dimensions in points at 72 dpi (width, height), rounded to whole points.
    pub fn dimensions_pt(&self) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        ((w as f32 * PT_PER_MM).round(), (h as f32 * PT_PER_MM).round())
    }
}

/// Post-process visual effect applied to captured pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InkEffect {
    #[default]
    #[serde(alias = "no-effect")]
    None,
    /// Diagonal shadow gradient laid over the page.
    #[serde(alias = "shadows")]
    Shadow,
    /// Shadow overlay plus a contrast shift, mimicking a flatbed scan.
    Scanner,
}

/// Named raster preset controlling scale factor and JPEG quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityTier {
    /// Raster scale factor relative to the 72 dpi page surface.
    pub fn scale(&self) -> f32 {
        match self {
            Self::Low => 1.0,
            Self::Medium => 1.5,
            Self::High => 2.0,
        }
    }

    /// JPEG encoder quality (1-100).
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            Self::Low => 60,
            Self::Medium => 80,
            Self::High => 92,
        }
    }
}

/// Style configuration for one generation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationConfig {
    /// CSS-style font family, e.g. `'Homemade Apple', cursive`.
    pub font: String,
    /// Ink colour as `#rrggbb`, `#rgb`, or a basic colour name.
    pub ink_color: String,
    /// Font size in points.
    pub font_size: f32,
    /// Extra advance added after every glyph, in points.
    pub letter_spacing: f32,
    /// Extra advance added to every space, in points.
    pub word_spacing: f32,
    /// Extra padding above the first line, in points.
    pub top_padding: f32,
    pub page_size: PaperSize,
    pub paper_lines: bool,
    pub paper_margin: bool,
    pub effect: InkEffect,
    pub quality: QualityTier,
    /// Spelling-mistake strike-outs per hundred words.
    pub mistake_density: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            font: "'Homemade Apple', cursive".into(),
            ink_color: "#000f55".into(),
            font_size: 10.0,
            letter_spacing: 0.0,
            word_spacing: 0.0,
            top_padding: 0.0,
            page_size: PaperSize::A4,
            paper_lines: true,
            paper_margin: true,
            effect: InkEffect::None,
            quality: QualityTier::Medium,
            mistake_density: 0,
        }
    }
}

/// Which engine operation a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStep {
    Image,
    Pdf,
    Extract,
}

/// Result of checking input text against the recommended limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextLengthCheck {
    Ok,
    /// Above the warning threshold but still within the limit.
    NearLimit { chars: usize },
    /// Above the limit; generation may exhaust memory.
    TooLong { chars: usize, estimated_pages: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_is_595_by_842_points() {
        assert_eq!(PaperSize::A4.dimensions_pt(), (595.0, 842.0));
    }

    #[test]
    fn legacy_effect_names_are_accepted() {
        let effect: InkEffect = serde_json::from_str("\"no-effect\"").unwrap();
        assert_eq!(effect, InkEffect::None);
        let effect: InkEffect = serde_json::from_str("\"shadows\"").unwrap();
        assert_eq!(effect, InkEffect::Shadow);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: GenerationConfig =
            serde_json::from_str(r#"{"fontSize": 14, "effect": "scanner"}"#).unwrap();
        assert_eq!(config.font_size, 14.0);
        assert_eq!(config.effect, InkEffect::Scanner);
        assert_eq!(config.ink_color, "#000f55");
        assert!(config.paper_lines);
    }

    #[test]
    fn transfer_ids_are_unique() {
        assert_ne!(TransferId::new(), TransferId::new());
        assert!(TransferId::new().0.starts_with("pdf-"));
    }
}
