// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Glyph advance widths used for measurement and placement.

/// Horizontal advance of a glyph at a given font size, in points.
pub trait GlyphMetrics: Send + Sync {
    fn advance(&self, ch: char, font_size: f32) -> f32;
}

/// Width table approximating a loose cursive hand.
///
/// Handwriting fonts run wide, so ratios sit above typical book faces.
#[derive(Debug, Clone, Copy)]
pub struct ProportionalMetrics {
    /// Multiplier applied to every ratio (1.0 = table as is).
    pub width_factor: f32,
}

impl Default for ProportionalMetrics {
    fn default() -> Self {
        Self { width_factor: 1.0 }
    }
}

impl ProportionalMetrics {
    fn ratio(ch: char) -> f32 {
        match ch {
            ' ' => 0.32,
            'i' | 'j' | 'l' | '!' | '|' | '.' | ',' | ';' | ':' | '\'' => 0.28,
            'f' | 'r' | 't' | 'I' | '(' | ')' | '[' | ']' | '-' => 0.40,
            'm' | 'w' => 0.92,
            'M' | 'W' => 1.0,
            'A'..='Z' => 0.74,
            '0'..='9' => 0.58,
            c if c.is_alphabetic() => 0.60,
            // Symbols and anything unexpected.
            _ => 0.62,
        }
    }
}

impl GlyphMetrics for ProportionalMetrics {
    fn advance(&self, ch: char, font_size: f32) -> f32 {
        Self::ratio(ch) * font_size * self.width_factor
    }
}

/// Every glyph has the same advance. Handy for exact layout arithmetic.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMetrics {
    /// Advance as a fraction of the font size.
    pub ratio: f32,
}

impl GlyphMetrics for MonospaceMetrics {
    fn advance(&self, _ch: char, font_size: f32) -> f32 {
        self.ratio * font_size
    }
}
