// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Measurement and render surface.
//
// A surface holds the content of exactly one page at a time. Tokens are
// appended and removed one by one while the paginator watches the content
// height; once a page is final the same surface rasterizes it.

use image::{Rgb, RgbImage};
use tracing::{debug, instrument};

use penscript_core::error::{PenscriptError, Result};
use penscript_core::types::{GenerationConfig, QualityTier};

use crate::render::metrics::{GlyphMetrics, ProportionalMetrics};
use crate::render::raster::PageRasterizer;
use crate::render::tokenize::is_whitespace_token;

/// Height of the ruled top margin band, in points.
pub const TOP_MARGIN: f32 = 50.0;
/// Width of the ruled left margin band, in points.
pub const LEFT_MARGIN: f32 = 50.0;
/// Padding between the margin rules and the text.
pub const CONTENT_PADDING: f32 = 5.0;
/// Inset used on every side when margins are switched off.
pub const PLAIN_INSET: f32 = 10.0;
/// Smallest font size a style may ask for, in points.
pub const MIN_FONT_SIZE: f32 = 1.0;
/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_EM: f32 = 1.5;

/// A page the paginator and rasterizer can draw on.
pub trait RenderSurface {
    /// Reset the surface and apply `style` in full. Applying the same style
    /// twice is the same as applying it once.
    fn apply_style(&mut self, style: &GenerationConfig) -> Result<()>;

    /// Remove all content, keeping the style.
    fn clear(&mut self);

    fn push_token(&mut self, token: &str);

    /// Remove the most recently pushed token.
    fn pop_token(&mut self) -> Option<String>;

    /// Height currently occupied by content, in points.
    fn content_height(&self) -> f32;

    /// Usable content height of one page, in points.
    fn max_content_height(&self) -> f32;

    /// Rasterize the current content at `quality`. `seed` drives every
    /// pseudo-random choice (jitter, strike-outs, shadow angle).
    fn rasterize(&self, quality: QualityTier, seed: u64) -> Result<RgbImage>;
}

// -- Geometry -----------------------------------------------------------------

/// Page box and content box, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub content_left: f32,
    pub content_top: f32,
    pub content_width: f32,
    pub content_height: f32,
}

impl PageGeometry {
    pub fn for_style(style: &GenerationConfig) -> Self {
        let (page_width, page_height) = style.page_size.dimensions_pt();
        let (left, top, right, bottom) = if style.paper_margin {
            (
                LEFT_MARGIN + CONTENT_PADDING,
                TOP_MARGIN + CONTENT_PADDING,
                CONTENT_PADDING,
                CONTENT_PADDING,
            )
        } else {
            (PLAIN_INSET, PLAIN_INSET, PLAIN_INSET, PLAIN_INSET)
        };
        Self {
            page_width,
            page_height,
            content_left: left,
            content_top: top,
            content_width: (page_width - left - right).max(1.0),
            content_height: (page_height - top - bottom).max(1.0),
        }
    }
}

/// Style after validation, ready for layout and drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    pub config: GenerationConfig,
    pub ink: Rgb<u8>,
    pub geometry: PageGeometry,
    pub line_height: f32,
}

impl ResolvedStyle {
    pub fn resolve(config: &GenerationConfig) -> Result<Self> {
        let geometry = PageGeometry::for_style(config);
        for (name, value) in [
            ("font size", config.font_size),
            ("letter spacing", config.letter_spacing),
            ("word spacing", config.word_spacing),
            ("top padding", config.top_padding),
        ] {
            if !value.is_finite() {
                return Err(PenscriptError::Style(format!("{name} is not a number")));
            }
        }
        if !(MIN_FONT_SIZE..=geometry.content_height).contains(&config.font_size) {
            return Err(PenscriptError::Style(format!(
                "font size must be between {MIN_FONT_SIZE} and {}, got {}",
                geometry.content_height, config.font_size
            )));
        }
        if !(0.0..=geometry.content_height).contains(&config.top_padding) {
            return Err(PenscriptError::Style(format!(
                "top padding must be between 0 and {}, got {}",
                geometry.content_height, config.top_padding
            )));
        }
        for (name, value) in [
            ("letter spacing", config.letter_spacing),
            ("word spacing", config.word_spacing),
        ] {
            if value.abs() > geometry.content_width {
                return Err(PenscriptError::Style(format!(
                    "{name} {value} is wider than the line"
                )));
            }
        }
        let ink = parse_ink_color(&config.ink_color)?;
        Ok(Self {
            config: config.clone(),
            ink,
            geometry,
            line_height: config.font_size * LINE_HEIGHT_EM,
        })
    }
}

/// Parse `#rrggbb`, `#rgb` or a basic colour name.
pub fn parse_ink_color(value: &str) -> Result<Rgb<u8>> {
    let v = value.trim();
    let named = match v.to_ascii_lowercase().as_str() {
        "black" => Some([0, 0, 0]),
        "blue" => Some([0, 0, 255]),
        "navy" => Some([0, 0, 128]),
        "red" => Some([255, 0, 0]),
        "green" => Some([0, 128, 0]),
        "purple" => Some([128, 0, 128]),
        "gray" | "grey" => Some([128, 128, 128]),
        _ => None,
    };
    if let Some(rgb) = named {
        return Ok(Rgb(rgb));
    }

    let invalid = || PenscriptError::Style(format!("unrecognised ink colour {value:?}"));
    let hex = v.strip_prefix('#').ok_or_else(invalid)?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
    match hex.len() {
        6 => Ok(Rgb([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        ])),
        3 => {
            let expand = |s: &str| channel(&s.repeat(2));
            Ok(Rgb([
                expand(&hex[0..1])?,
                expand(&hex[1..2])?,
                expand(&hex[2..3])?,
            ]))
        }
        _ => Err(invalid()),
    }
}

// -- Layout -------------------------------------------------------------------

/// One glyph placed on the page, in content-box coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    pub ch: char,
    pub x: f32,
    pub line: usize,
    pub advance: f32,
    /// Index of the word (non-whitespace token) on this page.
    pub word: usize,
}

/// Pen position after some number of tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutCursor {
    x: f32,
    line: usize,
    words: usize,
    has_content: bool,
}

impl LayoutCursor {
    /// Lines touched so far.
    pub fn lines(&self) -> usize {
        if self.has_content { self.line + 1 } else { 0 }
    }

    fn newline(&mut self) {
        self.line += 1;
        self.x = 0.0;
    }

    /// Lay `token` out with pre-wrap semantics: whitespace is kept, explicit
    /// newlines break, words wrap as a whole and words wider than the line
    /// break between characters.
    pub fn advance<F>(&mut self, token: &str, ctx: &LayoutContext<'_>, mut place: F)
    where
        F: FnMut(PlacedGlyph),
    {
        self.has_content = true;

        if is_whitespace_token(token) {
            for ch in token.chars() {
                match ch {
                    '\n' => self.newline(),
                    '\r' => {}
                    '\t' => self.x += 4.0 * ctx.space_advance(),
                    // Trailing spaces hang past the edge; the next word wraps.
                    _ => self.x += ctx.space_advance(),
                }
            }
            return;
        }

        let word = self.words;
        self.words += 1;
        let width: f32 = token.chars().map(|c| ctx.glyph_advance(c)).sum();
        if self.x > 0.0 && self.x + width > ctx.line_width {
            self.newline();
        }
        let breaks_inside = width > ctx.line_width;
        for ch in token.chars() {
            let advance = ctx.glyph_advance(ch);
            if breaks_inside && self.x > 0.0 && self.x + advance > ctx.line_width {
                self.newline();
            }
            place(PlacedGlyph {
                ch,
                x: self.x,
                line: self.line,
                advance,
                word,
            });
            self.x += advance;
        }
    }
}

/// Everything layout needs besides the cursor.
pub struct LayoutContext<'a> {
    pub metrics: &'a dyn GlyphMetrics,
    pub font_size: f32,
    pub letter_spacing: f32,
    pub word_spacing: f32,
    pub line_width: f32,
}

impl LayoutContext<'_> {
    fn glyph_advance(&self, ch: char) -> f32 {
        (self.metrics.advance(ch, self.font_size) + self.letter_spacing).max(0.0)
    }

    fn space_advance(&self) -> f32 {
        (self.glyph_advance(' ') + self.word_spacing).max(0.0)
    }
}

// -- Glyph surface ------------------------------------------------------------

/// Surface that measures with a [`GlyphMetrics`] table and draws with the
/// handwriting rasterizer.
pub struct GlyphSurface {
    metrics: Box<dyn GlyphMetrics>,
    style: Option<ResolvedStyle>,
    tokens: Vec<String>,
    cursor: LayoutCursor,
    /// Cursor before each pushed token, for `pop_token`.
    history: Vec<LayoutCursor>,
}

impl Default for GlyphSurface {
    fn default() -> Self {
        Self::new(Box::new(ProportionalMetrics::default()))
    }
}

impl GlyphSurface {
    pub fn new(metrics: Box<dyn GlyphMetrics>) -> Self {
        Self {
            metrics,
            style: None,
            tokens: Vec::new(),
            cursor: LayoutCursor::default(),
            history: Vec::new(),
        }
    }

    pub fn style(&self) -> Option<&ResolvedStyle> {
        self.style.as_ref()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    fn context(&self) -> Option<LayoutContext<'_>> {
        let style = self.style.as_ref()?;
        Some(LayoutContext {
            metrics: self.metrics.as_ref(),
            font_size: style.config.font_size,
            letter_spacing: style.config.letter_spacing,
            word_spacing: style.config.word_spacing,
            line_width: style.geometry.content_width,
        })
    }

    /// Lay out the current content from scratch.
    pub fn layout(&self) -> Vec<PlacedGlyph> {
        let mut glyphs = Vec::new();
        let Some(ctx) = self.context() else {
            return glyphs;
        };
        let mut cursor = LayoutCursor::default();
        for token in &self.tokens {
            cursor.advance(token, &ctx, |g| glyphs.push(g));
        }
        glyphs
    }
}

impl RenderSurface for GlyphSurface {
    #[instrument(skip_all, fields(font_size = style.font_size))]
    fn apply_style(&mut self, style: &GenerationConfig) -> Result<()> {
        let resolved = ResolvedStyle::resolve(style)?;
        self.clear();
        debug!(geometry = ?resolved.geometry, "style applied");
        self.style = Some(resolved);
        Ok(())
    }

    fn clear(&mut self) {
        self.tokens.clear();
        self.history.clear();
        self.cursor = LayoutCursor::default();
    }

    fn push_token(&mut self, token: &str) {
        self.history.push(self.cursor);
        let mut cursor = self.cursor;
        if let Some(ctx) = self.context() {
            cursor.advance(token, &ctx, |_| {});
        }
        self.cursor = cursor;
        self.tokens.push(token.to_string());
    }

    fn pop_token(&mut self) -> Option<String> {
        let token = self.tokens.pop()?;
        if let Some(previous) = self.history.pop() {
            self.cursor = previous;
        }
        Some(token)
    }

    fn content_height(&self) -> f32 {
        match &self.style {
            Some(style) if self.cursor.lines() > 0 => {
                style.config.top_padding + self.cursor.lines() as f32 * style.line_height
            }
            _ => 0.0,
        }
    }

    fn max_content_height(&self) -> f32 {
        self.style
            .as_ref()
            .map(|s| s.geometry.content_height)
            .unwrap_or(0.0)
    }

    fn rasterize(&self, quality: QualityTier, seed: u64) -> Result<RgbImage> {
        let style = self
            .style
            .as_ref()
            .ok_or_else(|| PenscriptError::Generation("rasterize called before apply_style".into()))?;
        let glyphs = self.layout();
        Ok(PageRasterizer::new(style, quality.scale(), seed).draw(&glyphs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::metrics::MonospaceMetrics;

    fn mono_surface() -> GlyphSurface {
        GlyphSurface::new(Box::new(MonospaceMetrics { ratio: 0.5 }))
    }

    #[test]
    fn a4_with_margins_has_expected_content_box() {
        let geometry = PageGeometry::for_style(&GenerationConfig::default());
        assert_eq!(geometry.content_left, 55.0);
        assert_eq!(geometry.content_top, 55.0);
        assert_eq!(geometry.content_width, 535.0);
        assert_eq!(geometry.content_height, 782.0);
    }

    #[test]
    fn ink_colours_parse() {
        assert_eq!(parse_ink_color("#000f55").unwrap(), Rgb([0, 0x0f, 0x55]));
        assert_eq!(parse_ink_color("#fff").unwrap(), Rgb([255, 255, 255]));
        assert_eq!(parse_ink_color("Navy").unwrap(), Rgb([0, 0, 128]));
        assert!(parse_ink_color("#12345").is_err());
        assert!(parse_ink_color("chartreuse-ish").is_err());
    }

    #[test]
    fn invalid_style_is_style_error() {
        let mut surface = mono_surface();
        let style = GenerationConfig {
            font_size: 0.0,
            ..GenerationConfig::default()
        };
        let err = surface.apply_style(&style).unwrap_err();
        assert!(matches!(err, PenscriptError::Style(_)));
    }

    #[test]
    fn out_of_range_style_values_are_style_errors() {
        let rejected = [
            GenerationConfig {
                font_size: 1e-30,
                ..GenerationConfig::default()
            },
            GenerationConfig {
                font_size: 5_000.0,
                ..GenerationConfig::default()
            },
            GenerationConfig {
                top_padding: -1e20,
                ..GenerationConfig::default()
            },
            GenerationConfig {
                top_padding: 900.0,
                ..GenerationConfig::default()
            },
            GenerationConfig {
                letter_spacing: f32::INFINITY,
                ..GenerationConfig::default()
            },
            GenerationConfig {
                word_spacing: -1e9,
                ..GenerationConfig::default()
            },
        ];
        for style in rejected {
            let err = ResolvedStyle::resolve(&style).unwrap_err();
            assert!(matches!(err, PenscriptError::Style(_)), "{style:?}");
        }

        let edge = GenerationConfig {
            font_size: MIN_FONT_SIZE,
            top_padding: 782.0,
            ..GenerationConfig::default()
        };
        assert!(ResolvedStyle::resolve(&edge).is_ok());
    }

    #[test]
    fn words_wrap_at_content_width() {
        let mut surface = mono_surface();
        surface.apply_style(&GenerationConfig::default()).unwrap();
        // 10pt font, 0.5 ratio: 5pt per glyph, 535pt line => 107 glyphs.
        surface.push_token(&"a".repeat(100));
        assert_eq!(surface.content_height(), 15.0);
        surface.push_token(" ");
        surface.push_token("bbbbbbbbbb");
        assert_eq!(surface.content_height(), 30.0);
        surface.pop_token();
        surface.pop_token();
        assert_eq!(surface.content_height(), 15.0);
    }

    #[test]
    fn explicit_newlines_count_as_lines() {
        let mut surface = mono_surface();
        surface.apply_style(&GenerationConfig::default()).unwrap();
        surface.push_token("a");
        surface.push_token("\n\n");
        surface.push_token("b");
        assert_eq!(surface.content_height(), 45.0);
    }

    #[test]
    fn overlong_word_breaks_between_characters() {
        let mut surface = mono_surface();
        surface.apply_style(&GenerationConfig::default()).unwrap();
        surface.push_token(&"x".repeat(250));
        // 107 + 107 + 36 glyphs.
        assert_eq!(surface.content_height(), 45.0);
        assert_eq!(surface.layout().len(), 250);
    }

    #[test]
    fn reapplying_style_is_idempotent() {
        let mut once = mono_surface();
        once.apply_style(&GenerationConfig::default()).unwrap();
        let mut twice = mono_surface();
        twice.apply_style(&GenerationConfig::default()).unwrap();
        twice.push_token("leftover");
        twice.apply_style(&GenerationConfig::default()).unwrap();
        assert_eq!(once.style(), twice.style());
        assert!(twice.tokens().is_empty());
        assert_eq!(twice.content_height(), 0.0);
    }
}
