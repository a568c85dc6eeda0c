// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Handwriting rasterizer.
//
// Draws one laid-out page: paper, ruled lines, margin rules, ink strokes for
// every glyph, spelling-mistake strike-outs and the shadow / scanner effects.
// All randomness comes from a seed so the same page always renders to the
// same pixels.

use std::collections::BTreeMap;

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use penscript_core::error::Result;
use penscript_core::types::{GenerationConfig, InkEffect, QualityTier};

use crate::image::processor::{ImageProcessor, apply_contrast};
use crate::render::surface::{LEFT_MARGIN, PlacedGlyph, ResolvedStyle, TOP_MARGIN};

const PAPER: Rgb<u8> = Rgb([255, 255, 255]);
const RULE: Rgb<u8> = Rgb([153, 153, 153]);
const MARGIN_RULE: Rgb<u8> = Rgb([255, 192, 203]);
const MARGIN_RULE_WIDTH: f32 = 2.0;
/// Opacity at the dark end of the shadow gradient (`#0008`).
const SHADOW_ALPHA: f32 = 0x88 as f32 / 255.0;
const SCANNER_CONTRAST: f32 = 0.55;
/// Stroke vertices per glyph.
const STROKE_POINTS: usize = 5;

/// Seed for one page, derived from the text, the full style and the page index.
pub fn page_seed(text: &str, style: &GenerationConfig, page_index: usize) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(format!("{style:?}").as_bytes());
    hasher.update((page_index as u64).to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Multiplier for a contrast shift of `contrast` (0..1 maps to 1..~255).
pub fn scanner_factor(contrast: f32) -> f32 {
    let c = contrast * 255.0;
    (c + 255.0) / (255.01 - c)
}

/// JPEG-encode a rasterized page at the tier's quality.
pub fn encode_page(image: RgbImage, quality: QualityTier) -> Result<Vec<u8>> {
    ImageProcessor::from_rgb(image).to_jpeg_bytes(quality.jpeg_quality())
}

/// splitmix64; small, fast and reproducible across platforms.
struct Jitter(u64);

impl Jitter {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        mix(self.0)
    }

    /// Uniform in [-1, 1).
    fn signed(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 23) as f32 - 1.0
    }
}

fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Draws a page for a resolved style at a given scale.
pub struct PageRasterizer<'a> {
    style: &'a ResolvedStyle,
    scale: f32,
    seed: u64,
}

impl<'a> PageRasterizer<'a> {
    pub fn new(style: &'a ResolvedStyle, scale: f32, seed: u64) -> Self {
        Self {
            style,
            scale: scale.max(0.1),
            seed,
        }
    }

    #[instrument(skip_all, fields(glyphs = glyphs.len(), scale = self.scale))]
    pub fn draw(&self, glyphs: &[PlacedGlyph]) -> RgbImage {
        let geometry = self.style.geometry;
        let width = (geometry.page_width * self.scale).round().max(1.0) as u32;
        let height = (geometry.page_height * self.scale).round().max(1.0) as u32;
        let mut canvas = RgbImage::from_pixel(width, height, PAPER);

        if self.style.config.paper_lines {
            self.draw_rules(&mut canvas);
        }
        if self.style.config.paper_margin {
            self.draw_margins(&mut canvas);
        }

        let mut jitter = Jitter(self.seed);
        for glyph in glyphs {
            self.draw_glyph(&mut canvas, glyph, &mut jitter);
        }
        if self.style.config.mistake_density > 0 {
            self.draw_strikes(&mut canvas, glyphs);
        }

        match self.style.config.effect {
            InkEffect::None => {}
            InkEffect::Shadow => {
                let angle = (mix(self.seed ^ 0x5AD0) % 360) as f32;
                apply_shadow(&mut canvas, angle);
            }
            InkEffect::Scanner => {
                let angle = (50 + mix(self.seed ^ 0x5CA7) % 71) as f32;
                apply_shadow(&mut canvas, angle);
                apply_contrast(&mut canvas, scanner_factor(SCANNER_CONTRAST));
            }
        }

        debug!(width, height, "page rasterized");
        canvas
    }

    fn baseline(&self, line: usize) -> f32 {
        let g = &self.style.geometry;
        let line_top =
            g.content_top + self.style.config.top_padding + line as f32 * self.style.line_height;
        (line_top + self.style.line_height * 0.5 + self.style.config.font_size * 0.3) * self.scale
    }

    fn stroke_width(&self) -> i32 {
        self.scale.round().max(1.0) as i32
    }

    fn draw_rules(&self, canvas: &mut RgbImage) {
        let g = &self.style.geometry;
        let width = canvas.width();
        let first = g.content_top + self.style.config.top_padding + self.style.line_height;
        if first >= g.page_height {
            return;
        }
        let rules = ((g.page_height - first) / self.style.line_height).ceil() as usize;
        for i in 0..rules {
            let y = first + i as f32 * self.style.line_height;
            let py = (y * self.scale).round() as i32;
            draw_filled_rect_mut(canvas, Rect::at(0, py).of_size(width, 1), RULE);
        }
    }

    fn draw_margins(&self, canvas: &mut RgbImage) {
        let thickness = (MARGIN_RULE_WIDTH * self.scale).round().max(1.0) as u32;
        let top = (TOP_MARGIN * self.scale).round() as i32;
        let left = (LEFT_MARGIN * self.scale).round() as i32;
        let (width, height) = canvas.dimensions();
        draw_filled_rect_mut(canvas, Rect::at(0, top).of_size(width, thickness), MARGIN_RULE);
        draw_filled_rect_mut(canvas, Rect::at(left, 0).of_size(thickness, height), MARGIN_RULE);
    }

    fn stroke(&self, canvas: &mut RgbImage, from: (f32, f32), to: (f32, f32)) {
        let ink = self.style.ink;
        for offset in 0..self.stroke_width() {
            let dy = offset as f32;
            draw_line_segment_mut(canvas, (from.0, from.1 + dy), (to.0, to.1 + dy), ink);
        }
    }

    fn draw_glyph(&self, canvas: &mut RgbImage, glyph: &PlacedGlyph, jitter: &mut Jitter) {
        if glyph.ch.is_whitespace() {
            return;
        }
        let fs = self.style.config.font_size * self.scale;
        let left = (self.style.geometry.content_left + glyph.x) * self.scale;
        let baseline = self.baseline(glyph.line);

        if matches!(glyph.ch, '.' | ',' | ':' | ';' | '\'' | '`') {
            let cx = left + glyph.advance * self.scale * 0.4;
            let cy = baseline + jitter.signed() * 0.04 * fs;
            let radius = (fs * 0.06).round().max(1.0) as i32;
            let center = (cx.round() as i32, cy.round() as i32);
            draw_filled_circle_mut(canvas, center, radius, self.style.ink);
            return;
        }

        let (rise, descent) = glyph_extent(glyph.ch);
        let width = (glyph.advance * 0.85).max(1.0) * self.scale;
        let code = glyph.ch as u32;
        let mut previous: Option<(f32, f32)> = None;
        for i in 0..=STROKE_POINTS {
            let t = i as f32 / STROKE_POINTS as f32;
            let lift = if i % 2 == 0 {
                0.0
            } else if (code >> (i % 8)) & 1 == 1 {
                rise
            } else {
                rise * 0.55
            };
            let mut y = baseline - lift * fs + jitter.signed() * 0.06 * fs;
            if i == STROKE_POINTS && descent > 0.0 {
                y = baseline + descent * fs;
            }
            let x = left + t * width + jitter.signed() * 0.04 * fs;
            if let Some(from) = previous {
                self.stroke(canvas, from, (x, y));
            }
            previous = Some((x, y));
        }
    }

    fn draw_strikes(&self, canvas: &mut RgbImage, glyphs: &[PlacedGlyph]) {
        // (word, line) -> horizontal extent in points.
        let mut spans: BTreeMap<(usize, usize), (f32, f32)> = BTreeMap::new();
        for glyph in glyphs.iter().filter(|g| !g.ch.is_whitespace()) {
            let span = spans
                .entry((glyph.word, glyph.line))
                .or_insert((glyph.x, glyph.x + glyph.advance));
            span.0 = span.0.min(glyph.x);
            span.1 = span.1.max(glyph.x + glyph.advance);
        }

        let density = u64::from(self.style.config.mistake_density);
        let fs = self.style.config.font_size * self.scale;
        for ((word, line), (start, end)) in spans {
            let roll = mix(self.seed ^ (word as u64).wrapping_mul(0xA24B_AED4_963E_E407));
            if roll % 100 >= density {
                continue;
            }
            let left = self.style.geometry.content_left;
            let y = self.baseline(line) - 0.25 * fs;
            let slope = ((roll >> 8) % 7) as f32 / 6.0 - 0.5;
            self.stroke(
                canvas,
                ((left + start) * self.scale, y + slope * 0.1 * fs),
                ((left + end) * self.scale, y - slope * 0.1 * fs),
            );
        }
    }
}

/// (ascent, descent) as fractions of the font size.
fn glyph_extent(ch: char) -> (f32, f32) {
    let descent = if matches!(ch, 'g' | 'j' | 'p' | 'q' | 'y') {
        0.3
    } else {
        0.0
    };
    let rise = if ch.is_uppercase()
        || ch.is_ascii_digit()
        || matches!(ch, 'b' | 'd' | 'f' | 'h' | 'k' | 'l' | 't')
    {
        0.7
    } else {
        0.45
    };
    (rise, descent)
}

/// Linear gradient from `SHADOW_ALPHA` black to transparent along `angle`
/// degrees.
fn apply_shadow(canvas: &mut RgbImage, angle: f32) {
    let (sin, cos) = angle.to_radians().sin_cos();
    let (w, h) = (canvas.width() as f32, canvas.height() as f32);
    let corners = [0.0, w * cos, h * sin, w * cos + h * sin];
    let min = corners.iter().copied().fold(f32::INFINITY, f32::min);
    let max = corners.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let span = (max - min).max(1.0);

    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        let t = ((x as f32 * cos + y as f32 * sin) - min) / span;
        let keep = 1.0 - SHADOW_ALPHA * (1.0 - t);
        for channel in pixel.0.iter_mut() {
            *channel = (f32::from(*channel) * keep).round().clamp(0.0, 255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::metrics::MonospaceMetrics;
    use crate::render::surface::{GlyphSurface, MIN_FONT_SIZE, RenderSurface};

    fn render(style: &GenerationConfig, text: &[&str], seed: u64) -> RgbImage {
        let mut surface = GlyphSurface::new(Box::new(MonospaceMetrics { ratio: 0.5 }));
        surface.apply_style(style).unwrap();
        for token in text {
            surface.push_token(token);
        }
        surface.rasterize(QualityTier::Low, seed).unwrap()
    }

    fn ink_pixels(image: &RgbImage, ink: Rgb<u8>) -> usize {
        image.pixels().filter(|p| **p == ink).count()
    }

    fn mean_luma(image: &RgbImage) -> f64 {
        let total: u64 = image
            .pixels()
            .map(|p| p.0.iter().map(|&c| u64::from(c)).sum::<u64>())
            .sum();
        total as f64 / (image.width() as f64 * image.height() as f64 * 3.0)
    }

    #[test]
    fn low_tier_page_is_page_sized_with_margin_rules() {
        let image = render(&GenerationConfig::default(), &[], 1);
        assert_eq!(image.dimensions(), (595, 842));
        assert_eq!(*image.get_pixel(300, 50), MARGIN_RULE);
        assert_eq!(*image.get_pixel(50, 400), MARGIN_RULE);
        assert_eq!(*image.get_pixel(300, 30), PAPER);
    }

    fn rule_rows(image: &RgbImage) -> usize {
        (0..image.height()).filter(|&y| *image.get_pixel(10, y) == RULE).count()
    }

    #[test]
    fn ruled_lines_fill_the_page_below_the_first_line() {
        // First rule at 55 + 15 = 70pt, then every 15pt while above 842pt.
        let image = render(&GenerationConfig::default(), &[], 1);
        assert_eq!(rule_rows(&image), 52);
        assert_eq!(*image.get_pixel(10, 70), RULE);
        assert_eq!(*image.get_pixel(10, 835), RULE);
    }

    #[test]
    fn extreme_but_valid_styles_still_render() {
        let tiny = GenerationConfig {
            font_size: MIN_FONT_SIZE,
            ..GenerationConfig::default()
        };
        let image = render(&tiny, &["hi"], 3);
        assert!(rule_rows(&image) > 500);

        let padded = GenerationConfig {
            top_padding: 782.0,
            ..GenerationConfig::default()
        };
        let image = render(&padded, &["hi"], 3);
        assert_eq!(rule_rows(&image), 0);
    }

    #[test]
    fn text_leaves_ink_on_the_page() {
        let style = GenerationConfig::default();
        let blank = render(&style, &[], 7);
        let written = render(&style, &["Hello", " ", "world"], 7);
        let ink = Rgb([0, 0x0f, 0x55]);
        assert_eq!(ink_pixels(&blank, ink), 0);
        assert!(ink_pixels(&written, ink) > 20);
    }

    #[test]
    fn rendering_is_deterministic_per_seed() {
        let style = GenerationConfig {
            effect: InkEffect::Shadow,
            ..GenerationConfig::default()
        };
        let a = render(&style, &["same", " ", "words"], 42);
        let b = render(&style, &["same", " ", "words"], 42);
        assert!(a == b);
    }

    #[test]
    fn full_mistake_density_strikes_words() {
        let words = ["alpha", " ", "beta", " ", "gamma"];
        let ink = Rgb([0, 0x0f, 0x55]);
        let clean = render(&GenerationConfig::default(), &words, 3);
        let struck = render(
            &GenerationConfig {
                mistake_density: 100,
                ..GenerationConfig::default()
            },
            &words,
            3,
        );
        assert!(ink_pixels(&struck, ink) > ink_pixels(&clean, ink));
    }

    #[test]
    fn shadow_darkens_the_page() {
        let plain = render(&GenerationConfig::default(), &[], 9);
        let shadowed = render(
            &GenerationConfig {
                effect: InkEffect::Shadow,
                ..GenerationConfig::default()
            },
            &[],
            9,
        );
        assert!(mean_luma(&shadowed) < mean_luma(&plain) - 10.0);
    }

    #[test]
    fn scanner_factor_matches_contrast_formula() {
        assert!((scanner_factor(0.0) - 255.0 / 255.01).abs() < 1e-4);
        assert!((scanner_factor(SCANNER_CONTRAST) - 3.4441).abs() < 1e-3);
    }

    #[test]
    fn seeds_depend_on_page_index_and_style() {
        let style = GenerationConfig::default();
        let other = GenerationConfig {
            font_size: 12.0,
            ..GenerationConfig::default()
        };
        assert_eq!(page_seed("t", &style, 0), page_seed("t", &style, 0));
        assert_ne!(page_seed("t", &style, 0), page_seed("t", &style, 1));
        assert_ne!(page_seed("t", &style, 0), page_seed("t", &other, 0));
    }
}
