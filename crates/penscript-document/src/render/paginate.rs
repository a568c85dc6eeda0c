// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Live-measurement pagination.
//
// Tokens are appended to the surface one at a time and the content height is
// re-measured after each append. A token that pushes the height past the page
// is removed again and starts the next page.

use tracing::{debug, info, instrument, warn};

use penscript_core::error::{PenscriptError, Result};
use penscript_core::types::GenerationConfig;

use crate::render::surface::RenderSurface;
use crate::render::tokenize::tokenize;

/// Iterations allowed on top of twice the token count.
const ITERATION_SLACK: usize = 16;

/// One finished page: the exact tokens it holds, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub index: usize,
    pub tokens: Vec<String>,
}

impl Page {
    /// The page's text, byte for byte as it appeared in the input.
    pub fn text(&self) -> String {
        self.tokens.concat()
    }

    pub fn is_blank(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Splits text into pages by measuring it on a [`RenderSurface`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Paginator {
    iteration_limit: Option<usize>,
}

impl Paginator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the iteration bound (normally `2 * tokens + 16`).
    pub fn with_iteration_limit(mut self, limit: usize) -> Self {
        self.iteration_limit = Some(limit);
        self
    }

    fn limit_for(&self, tokens: usize) -> usize {
        self.iteration_limit
            .unwrap_or(tokens.saturating_mul(2).saturating_add(ITERATION_SLACK))
    }

    /// Paginate `text` under `style`.
    ///
    /// Every token lands on exactly one page and the pages concatenate back
    /// to `text`. Empty text yields a single blank page. On return the
    /// surface is reset to `style` with no content.
    #[instrument(skip_all, fields(chars = text.len()))]
    pub fn paginate<S>(&self, surface: &mut S, text: &str, style: &GenerationConfig) -> Result<Vec<Page>>
    where
        S: RenderSurface + ?Sized,
    {
        surface.apply_style(style)?;
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Ok(vec![Page {
                index: 0,
                tokens: Vec::new(),
            }]);
        }

        let max_height = surface.max_content_height();
        let limit = self.limit_for(tokens.len());
        let mut pages = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut iterations = 0usize;
        let mut next = 0usize;

        while next < tokens.len() {
            iterations += 1;
            if iterations > limit {
                warn!(limit, tokens = tokens.len(), "pagination did not converge");
                return Err(PenscriptError::PaginationOverflow {
                    limit,
                    tokens: tokens.len(),
                });
            }

            let token = &tokens[next];
            surface.push_token(token);
            if surface.content_height() <= max_height {
                current.push(token.clone());
                next += 1;
                continue;
            }

            surface.pop_token();
            if current.is_empty() {
                // Taller than a whole page on its own; it gets a page anyway.
                debug!(index = next, "force-placing oversized token");
                current.push(token.clone());
                next += 1;
            }
            pages.push(Page {
                index: pages.len(),
                tokens: std::mem::take(&mut current),
            });
            surface.apply_style(style)?;
        }

        if !current.is_empty() {
            pages.push(Page {
                index: pages.len(),
                tokens: current,
            });
        }
        surface.apply_style(style)?;

        info!(pages = pages.len(), tokens = tokens.len(), iterations, "pagination complete");
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::metrics::MonospaceMetrics;
    use crate::render::surface::GlyphSurface;

    fn surface() -> GlyphSurface {
        // 5pt glyphs, 15pt lines, 52 lines per A4 page with margins.
        GlyphSurface::new(Box::new(MonospaceMetrics { ratio: 0.5 }))
    }

    fn lines(count: usize) -> String {
        (0..count).map(|i| format!("l{i}")).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn empty_text_gives_one_blank_page() {
        let pages = Paginator::new()
            .paginate(&mut surface(), "", &GenerationConfig::default())
            .unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].is_blank());
    }

    #[test]
    fn text_of_two_and_a_bit_pages_gives_three() {
        let text = lines(109);
        let pages = Paginator::new()
            .paginate(&mut surface(), &text, &GenerationConfig::default())
            .unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages.iter().map(|p| p.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(pages[0].text(), lines(52));
        assert!(pages[2].text().ends_with("l108"));
    }

    #[test]
    fn full_pages_hold_52_lines_and_the_last_holds_the_rest() {
        // Each word fills a line exactly (107 glyphs of 5pt = 535pt); the
        // space after it hangs past the edge and the next word wraps.
        let word = "x".repeat(107);
        let text = vec![word.as_str(); 109].join(" ");
        let style = GenerationConfig::default();
        let pages = Paginator::new().paginate(&mut surface(), &text, &style).unwrap();

        let words: Vec<usize> = pages
            .iter()
            .map(|p| p.tokens.iter().filter(|t| t.as_str() == word).count())
            .collect();
        assert_eq!(words, vec![52, 52, 5]);

        let mut last = surface();
        last.apply_style(&style).unwrap();
        for token in &pages[2].tokens {
            last.push_token(token);
        }
        assert_eq!(last.content_height(), 5.0 * 15.0);
    }

    #[test]
    fn pagination_is_lossless() {
        let text = format!("{}\n\n  indented\ttail  ", lines(130));
        let pages = Paginator::new()
            .paginate(&mut surface(), &text, &GenerationConfig::default())
            .unwrap();
        let rebuilt: String = pages.iter().map(Page::text).collect();
        assert_eq!(rebuilt, text);
        assert!(pages.iter().all(|p| !p.is_blank()));
    }

    #[test]
    fn pages_stay_within_content_height() {
        let style = GenerationConfig::default();
        let text = "word ".repeat(3000);
        let mut measuring = surface();
        let pages = Paginator::new().paginate(&mut measuring, &text, &style).unwrap();
        assert!(pages.len() > 1);

        for page in &pages {
            let mut check = surface();
            check.apply_style(&style).unwrap();
            for token in &page.tokens {
                check.push_token(token);
            }
            assert!(
                check.content_height() <= check.max_content_height() || page.tokens.len() == 1,
                "page {} overflows",
                page.index
            );
        }
    }

    #[test]
    fn oversized_token_is_forced_onto_its_own_page() {
        let style = GenerationConfig {
            font_size: 200.0,
            ..GenerationConfig::default()
        };
        // 100pt glyphs: 5 per line, 300pt lines, 2 lines per page.
        let text = format!("a {}", "x".repeat(20));
        let pages = Paginator::new().paginate(&mut surface(), &text, &style).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].tokens, vec!["x".repeat(20)]);
    }

    #[test]
    fn exceeding_the_iteration_bound_is_an_error() {
        let err = Paginator::new()
            .with_iteration_limit(3)
            .paginate(&mut surface(), "one two three", &GenerationConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            PenscriptError::PaginationOverflow { limit: 3, tokens: 5 }
        ));
    }
}
