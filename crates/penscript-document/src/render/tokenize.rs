// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lossless word/whitespace tokenizer.

/// Split `text` into alternating runs of non-whitespace and whitespace.
///
/// Concatenating the result reproduces `text` exactly; newlines, tabs and
/// repeated spaces are kept inside the whitespace tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;

    for (idx, ch) in text.char_indices() {
        let is_space = ch.is_whitespace();
        match in_space {
            Some(prev) if prev != is_space => {
                tokens.push(text[start..idx].to_string());
                start = idx;
            }
            _ => {}
        }
        in_space = Some(is_space);
    }
    if start < text.len() {
        tokens.push(text[start..].to_string());
    }
    tokens
}

pub fn is_whitespace_token(token: &str) -> bool {
    token.chars().all(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_mixed_whitespace() {
        let text = "  Dear diary,\n\n\ttoday   was\u{00a0}fine. ";
        let tokens = tokenize(text);
        assert_eq!(tokens.concat(), text);
        assert_eq!(tokens[0], "  ");
        assert_eq!(tokens[1], "Dear");
    }

    #[test]
    fn words_and_spaces_alternate() {
        let tokens = tokenize("a b  c");
        assert_eq!(tokens, vec!["a", " ", "b", "  ", "c"]);
        assert!(tokens
            .windows(2)
            .all(|w| is_whitespace_token(&w[0]) != is_whitespace_token(&w[1])));
    }

    #[test]
    fn empty_text_has_no_tokens() {
        assert!(tokenize("").is_empty());
    }
}
