/*
BSD 2-Clause License

Copyright (c) 2022, Diagnosis and Control of Clouds Laboratory
All rights reserved.

Redistribution and use in source and binary forms, with or without
modification, are permitted provided that the following conditions are met:

1. Redistributions of source code must retain the above copyright notice, this
   list of conditions and the following disclaimer.

2. Redistributions in binary form must reproduce the above copyright notice,
   this list of conditions and the following disclaimer in the documentation
   and/or other materials provided with the distribution.

THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS"
AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE
FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL
DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER
CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY,
OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

*/

//! C1 — Text utilities: tokenization, template masking, dedup
//! normalization, and token complexity (spec.md §4.1).

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HEX_LITERAL: Regex = Regex::new(r"\b0x[0-9a-f]+\b").unwrap();
    static ref BARE_NUMBER: Regex = Regex::new(r"\b\d+\b").unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

fn is_token_boundary_char(c: char) -> bool {
    !(c.is_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | ':'))
}

/// Splits on whitespace runs, then trims leading/trailing characters that
/// are neither alphanumeric nor in `{/ . _ - :}`. Empty tokens are dropped.
pub fn tokenize_for_entity_candidates(msg: &str) -> Vec<String> {
    msg.split_whitespace()
        .map(|raw| raw.trim_matches(is_token_boundary_char).to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Trims, optionally lowercases, and collapses whitespace runs to a single
/// space — the key used to deduplicate evidence candidates by message text.
pub fn normalize_message_for_dedup(msg: &str, case_insensitive: bool) -> String {
    let trimmed = msg.trim();
    let cased = if case_insensitive {
        trimmed.to_lowercase()
    } else {
        trimmed.to_string()
    };
    WHITESPACE_RUN.replace_all(&cased, " ").into_owned()
}

/// Lowercases, masks out hex literals and bare numbers, and collapses
/// whitespace — the identity used by the burst detector (C3) to group
/// messages into templates.
pub fn mask_for_template_key(msg: &str) -> String {
    let lower = msg.to_lowercase();
    let no_hex = HEX_LITERAL.replace_all(&lower, "<HEX>");
    let no_num = BARE_NUMBER.replace_all(&no_hex, "<NUM>");
    WHITESPACE_RUN.replace_all(&no_num, " ").into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Digit,
    Alpha,
    Other,
}

fn char_class(c: char) -> CharClass {
    if c.is_ascii_digit() {
        CharClass::Digit
    } else if c.is_alphabetic() {
        CharClass::Alpha
    } else {
        CharClass::Other
    }
}

/// Counts character-class transitions over the token (digit / alpha /
/// other). Tokens shorter than two characters always score 0.
pub fn token_complexity(tok: &str) -> usize {
    let chars: Vec<char> = tok.chars().collect();
    if chars.len() < 2 {
        return 0;
    }
    let mut transitions = 0;
    let mut prev = char_class(chars[0]);
    for &c in &chars[1..] {
        let cur = char_class(c);
        if cur != prev {
            transitions += 1;
        }
        prev = cur;
    }
    transitions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_trims_boundary_punctuation() {
        let toks = tokenize_for_entity_candidates("  connection (reset) from 10.0.0.5:443! ");
        assert_eq!(
            toks,
            vec!["connection", "reset", "from", "10.0.0.5:443"]
        );
    }

    #[test]
    fn tokenize_drops_empty_tokens() {
        let toks = tokenize_for_entity_candidates("-- ** foo");
        assert_eq!(toks, vec!["foo"]);
    }

    #[test]
    fn normalize_collapses_whitespace_and_cases() {
        assert_eq!(
            normalize_message_for_dedup("  Disk   Full  ", true),
            "disk full"
        );
        assert_eq!(
            normalize_message_for_dedup("  Disk   Full  ", false),
            "Disk Full"
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_message_for_dedup("  Disk   Full  ", true);
        let twice = normalize_message_for_dedup(&once, true);
        assert_eq!(once, twice);
    }

    #[test]
    fn mask_replaces_hex_and_numbers() {
        assert_eq!(
            mask_for_template_key("Block 0xDEADBEEF failed after 42 retries"),
            "block <HEX> failed after <NUM> retries"
        );
    }

    #[test]
    fn mask_is_idempotent() {
        let once = mask_for_template_key("retry 17 at 0xFF");
        let twice = mask_for_template_key(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn mask_leaves_non_standalone_hex_lookalikes_untouched() {
        assert_eq!(
            mask_for_template_key("foo0xdeadbar baz"),
            "foo0xdeadbar baz"
        );
    }

    #[test]
    fn complexity_short_tokens_are_zero() {
        assert_eq!(token_complexity(""), 0);
        assert_eq!(token_complexity("a"), 0);
    }

    #[test]
    fn complexity_counts_transitions() {
        // n -> o -> d -> e -> 7  : alpha,alpha,alpha,alpha,digit => 1 transition
        assert_eq!(token_complexity("node7"), 1);
        // Node-7 : alpha,alpha,alpha,alpha,other,digit => 2 transitions
        assert_eq!(token_complexity("Node-7"), 2);
    }
}
