//! Structural rules for body and CTA text.

use std::sync::LazyLock;

use regex::Regex;

pub const SENTENCE_TOO_LONG: &str = "sentence too long";
pub const TOO_MANY_EMOJIS: &str = "too many emojis";

static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]").expect("sentence break regex should be valid"));

/// Code points at or above U+10000 count as emoji.
static EMOJI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x{10000}-\x{10FFFF}]").expect("emoji regex should be valid"));

/// Limits checked by [`check_structure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructureLimits {
    pub max_sentence_words: usize,
    pub max_emojis: usize,
}

/// Sentences of `text`, split on `.`, `!` and `?`. Empty fragments are dropped.
pub fn sentences(text: &str) -> impl Iterator<Item = &str> {
    SENTENCE_BREAK
        .split(text)
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
}

pub fn longest_sentence_words(text: &str) -> usize {
    sentences(text)
        .map(|sentence| sentence.split_whitespace().count())
        .max()
        .unwrap_or(0)
}

pub fn emoji_count(text: &str) -> usize {
    EMOJI.find_iter(text).count()
}

/// First violated rule, sentence length before emoji count.
pub fn check_structure(text: &str, limits: StructureLimits) -> Option<&'static str> {
    if longest_sentence_words(text) > limits.max_sentence_words {
        return Some(SENTENCE_TOO_LONG);
    }
    if emoji_count(text) > limits.max_emojis {
        return Some(TOO_MANY_EMOJIS);
    }
    None
}
