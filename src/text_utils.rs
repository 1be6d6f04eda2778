use lazy_static::lazy_static;
use regex::Regex;

use crate::lexicon::TOKEN_PUNCTUATION;

/// Marker appended to any text cut short by a truncation helper
pub const ELLIPSIS: &str = "...";

lazy_static! {
    /// Runs of sentence terminators split Document Text into sentences
    static ref SENTENCE_BOUNDARY: Regex = Regex::new(r"[.!?]+").expect("sentence boundary pattern is valid");
}

/// Character-offset index over a text, for slicing by character position
/// instead of byte position.
#[derive(Debug, Clone)]
pub struct CharIndex<'a> {
    text: &'a str,
    byte_offsets: Vec<usize>, // Byte offset of each character, plus the final length
}

impl<'a> CharIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut byte_offsets: Vec<usize> = text.char_indices().map(|(byte, _)| byte).collect();
        byte_offsets.push(text.len());
        Self { text, byte_offsets }
    }

    /// Total number of characters in the indexed text
    pub fn char_count(&self) -> usize {
        self.byte_offsets.len() - 1
    }

    /// Convert a byte offset (on a char boundary) into a character offset
    pub fn char_at_byte(&self, byte: usize) -> usize {
        match self.byte_offsets.binary_search(&byte) {
            Ok(position) => position,
            Err(position) => position.saturating_sub(1),
        }
    }

    /// Slice the text by character range, clamped to the text bounds
    pub fn slice(&self, start_char: usize, end_char: usize) -> &'a str {
        let total = self.char_count();
        let start = start_char.min(total);
        let end = end_char.min(total).max(start);
        &self.text[self.byte_offsets[start]..self.byte_offsets[end]]
    }
}

/// Non-empty, trimmed lines of the text, in order
pub fn paragraphs(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Raw pieces between sentence terminators, untrimmed and including empty pieces.
/// Indices into this list are the sentence positions reported by fuzzy search.
pub fn raw_sentences(text: &str) -> Vec<&str> {
    SENTENCE_BOUNDARY.split(text).collect()
}

/// Trimmed, non-empty sentences
pub fn sentences(text: &str) -> Vec<&str> {
    raw_sentences(text)
        .into_iter()
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .collect()
}

pub fn words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Longest prefix of `text` holding at most `max_chars` characters
pub fn take_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

/// Cut `text` to `max_chars` characters, appending the ellipsis marker only when something was cut
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    let prefix = take_chars(text, max_chars);
    if prefix.len() < text.len() {
        format!("{}{}", prefix, ELLIPSIS)
    } else {
        text.to_string()
    }
}

/// Whether any of the terms occurs as a substring of an already lower-cased haystack
pub fn contains_any(haystack_lower: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| haystack_lower.contains(term))
}

/// Number of distinct terms occurring in an already lower-cased haystack
pub fn count_present(haystack_lower: &str, terms: &[&str]) -> usize {
    terms.iter().filter(|term| haystack_lower.contains(*term)).count()
}

/// Strip the token punctuation set from both ends of a word
pub fn strip_token_punctuation(word: &str) -> &str {
    word.trim_matches(|c: char| TOKEN_PUNCTUATION.contains(c))
}

/// At least one cased character, and every cased character upper-case
pub fn is_upper_cased(text: &str) -> bool {
    let mut cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

/// Title case: upper-case letters only start a cased run, lower-case letters only continue one
pub fn is_title_cased(text: &str) -> bool {
    let mut cased = false;
    let mut previous_is_cased = false;
    for c in text.chars() {
        if c.is_uppercase() {
            if previous_is_cased {
                return false;
            }
            previous_is_cased = true;
            cased = true;
        } else if c.is_lowercase() {
            if !previous_is_cased {
                return false;
            }
            previous_is_cased = true;
            cased = true;
        } else {
            previous_is_cased = false;
        }
    }
    cased
}

/// Render an integer with comma thousands separators, e.g. 12345 -> "12,345"
pub fn format_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Mean of `total` over `count`, with an empty count treated as one
pub fn average(total: usize, count: usize) -> f64 {
    total as f64 / count.max(1) as f64
}
