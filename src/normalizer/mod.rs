//! Text normalization for ingredient names and portion strings.
//!
//! Turns scraped text such as `"2 cups Whole MILK!!"` into lemmatized tokens
//! (`["cup", "whole", "milk"]`) and canonical identities (`"Whole Milk"`).

pub mod lemma;

use regex::Regex;

/// Anything that is neither a letter, a combining mark nor whitespace. Marks
/// stay because lowercasing can produce them ("İ" becomes "i" + U+0307).
const NON_LETTER_PATTERN: &str = r"[^\p{Alphabetic}\p{M}\s]";

/// Pure text normalizer. Cheap to clone; construct once and pass it to the
/// components that need it.
#[derive(Debug, Clone)]
pub struct Normalizer {
    non_letter: Regex,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            non_letter: Regex::new(NON_LETTER_PATTERN).unwrap(),
        }
    }

    /// Split raw text into lowercase lemmatized tokens, dropping single letters.
    pub fn normalize(&self, raw: &str) -> Vec<String> {
        let cleaned = self.non_letter.replace_all(raw, " ");

        cleaned
            .split_whitespace()
            .map(|word| lemma::lemmatize(&word.to_lowercase()))
            .filter(|token| token.chars().count() > 1)
            .collect()
    }

    /// Normalized tokens joined with single spaces.
    pub fn normalize_as_string(&self, raw: &str) -> String {
        self.normalize(raw).join(" ")
    }

    /// Display-stable canonical identity: normalized tokens, each capitalized.
    ///
    /// Returns an empty string when nothing survives normalization.
    pub fn canonicalize_name(&self, raw: &str) -> String {
        self.normalize(raw)
            .iter()
            .map(|token| capitalize(token))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The matcher's view of a portion string, lowercase and space-separated.
    pub fn clean_portion(&self, raw: &str) -> String {
        self.normalize_as_string(raw)
    }
}

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
