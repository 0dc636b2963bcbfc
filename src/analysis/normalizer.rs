use std::collections::BTreeSet;

use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;

/// Turns raw text into the stemmed tokens the index stores.
///
/// The pipeline is fixed: NFD decomposition, drop every codepoint that is not
/// an ASCII letter or whitespace, lowercase, split on whitespace runs, stem.
/// Accented letters decompose into their base letter plus a combining mark,
/// so the filter reduces them to plain ASCII instead of deleting the word.
pub struct TextNormalizer {
    stemmer: Stemmer,
}

impl TextNormalizer {
    pub fn new() -> Self {
        TextNormalizer {
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    /// Lazy token stream in document order. Never yields an empty string.
    pub fn tokens<'a>(&'a self, text: &'a str) -> Tokens<'a> {
        Tokens {
            stemmer: &self.stemmer,
            chars: text.nfd(),
        }
    }

    /// Eager variant for callers that need the whole document at once.
    pub fn token_list(&self, text: &str) -> Vec<String> {
        self.tokens(text).collect()
    }

    /// Sorted, deduplicated stems of a query line.
    pub fn unique_stems(&self, line: &str) -> BTreeSet<String> {
        self.tokens(line).collect()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Tokens<'a> {
    stemmer: &'a Stemmer,
    chars: unicode_normalization::Decompositions<std::str::Chars<'a>>,
}

impl Iterator for Tokens<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut word = String::new();

        for ch in self.chars.by_ref() {
            if ch.is_ascii_alphabetic() {
                word.push(ch.to_ascii_lowercase());
            } else if ch.is_whitespace() && !word.is_empty() {
                break;
            }
            // anything else is dropped without ending the current word
        }

        if word.is_empty() {
            None
        } else {
            Some(self.stemmer.stem(&word).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_stems() {
        let normalizer = TextNormalizer::new();
        let tokens = normalizer.token_list("Hello HELLO world.");
        assert_eq!(tokens, vec!["hello", "hello", "world"]);
    }

    #[test]
    fn stemming_collapses_inflections() {
        let normalizer = TextNormalizer::new();
        let tokens = normalizer.token_list("run running runner");
        assert_eq!(tokens, vec!["run", "run", "runner"]);
    }

    #[test]
    fn strips_accents_via_decomposition() {
        let normalizer = TextNormalizer::new();
        let tokens = normalizer.token_list("café naïve");
        assert_eq!(tokens, vec!["cafe", "naiv"]);
    }

    #[test]
    fn drops_digits_and_punctuation_inside_words() {
        let normalizer = TextNormalizer::new();
        let tokens = normalizer.token_list("abc123 it's 42");
        assert_eq!(tokens, vec!["abc", "it"]);
    }

    #[test]
    fn empty_and_whitespace_input_yield_nothing() {
        let normalizer = TextNormalizer::new();
        assert!(normalizer.token_list("").is_empty());
        assert!(normalizer.token_list(" \t\r\n ").is_empty());
        assert!(normalizer.token_list("123 !?").is_empty());
    }

    #[test]
    fn unique_stems_sorts_and_deduplicates() {
        let normalizer = TextNormalizer::new();
        let stems = normalizer.unique_stems("foo bar foo BAR");
        let collected: Vec<&str> = stems.iter().map(String::as_str).collect();
        assert_eq!(collected, vec!["bar", "foo"]);
    }
}
