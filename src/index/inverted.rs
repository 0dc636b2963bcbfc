use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use crate::index::results::SearchResult;

/// In-memory inverted index: stemmed word → location → ordered positions,
/// plus the per-location word count used as the score denominator.
///
/// Ordered maps make every iteration order deterministic (words ascending,
/// locations ascending, positions ascending), which the JSON emitters and the
/// prefix seek in `partial_search` both rely on.
///
/// This type is not synchronized; the capability wrappers in
/// [`crate::index::shared`] decide how it is shared.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    postings: BTreeMap<String, BTreeMap<String, BTreeSet<usize>>>,
    counts: BTreeMap<String, usize>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        InvertedIndex {
            postings: BTreeMap::new(),
            counts: BTreeMap::new(),
        }
    }

    /// Insert one `(word, location, position)` triple. The word count of
    /// `location` grows only when the position is genuinely new, so the count
    /// stays equal to the number of distinct position insertions.
    pub fn add(&mut self, word: &str, location: &str, position: usize) {
        let inserted = self
            .postings
            .entry(word.to_string())
            .or_default()
            .entry(location.to_string())
            .or_default()
            .insert(position);

        if inserted {
            *self.counts.entry(location.to_string()).or_default() += 1;
        }
    }

    /// Insert a whole document slice, numbering positions from `start`.
    pub fn add_all<I>(&mut self, words: I, location: &str, start: usize)
    where
        I: IntoIterator<Item = String>,
    {
        for (offset, word) in words.into_iter().enumerate() {
            self.add(&word, location, start + offset);
        }
    }

    /// Fold another index into this one. Word counts merge by maximum: for
    /// the disjoint per-document indexes the builders produce this is exact,
    /// and for a repeated location the larger denominator wins.
    pub fn merge(&mut self, other: InvertedIndex) {
        for (word, locations) in other.postings {
            let entry = self.postings.entry(word).or_default();
            for (location, positions) in locations {
                entry.entry(location).or_default().extend(positions);
            }
        }

        for (location, count) in other.counts {
            let current = self.counts.entry(location).or_default();
            *current = (*current).max(count);
        }
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }

    pub fn locations(&self, word: &str) -> impl Iterator<Item = &str> {
        self.postings
            .get(word)
            .into_iter()
            .flat_map(|locations| locations.keys().map(String::as_str))
    }

    pub fn positions(&self, word: &str, location: &str) -> impl Iterator<Item = usize> {
        self.postings
            .get(word)
            .and_then(|locations| locations.get(location))
            .into_iter()
            .flat_map(|positions| positions.iter().copied())
    }

    pub fn word_count(&self, location: &str) -> usize {
        self.counts.get(location).copied().unwrap_or(0)
    }

    pub fn word_counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    pub fn postings(&self) -> &BTreeMap<String, BTreeMap<String, BTreeSet<usize>>> {
        &self.postings
    }

    pub fn contains(&self, word: &str) -> bool {
        self.postings.contains_key(word)
    }

    pub fn contains_location(&self, word: &str, location: &str) -> bool {
        self.postings
            .get(word)
            .is_some_and(|locations| locations.contains_key(location))
    }

    pub fn contains_position(&self, word: &str, location: &str, position: usize) -> bool {
        self.postings
            .get(word)
            .and_then(|locations| locations.get(location))
            .is_some_and(|positions| positions.contains(&position))
    }

    pub fn num_words(&self) -> usize {
        self.postings.len()
    }

    pub fn num_locations(&self, word: &str) -> usize {
        self.postings.get(word).map_or(0, BTreeMap::len)
    }

    pub fn num_positions(&self, word: &str, location: &str) -> usize {
        self.postings
            .get(word)
            .and_then(|locations| locations.get(location))
            .map_or(0, BTreeSet::len)
    }

    pub fn num_word_counts(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn search(&self, queries: &BTreeSet<String>, partial: bool) -> Vec<SearchResult> {
        if partial {
            self.partial_search(queries)
        } else {
            self.exact_search(queries)
        }
    }

    /// Union of the posting lists of the query words present as dictionary
    /// keys.
    pub fn exact_search(&self, queries: &BTreeSet<String>) -> Vec<SearchResult> {
        let mut matches: BTreeMap<&String, usize> = BTreeMap::new();

        for query in queries {
            if let Some(locations) = self.postings.get(query) {
                fold_locations(&mut matches, locations);
            }
        }

        self.collect_results(matches)
    }

    /// Union of the posting lists of every dictionary key that starts with a
    /// query word. The ordered dictionary lets each query word seek to its
    /// first candidate and stop at the first non-matching key instead of
    /// scanning the whole dictionary.
    pub fn partial_search(&self, queries: &BTreeSet<String>) -> Vec<SearchResult> {
        let mut matches: BTreeMap<&String, usize> = BTreeMap::new();

        for query in queries {
            let tail = self
                .postings
                .range::<str, _>((Bound::Included(query.as_str()), Bound::Unbounded));

            for (_, locations) in tail.take_while(|(word, _)| word.starts_with(query.as_str())) {
                fold_locations(&mut matches, locations);
            }
        }

        self.collect_results(matches)
    }

    fn collect_results(&self, matches: BTreeMap<&String, usize>) -> Vec<SearchResult> {
        let mut results: Vec<SearchResult> = matches
            .into_iter()
            .map(|(location, count)| {
                // a matched location always has a word count (the same add
                // that created the posting created the count)
                let length = self.counts[location];
                SearchResult::new(location.clone(), count, count as f64 / length as f64)
            })
            .collect();

        results.sort();
        results
    }
}

fn fold_locations<'a>(
    matches: &mut BTreeMap<&'a String, usize>,
    locations: &'a BTreeMap<String, BTreeSet<usize>>,
) {
    for (location, positions) in locations {
        *matches.entry(location).or_default() += positions.len();
    }
}
