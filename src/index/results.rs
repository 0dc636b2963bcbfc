use std::cmp::Ordering;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::value::RawValue;

/// One ranked match: where the query tokens landed, how many matching
/// positions they covered, and the length-normalized relevance.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub location: String,
    pub count: usize,
    pub score: f64,
}

impl SearchResult {
    pub fn new(location: String, count: usize, score: f64) -> Self {
        SearchResult {
            location,
            count,
            score,
        }
    }
}

/// Ranking order: score descending, then raw count descending, then location
/// ascending ignoring case. `total_cmp` keeps the order total on floats.
impl Ord for SearchResult {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.count.cmp(&self.count))
            .then_with(|| compare_locations(&self.location, &other.location))
    }
}

impl PartialOrd for SearchResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SearchResult {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchResult {}

fn compare_locations(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

impl Serialize for SearchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // scores carry exactly eight fractional digits, which no float
        // serializer produces, so the formatted text goes out as a raw value
        let score = RawValue::from_string(format!("{:.8}", self.score))
            .map_err(serde::ser::Error::custom)?;

        let mut state = serializer.serialize_struct("SearchResult", 3)?;
        state.serialize_field("count", &self.count)?;
        state.serialize_field("score", &*score)?;
        state.serialize_field("where", &self.location)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(location: &str, count: usize, score: f64) -> SearchResult {
        SearchResult::new(location.to_string(), count, score)
    }

    #[test]
    fn higher_score_ranks_first() {
        let mut results = vec![result("a", 1, 0.1), result("b", 1, 1.0)];
        results.sort();
        assert_eq!(results[0].location, "b");
    }

    #[test]
    fn count_breaks_score_ties() {
        let mut results = vec![result("a", 2, 0.5), result("b", 4, 0.5)];
        results.sort();
        assert_eq!(results[0].location, "b");
    }

    #[test]
    fn location_breaks_remaining_ties_ignoring_case() {
        let mut results = vec![result("B.txt", 2, 0.5), result("a.txt", 2, 0.5)];
        results.sort();
        assert_eq!(results[0].location, "a.txt");
    }

    #[test]
    fn serializes_with_eight_digit_score() {
        let json = serde_json::to_string(&result("a.txt", 2, 2.0 / 3.0)).unwrap();
        assert_eq!(json, r#"{"count":2,"score":0.66666667,"where":"a.txt"}"#);
    }
}
