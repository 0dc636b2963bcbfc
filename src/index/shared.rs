use std::cell::RefCell;
use std::collections::BTreeSet;

use crate::index::inverted::InvertedIndex;
use crate::index::results::SearchResult;
use crate::sync::rwlock::ReadWriteLock;

/// The index capability builders, crawlers, and query engines program
/// against. Every provided method performs exactly one scoped acquisition and
/// delegates to the non-locking [`InvertedIndex`] helpers, so no
/// implementation ever needs a re-entrant lock.
pub trait SearchIndex {
    fn with_read<R>(&self, reader: impl FnOnce(&InvertedIndex) -> R) -> R;

    fn with_write<R>(&self, writer: impl FnOnce(&mut InvertedIndex) -> R) -> R;

    fn add(&self, word: &str, location: &str, position: usize) {
        self.with_write(|index| index.add(word, location, position));
    }

    fn add_all(&self, words: Vec<String>, location: &str, start: usize) {
        self.with_write(|index| index.add_all(words, location, start));
    }

    fn merge(&self, other: InvertedIndex) {
        self.with_write(|index| index.merge(other));
    }

    fn search(&self, queries: &BTreeSet<String>, partial: bool) -> Vec<SearchResult> {
        self.with_read(|index| index.search(queries, partial))
    }

    fn word_count(&self, location: &str) -> usize {
        self.with_read(|index| index.word_count(location))
    }

    fn num_words(&self) -> usize {
        self.with_read(InvertedIndex::num_words)
    }

    fn num_word_counts(&self) -> usize {
        self.with_read(InvertedIndex::num_word_counts)
    }
}

/// Single-threaded implementation: interior mutability without locking.
#[derive(Default)]
pub struct SerialIndex {
    inner: RefCell<InvertedIndex>,
}

impl SerialIndex {
    pub fn new() -> Self {
        SerialIndex {
            inner: RefCell::new(InvertedIndex::new()),
        }
    }

    pub fn into_inner(self) -> InvertedIndex {
        self.inner.into_inner()
    }
}

impl SearchIndex for SerialIndex {
    fn with_read<R>(&self, reader: impl FnOnce(&InvertedIndex) -> R) -> R {
        reader(&self.inner.borrow())
    }

    fn with_write<R>(&self, writer: impl FnOnce(&mut InvertedIndex) -> R) -> R {
        writer(&mut self.inner.borrow_mut())
    }
}

/// Thread-safe implementation: the same index behind the crate's
/// reader–writer lock. Composition keeps the locking at the boundary; the
/// inner index never knows it is shared.
pub struct SharedIndex {
    inner: ReadWriteLock<InvertedIndex>,
}

impl Default for SharedIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedIndex {
    pub fn new() -> Self {
        SharedIndex {
            inner: ReadWriteLock::new(InvertedIndex::new()),
        }
    }

    pub fn into_inner(self) -> InvertedIndex {
        self.inner.into_inner()
    }
}

impl SearchIndex for SharedIndex {
    fn with_read<R>(&self, reader: impl FnOnce(&InvertedIndex) -> R) -> R {
        reader(&self.inner.read())
    }

    fn with_write<R>(&self, writer: impl FnOnce(&mut InvertedIndex) -> R) -> R {
        writer(&mut self.inner.write())
    }
}
