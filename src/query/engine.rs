use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::analysis::normalizer::TextNormalizer;
use crate::core::error::Result;
use crate::index::results::SearchResult;
use crate::index::shared::SearchIndex;
use crate::output::json;
use crate::sync::worker_pool::WorkerPool;

pub type ResultMap = BTreeMap<String, Vec<SearchResult>>;

/// A query line reduced to its sorted, deduplicated stems. Reordered or
/// repeated words collapse to the same canonical string, which is the key
/// results are stored under.
fn canonicalize(stems: &BTreeSet<String>) -> String {
    stems
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Serial query engine: one line at a time against the index.
pub struct QueryEngine<'a, I: SearchIndex> {
    index: &'a I,
    normalizer: TextNormalizer,
    partial: bool,
    results: ResultMap,
}

impl<'a, I: SearchIndex> QueryEngine<'a, I> {
    pub fn new(index: &'a I, partial: bool) -> Self {
        QueryEngine {
            index,
            normalizer: TextNormalizer::new(),
            partial,
            results: ResultMap::new(),
        }
    }

    /// Search one query line. Empty lines and lines whose canonical form was
    /// already answered are no-ops.
    pub fn process_line(&mut self, line: &str) {
        let stems = self.normalizer.unique_stems(line);
        if stems.is_empty() {
            return;
        }

        let key = canonicalize(&stems);
        if self.results.contains_key(&key) {
            return;
        }

        let found = self.index.search(&stems, self.partial);
        self.results.insert(key, found);
    }

    /// Run every line of a query file. A line that cannot be read is logged
    /// and skipped; the remaining lines still run.
    pub fn process_file(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path)?;
        for line in BufReader::new(file).lines() {
            match line {
                Ok(line) => self.process_line(&line),
                Err(err) => tracing::warn!("skipping unreadable query line: {err}"),
            }
        }
        Ok(())
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        json::write_results(&self.results, path)
    }

    /// Results for a query line, if its canonical form has been searched.
    pub fn view(&self, line: &str) -> Option<&[SearchResult]> {
        let key = canonicalize(&self.normalizer.unique_stems(line));
        self.results.get(&key).map(Vec::as_slice)
    }

    pub fn queries(&self) -> impl Iterator<Item = &str> {
        self.results.keys().map(String::as_str)
    }

    pub fn results(&self) -> &ResultMap {
        &self.results
    }
}

/// Parallel query engine: every line becomes one pool task. The results map
/// sits behind a plain mutex held only for lookups and inserts; the index
/// search itself runs outside it, under the index's own read capability.
pub struct ParallelQueryEngine<I> {
    index: Arc<I>,
    pool: Arc<WorkerPool>,
    normalizer: Arc<TextNormalizer>,
    partial: bool,
    results: Arc<Mutex<ResultMap>>,
}

impl<I: SearchIndex + Send + Sync + 'static> ParallelQueryEngine<I> {
    pub fn new(index: Arc<I>, pool: Arc<WorkerPool>, partial: bool) -> Self {
        ParallelQueryEngine {
            index,
            pool,
            normalizer: Arc::new(TextNormalizer::new()),
            partial,
            results: Arc::new(Mutex::new(ResultMap::new())),
        }
    }

    pub fn process_line(&self, line: &str) {
        search_line(
            &*self.index,
            &self.normalizer,
            self.partial,
            &self.results,
            line,
        );
    }

    /// Read the file on the caller, submit one task per line, and wait for
    /// the batch to drain. Unreadable lines are logged and skipped.
    pub fn process_file(&self, path: &Path) -> Result<()> {
        let file = File::open(path)?;
        for line in BufReader::new(file).lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    tracing::warn!("skipping unreadable query line: {err}");
                    continue;
                }
            };
            let index = Arc::clone(&self.index);
            let normalizer = Arc::clone(&self.normalizer);
            let results = Arc::clone(&self.results);
            let partial = self.partial;
            self.pool
                .submit(move || search_line(&*index, &normalizer, partial, &results, &line));
        }

        self.pool.barrier();
        Ok(())
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        json::write_results(&self.results.lock(), path)
    }

    pub fn view(&self, line: &str) -> Option<Vec<SearchResult>> {
        let key = canonicalize(&self.normalizer.unique_stems(line));
        self.results.lock().get(&key).cloned()
    }

    pub fn queries(&self) -> Vec<String> {
        self.results.lock().keys().cloned().collect()
    }
}

fn search_line<I: SearchIndex>(
    index: &I,
    normalizer: &TextNormalizer,
    partial: bool,
    results: &Mutex<ResultMap>,
    line: &str,
) {
    let stems = normalizer.unique_stems(line);
    if stems.is_empty() {
        return;
    }

    let key = canonicalize(&stems);
    if results.lock().contains_key(&key) {
        return;
    }

    let found = index.search(&stems, partial);

    // two tasks may race on the same fresh key; the first insert wins and
    // both computed the same answer
    results.lock().entry(key).or_insert(found);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::shared::{SerialIndex, SharedIndex};
    use std::fs;
    use std::io::Write;

    fn seeded_serial() -> SerialIndex {
        let index = SerialIndex::new();
        index.add_all(
            vec!["foo".into(), "bar".into(), "foo".into()],
            "a.txt",
            1,
        );
        index.add_all(vec!["food".into()], "b.txt", 1);
        index
    }

    #[test]
    fn reordered_queries_share_one_canonical_key() {
        let index = seeded_serial();
        let mut engine = QueryEngine::new(&index, false);

        engine.process_line("foo bar");
        engine.process_line("bar foo");
        engine.process_line("BAR   foo!");

        let keys: Vec<&str> = engine.queries().collect();
        assert_eq!(keys, vec!["bar foo"]);
        assert_eq!(engine.view("foo bar").unwrap().len(), 1);
    }

    #[test]
    fn empty_lines_are_ignored() {
        let index = seeded_serial();
        let mut engine = QueryEngine::new(&index, false);

        engine.process_line("");
        engine.process_line("   \t ");
        engine.process_line("123 !!");

        assert_eq!(engine.queries().count(), 0);
    }

    #[test]
    fn unmatched_queries_keep_an_empty_result_list() {
        let index = seeded_serial();
        let mut engine = QueryEngine::new(&index, false);

        engine.process_line("missing");
        assert_eq!(engine.view("missing").unwrap().len(), 0);
    }

    #[test]
    fn partial_flag_widens_matches() {
        let index = seeded_serial();

        let mut exact = QueryEngine::new(&index, false);
        exact.process_line("foo");
        assert_eq!(exact.view("foo").unwrap().len(), 1);

        let mut partial = QueryEngine::new(&index, true);
        partial.process_line("foo");
        assert_eq!(partial.view("foo").unwrap().len(), 2);
    }

    #[test]
    fn exact_and_partial_scores_for_inflected_terms() {
        // document "run running runner" stems to run, run, runner
        let index = SerialIndex::new();
        index.add_all(
            TextNormalizer::new().token_list("run running runner"),
            "a.txt",
            1,
        );

        let mut exact = QueryEngine::new(&index, false);
        exact.process_line("run");
        let results = exact.view("run").unwrap();
        assert_eq!(results[0].count, 2);
        assert!((results[0].score - 2.0 / 3.0).abs() < 1e-12);

        let mut partial = QueryEngine::new(&index, true);
        partial.process_line("run");
        let results = partial.view("run").unwrap();
        assert_eq!(results[0].count, 3);
        assert!((results[0].score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn process_file_reads_one_query_per_line() {
        let index = seeded_serial();
        let mut engine = QueryEngine::new(&index, false);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "foo bar").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "bar foo").unwrap();
        writeln!(file, "food").unwrap();
        file.flush().unwrap();

        engine.process_file(file.path()).unwrap();
        let keys: Vec<&str> = engine.queries().collect();
        assert_eq!(keys, vec!["bar foo", "food"]);
    }

    #[test]
    fn bad_lines_do_not_abort_the_query_file() {
        let index = seeded_serial();
        let mut engine = QueryEngine::new(&index, false);

        // the middle line is not UTF-8; the lines around it must still run
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queries.txt");
        fs::write(&path, [b"foo\n".as_slice(), &[0xff, 0xfe], b"\nfood\n"].concat()).unwrap();

        engine.process_file(&path).unwrap();
        let keys: Vec<&str> = engine.queries().collect();
        assert_eq!(keys, vec!["foo", "food"]);
    }

    #[test]
    fn parallel_engine_matches_serial_results() {
        let shared = Arc::new(SharedIndex::new());
        shared.add_all(
            vec!["foo".into(), "bar".into(), "foo".into()],
            "a.txt",
            1,
        );
        shared.add_all(vec!["food".into()], "b.txt", 1);

        let dir = tempfile::tempdir().unwrap();
        let queries_path = dir.path().join("queries.txt");
        fs::write(&queries_path, "foo bar\nbar foo\nfood\n\nfoo\n").unwrap();

        let serial_index = seeded_serial();
        let mut serial = QueryEngine::new(&serial_index, true);
        serial.process_file(&queries_path).unwrap();

        let pool = Arc::new(WorkerPool::new(4));
        let parallel = ParallelQueryEngine::new(Arc::clone(&shared), Arc::clone(&pool), true);
        parallel.process_file(&queries_path).unwrap();
        pool.join();

        let mut parallel_keys = parallel.queries();
        parallel_keys.sort();
        let serial_keys: Vec<String> = serial.queries().map(str::to_string).collect();
        assert_eq!(parallel_keys, serial_keys);

        for key in &serial_keys {
            let left = serial.view(key).unwrap().to_vec();
            let right = parallel.view(key).unwrap();
            assert_eq!(left.len(), right.len());
            for (a, b) in left.iter().zip(right.iter()) {
                assert_eq!(a.location, b.location);
                assert_eq!(a.count, b.count);
            }
        }
    }
}
