use std::path::PathBuf;

pub const DEFAULT_THREADS: usize = 5;
pub const DEFAULT_CRAWL_LIMIT: usize = 1;

pub const DEFAULT_INDEX_OUTPUT: &str = "index.json";
pub const DEFAULT_COUNTS_OUTPUT: &str = "counts.json";
pub const DEFAULT_RESULTS_OUTPUT: &str = "results.json";

/// Engine configuration assembled by the binary from command-line flags.
/// An absent ingest/query/output field skips that phase entirely.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// File or directory of `.txt`/`.text` documents to index.
    pub text_root: Option<PathBuf>,

    /// Seed URL for the crawler. Implies parallel mode.
    pub seed_url: Option<String>,

    /// Total number of pages the crawler may fetch.
    pub crawl_limit: usize,

    /// File of queries, one per line.
    pub query_path: Option<PathBuf>,

    /// Prefix matching instead of whole-stem matching.
    pub partial: bool,

    /// Worker pool size for parallel mode.
    pub threads: usize,

    /// Whether builders and the query engine run on the worker pool.
    pub parallel: bool,

    pub index_output: Option<PathBuf>,
    pub counts_output: Option<PathBuf>,
    pub results_output: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            text_root: None,
            seed_url: None,
            crawl_limit: DEFAULT_CRAWL_LIMIT, // one page unless asked for more
            query_path: None,
            partial: false,
            threads: DEFAULT_THREADS,
            parallel: false,
            index_output: None,
            counts_output: None,
            results_output: None,
        }
    }
}

impl EngineConfig {
    /// Clamp out-of-range values to their defaults. Zero threads and a zero
    /// crawl limit are configuration mistakes, not fatal errors.
    pub fn normalized(mut self) -> Self {
        if self.threads == 0 {
            self.threads = DEFAULT_THREADS;
        }
        if self.crawl_limit == 0 {
            self.crawl_limit = DEFAULT_CRAWL_LIMIT;
        }
        if self.seed_url.is_some() {
            self.parallel = true;
        }
        self
    }
}
