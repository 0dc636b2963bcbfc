use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use quarry::build::crawler::WebCrawler;
use quarry::build::fetch::HttpFetcher;
use quarry::build::file_indexer::{FileIndexer, ParallelFileIndexer};
use quarry::core::config::{self, EngineConfig};
use quarry::core::error::Result;
use quarry::index::shared::{SearchIndex, SerialIndex, SharedIndex};
use quarry::output::json;
use quarry::query::engine::{ParallelQueryEngine, QueryEngine};
use quarry::sync::worker_pool::WorkerPool;

/// Index local text files or crawled web pages into an in-memory inverted
/// index and answer ranked queries against it.
#[derive(Parser, Debug)]
#[command(name = "quarry", version)]
struct Cli {
    /// File or directory of .txt/.text documents to index
    #[arg(long, value_name = "PATH")]
    text: Option<PathBuf>,

    /// Seed URL to crawl; implies parallel mode
    #[arg(long, value_name = "URL")]
    html: Option<String>,

    /// Total number of pages the crawler may fetch
    #[arg(long, value_name = "N", default_value_t = config::DEFAULT_CRAWL_LIMIT)]
    crawl: usize,

    /// Query file, one query per line
    #[arg(long, value_name = "PATH")]
    query: Option<PathBuf>,

    /// Match dictionary words by prefix instead of exactly
    #[arg(long)]
    partial: bool,

    /// Worker pool size; enables parallel mode [default: 5]
    #[arg(long, value_name = "N")]
    threads: Option<String>,

    /// Write the inverted index as JSON [default path: index.json]
    #[arg(long, value_name = "PATH", num_args = 0..=1,
          default_missing_value = config::DEFAULT_INDEX_OUTPUT)]
    index: Option<PathBuf>,

    /// Write per-document word counts as JSON [default path: counts.json]
    #[arg(long, value_name = "PATH", num_args = 0..=1,
          default_missing_value = config::DEFAULT_COUNTS_OUTPUT)]
    counts: Option<PathBuf>,

    /// Write search results as JSON [default path: results.json]
    #[arg(long, value_name = "PATH", num_args = 0..=1,
          default_missing_value = config::DEFAULT_RESULTS_OUTPUT)]
    results: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> EngineConfig {
        // a broken --threads value is a configuration mistake, not a reason
        // to abort the run
        let threads = match self.threads.as_deref() {
            None => config::DEFAULT_THREADS,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n > 0 => n as usize,
                _ => {
                    tracing::warn!("unusable --threads value {raw:?}; using default");
                    config::DEFAULT_THREADS
                }
            },
        };
        let parallel = self.threads.is_some() || self.html.is_some();

        EngineConfig {
            text_root: self.text,
            seed_url: self.html,
            crawl_limit: self.crawl,
            query_path: self.query,
            partial: self.partial,
            threads,
            parallel,
            index_output: self.index,
            counts_output: self.counts,
            results_output: self.results,
        }
        .normalized()
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Cli::parse().into_config();
    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("quarry: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Ingest is best-effort per item; only the output phase can fail the run.
fn run(config: &EngineConfig) -> Result<()> {
    if config.parallel {
        run_parallel(config)
    } else {
        run_serial(config)
    }
}

fn run_serial(config: &EngineConfig) -> Result<()> {
    let index = SerialIndex::new();

    if let Some(root) = &config.text_root {
        FileIndexer::new(&index).build(root);
        tracing::info!(documents = index.num_word_counts(), "text ingest finished");
    }

    let mut engine = QueryEngine::new(&index, config.partial);
    if let Some(path) = &config.query_path {
        match engine.process_file(path) {
            Ok(()) => tracing::info!(queries = engine.queries().count(), "queries finished"),
            Err(err) => tracing::warn!("query file skipped: {err}"),
        }
    }

    write_index_outputs(&index, config)?;
    if let Some(path) = &config.results_output {
        engine.write(path)?;
    }
    Ok(())
}

fn run_parallel(config: &EngineConfig) -> Result<()> {
    let index = Arc::new(SharedIndex::new());
    let pool = Arc::new(WorkerPool::new(config.threads));

    if let Some(root) = &config.text_root {
        ParallelFileIndexer::new(Arc::clone(&index), Arc::clone(&pool)).build(root);
        tracing::info!(documents = index.num_word_counts(), "text ingest finished");
    }

    if let Some(seed) = &config.seed_url {
        match HttpFetcher::new() {
            Ok(fetcher) => {
                let crawler = WebCrawler::new(
                    Arc::clone(&index),
                    Arc::clone(&pool),
                    fetcher,
                    config.crawl_limit,
                );
                match crawler.crawl(seed) {
                    Ok(()) => tracing::info!(pages = crawler.visited().len(), "crawl finished"),
                    Err(err) => tracing::warn!("crawl skipped: {err}"),
                }
            }
            Err(err) => tracing::warn!("crawl skipped, no http client: {err}"),
        }
    }

    let engine = ParallelQueryEngine::new(Arc::clone(&index), Arc::clone(&pool), config.partial);
    if let Some(path) = &config.query_path {
        match engine.process_file(path) {
            Ok(()) => tracing::info!(queries = engine.queries().len(), "queries finished"),
            Err(err) => tracing::warn!("query file skipped: {err}"),
        }
    }

    pool.join();

    write_index_outputs(&*index, config)?;
    if let Some(path) = &config.results_output {
        engine.write(path)?;
    }
    Ok(())
}

fn write_index_outputs(index: &impl SearchIndex, config: &EngineConfig) -> Result<()> {
    if let Some(path) = &config.index_output {
        index.with_read(|inner| json::write_index(inner, path))?;
    }
    if let Some(path) = &config.counts_output {
        index.with_read(|inner| json::write_counts(inner, path))?;
    }
    Ok(())
}
