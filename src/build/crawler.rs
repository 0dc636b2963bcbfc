use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use url::Url;

use crate::analysis::normalizer::TextNormalizer;
use crate::build::fetch::Fetch;
use crate::core::error::Result;
use crate::html::{links, sanitizer};
use crate::index::inverted::InvertedIndex;
use crate::index::shared::SearchIndex;
use crate::sync::worker_pool::WorkerPool;

/// Redirect hops followed after the initial request.
const MAX_REDIRECTS: usize = 3;

/// URLs already scheduled plus the enqueue budget, updated together under one
/// lock. Budgeting on enqueue rather than completion makes the crawl
/// deterministic: once a link is admitted nothing can take its slot back.
struct Frontier {
    visited: HashSet<String>,
    remaining: usize,
}

impl Frontier {
    /// Admit `link` if it is new and the budget allows another page beyond
    /// those already scheduled.
    fn admit(&mut self, link: &Url) -> bool {
        if self.remaining > 1 && !self.visited.contains(link.as_str()) {
            self.visited.insert(link.as_str().to_string());
            self.remaining -= 1;
            return true;
        }
        false
    }
}

/// Bounded breadth-first crawler feeding the shared index. Pages are fetched
/// on pool workers; each page becomes a private index merged in one write,
/// exactly like the file builder.
pub struct WebCrawler<I, F> {
    inner: Arc<CrawlerInner<I, F>>,
}

struct CrawlerInner<I, F> {
    index: Arc<I>,
    pool: Arc<WorkerPool>,
    fetcher: F,
    normalizer: TextNormalizer,
    frontier: Mutex<Frontier>,
}

impl<I, F> WebCrawler<I, F>
where
    I: SearchIndex + Send + Sync + 'static,
    F: Fetch + 'static,
{
    /// `limit` is the total number of pages this crawler may fetch,
    /// including the seed.
    pub fn new(index: Arc<I>, pool: Arc<WorkerPool>, fetcher: F, limit: usize) -> Self {
        WebCrawler {
            inner: Arc::new(CrawlerInner {
                index,
                pool,
                fetcher,
                normalizer: TextNormalizer::new(),
                frontier: Mutex::new(Frontier {
                    visited: HashSet::new(),
                    remaining: limit.max(1),
                }),
            }),
        }
    }

    /// Crawl from `seed` until the page budget is spent, then drain the pool.
    pub fn crawl(&self, seed: &str) -> Result<()> {
        let seed = links::normalize(seed)?;

        self.inner
            .frontier
            .lock()
            .visited
            .insert(seed.as_str().to_string());

        let inner = Arc::clone(&self.inner);
        self.inner
            .pool
            .submit(move || CrawlerInner::crawl_page(inner, seed));
        self.inner.pool.barrier();

        Ok(())
    }

    /// Every URL that was scheduled, sorted. Scheduled and fetched coincide
    /// once `crawl` returns.
    pub fn visited(&self) -> Vec<String> {
        let frontier = self.inner.frontier.lock();
        let mut visited: Vec<String> = frontier.visited.iter().cloned().collect();
        visited.sort();
        visited
    }
}

impl<I, F> CrawlerInner<I, F>
where
    I: SearchIndex + Send + Sync + 'static,
    F: Fetch + 'static,
{
    /// One crawl task: fetch, index under the requested URL, follow links.
    /// Relative links resolve against the URL the body was actually served
    /// from, which differs from the requested one after a redirect.
    fn crawl_page(inner: Arc<Self>, url: Url) {
        let Some((html, base)) = inner.fetch_html(&url) else {
            return;
        };

        let text = sanitizer::sanitize(&html);
        let mut private = InvertedIndex::new();
        private.add_all(inner.normalizer.token_list(&text), url.as_str(), 1);
        inner.index.merge(private);
        tracing::debug!(url = url.as_str(), "indexed page");

        for link in links::extract_links(&base, &html) {
            if inner.frontier.lock().admit(&link) {
                let next = Arc::clone(&inner);
                inner.pool.submit(move || Self::crawl_page(next, link));
            }
        }
    }

    /// Fetch `url`, following at most [`MAX_REDIRECTS`] `Location` hops, and
    /// return the body together with the URL it was served from. Anything
    /// that is not eventually an HTML `200` is treated as an empty page:
    /// logged, no content, no links.
    fn fetch_html(&self, url: &Url) -> Option<(String, Url)> {
        let mut current = url.clone();

        for _ in 0..=MAX_REDIRECTS {
            let response = match self.fetcher.fetch(&current) {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(url = current.as_str(), "fetch failed: {err}");
                    return None;
                }
            };

            if response.is_redirect() {
                let target = response
                    .header("location")
                    .and_then(|location| current.join(location).ok());
                match target {
                    Some(mut next) => {
                        next.set_fragment(None);
                        current = next;
                        continue;
                    }
                    None => {
                        tracing::warn!(url = current.as_str(), "redirect without usable location");
                        return None;
                    }
                }
            }

            if !response.is_indexable() {
                tracing::debug!(
                    url = current.as_str(),
                    status = response.status,
                    "not an html page; skipping"
                );
                return None;
            }

            return match String::from_utf8(response.body) {
                Ok(html) => Some((html, current)),
                Err(err) => {
                    tracing::warn!(url = current.as_str(), "undecodable body: {err}");
                    None
                }
            };
        }

        tracing::warn!(url = url.as_str(), "too many redirects");
        None
    }
}
