pub mod analysis;
pub mod build;
pub mod core;
pub mod html;
pub mod index;
pub mod output;
pub mod query;
pub mod sync;

/*
┌──────────────────────────────── QUARRY ARCHITECTURE ────────────────────────────────┐
│                                                                                      │
│  analysis::TextNormalizer      text → NFD → ascii letters → lowercase → stems        │
│  html::sanitizer / links       page → plain text; page → resolved http(s) links      │
│                                                                                      │
│  sync::ReadWriteLock<T>        many readers xor one writer, writers preferred        │
│  sync::WorkerPool              submit / barrier / shutdown / join, panic-isolated    │
│                                                                                      │
│  index::InvertedIndex          word → location → positions, location → word count    │
│  index::SearchIndex (trait)    one scoped acquisition per public operation           │
│      ├── SerialIndex           RefCell, single thread                                │
│      └── SharedIndex           ReadWriteLock, any thread                             │
│                                                                                      │
│  build::FileIndexer            walk → read → add_all (serial)                        │
│  build::ParallelFileIndexer    walk → task per file → private index → one merge      │
│  build::WebCrawler             frontier(visited, remaining) → fetch → sanitize →     │
│                                private index → one merge → follow links              │
│                                                                                      │
│  query::QueryEngine            line → sorted stems → canonical key → ranked results  │
│  output::json                  two-space pretty emitters, eight-digit scores         │
│                                                                                      │
│  Lock order when nested:  worker queue < frontier / results map < index              │
└──────────────────────────────────────────────────────────────────────────────────────┘
*/
