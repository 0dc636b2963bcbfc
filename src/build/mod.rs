pub mod crawler;
pub mod fetch;
pub mod file_indexer;
