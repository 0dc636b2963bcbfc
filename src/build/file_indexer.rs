use std::fs;
use std::path::Path;
use std::sync::Arc;

use walkdir::WalkDir;

use crate::analysis::normalizer::TextNormalizer;
use crate::index::inverted::InvertedIndex;
use crate::index::shared::SearchIndex;
use crate::sync::worker_pool::WorkerPool;

/// Serial builder: walks the root and feeds each text file straight into the
/// index, positions numbered from 1 per document.
pub struct FileIndexer<'a, I: SearchIndex> {
    index: &'a I,
    normalizer: TextNormalizer,
}

impl<'a, I: SearchIndex> FileIndexer<'a, I> {
    pub fn new(index: &'a I) -> Self {
        FileIndexer {
            index,
            normalizer: TextNormalizer::new(),
        }
    }

    pub fn build(&self, root: &Path) {
        if root.is_dir() {
            for path in text_files(root) {
                if let Some(text) = read_document(&path) {
                    let words = self.normalizer.token_list(&text);
                    self.index.add_all(words, &path.display().to_string(), 1);
                }
            }
        } else if let Some(text) = read_document(root) {
            // an explicit file root is indexed regardless of its extension
            let words = self.normalizer.token_list(&text);
            self.index.add_all(words, &root.display().to_string(), 1);
        }
    }
}

/// Parallel builder: the traversal stays on the caller, every file becomes
/// one pool task that assembles a private index and merges it in a single
/// write acquisition.
pub struct ParallelFileIndexer<I> {
    index: Arc<I>,
    pool: Arc<WorkerPool>,
    normalizer: Arc<TextNormalizer>,
}

impl<I: SearchIndex + Send + Sync + 'static> ParallelFileIndexer<I> {
    pub fn new(index: Arc<I>, pool: Arc<WorkerPool>) -> Self {
        ParallelFileIndexer {
            index,
            pool,
            normalizer: Arc::new(TextNormalizer::new()),
        }
    }

    pub fn build(&self, root: &Path) {
        if root.is_dir() {
            for path in text_files(root) {
                let index = Arc::clone(&self.index);
                let normalizer = Arc::clone(&self.normalizer);
                self.pool.submit(move || index_privately(&*index, &normalizer, &path));
            }
        } else {
            let index = Arc::clone(&self.index);
            let normalizer = Arc::clone(&self.normalizer);
            let path = root.to_path_buf();
            self.pool.submit(move || index_privately(&*index, &normalizer, &path));
        }

        self.pool.barrier();
    }
}

/// One worker task: document → private index → one merge.
fn index_privately<I: SearchIndex>(index: &I, normalizer: &TextNormalizer, path: &Path) {
    let Some(text) = read_document(path) else {
        return;
    };

    let location = path.display().to_string();
    let mut private = InvertedIndex::new();
    private.add_all(normalizer.token_list(&text), &location, 1);
    index.merge(private);

    tracing::debug!(location = %location, "indexed file");
}

/// Depth-first traversal yielding regular files named `*.txt` or `*.text`,
/// following directory symlinks. Broken entries are logged and skipped.
fn text_files(root: &Path) -> impl Iterator<Item = std::path::PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() && is_text_file(entry.path()) => {
                Some(entry.into_path())
            }
            Ok(_) => None,
            Err(err) => {
                tracing::warn!("skipping unreadable entry: {err}");
                None
            }
        })
}

fn is_text_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_lowercase)
        .is_some_and(|name| name.ends_with(".txt") || name.ends_with(".text"))
}

fn read_document(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(err) => {
            tracing::warn!("skipping {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::shared::{SerialIndex, SharedIndex};
    use std::fs::File;
    use std::io::Write;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        fs::write(dir.path().join("a.txt"), "Hello HELLO world.").unwrap();
        fs::write(dir.path().join("sub/b.TEXT"), "apple banana").unwrap();
        fs::write(dir.path().join("notes.md"), "ignored words").unwrap();
        dir
    }

    #[test]
    fn serial_build_indexes_txt_and_text_files_only() {
        let dir = fixture();
        let index = SerialIndex::new();
        FileIndexer::new(&index).build(dir.path());

        let index = index.into_inner();
        assert_eq!(index.num_word_counts(), 2);
        assert!(index.contains("hello"));
        assert!(index.contains("banana"));
        assert!(!index.contains("ignor"));

        let a = dir.path().join("a.txt").display().to_string();
        assert_eq!(index.word_count(&a), 3);
        assert_eq!(index.positions("hello", &a).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn explicit_file_root_skips_the_extension_filter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readme.md");
        fs::write(&path, "direct file").unwrap();

        let index = SerialIndex::new();
        FileIndexer::new(&index).build(&path);

        assert_eq!(index.into_inner().word_count(&path.display().to_string()), 2);
    }

    #[test]
    fn undecodable_files_are_skipped_not_fatal() {
        let dir = fixture();
        let mut bad = File::create(dir.path().join("bad.txt")).unwrap();
        bad.write_all(&[0xff, 0xfe, 0x80]).unwrap();

        let index = SerialIndex::new();
        FileIndexer::new(&index).build(dir.path());

        // the two good documents still arrive
        assert_eq!(index.into_inner().num_word_counts(), 2);
    }

    #[test]
    fn parallel_build_matches_serial_build() {
        let dir = fixture();
        for extra in 0..20 {
            fs::write(
                dir.path().join(format!("doc{extra}.txt")),
                format!("shared words document number {extra}"),
            )
            .unwrap();
        }

        let serial = SerialIndex::new();
        FileIndexer::new(&serial).build(dir.path());

        let shared = Arc::new(SharedIndex::new());
        let pool = Arc::new(WorkerPool::new(4));
        ParallelFileIndexer::new(Arc::clone(&shared), Arc::clone(&pool)).build(dir.path());
        pool.join();

        let serial = serial.into_inner();
        let parallel = Arc::try_unwrap(shared).ok().unwrap().into_inner();
        assert_eq!(serial.postings(), parallel.postings());
        assert_eq!(serial.word_counts(), parallel.word_counts());
    }
}
