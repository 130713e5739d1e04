use crate::config::DOCUMENT_EXTENSION;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Walks a corpus root and yields the document files beneath it.
///
/// Every call to [`CorpusScanner::files`] starts a fresh walk. Symbolic links
/// are followed; link loops are reported and skipped. Traversal order is
/// whatever the filesystem returns unless [`CorpusScanner::sorted`] is set.
#[derive(Debug, Clone)]
pub struct CorpusScanner {
    root: PathBuf,
    sorted: bool,
}

impl CorpusScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sorted: false,
        }
    }

    /// Visit directory entries in file-name order.
    pub fn sorted(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> impl Iterator<Item = PathBuf> {
        let mut walker = WalkDir::new(&self.root).follow_links(true);
        if self.sorted {
            walker = walker.sort_by_file_name();
        }

        walker
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && is_document(entry.path()))
            .map(|entry| entry.into_path())
    }
}

/// Extension check that behaves the same on case-sensitive and
/// case-insensitive filesystems.
pub fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(DOCUMENT_EXTENSION))
}
