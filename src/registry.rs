use crate::config::{ID_LENGTH, PROGRESS_INTERVAL, XML_ID};
use crate::error::Result;
use crate::parser::Document;
use crate::scan::CorpusScanner;
use anyhow::Context;
use indicatif::ProgressBar;
use quick_xml::events::Event;
use rustc_hash::FxHashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Every identifier in use anywhere in the corpus.
///
/// Built by a read-only pass over all roots before any document is stamped,
/// then grown by the stamper as identifiers are minted. Never shrinks.
#[derive(Debug, Default)]
pub struct IdentifierRegistry {
    ids: FxHashSet<String>,
}

impl IdentifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(roots: &[PathBuf]) -> Self {
        let mut registry = Self::new();
        let pb = ProgressBar::new_spinner();
        let mut documents = 0u64;

        for root in roots {
            info!(root = %root.display(), "Collecting identifiers");
            for path in CorpusScanner::new(root).files() {
                match registry.collect_file(&path) {
                    Ok(found) => debug!(path = %path.display(), found, "Collected identifiers"),
                    Err(e) => warn!(error = %e, "Skipping document while building registry"),
                }
                documents += 1;
                if documents % PROGRESS_INTERVAL == 0 {
                    pb.set_message(format!("{documents} documents, {} ids", registry.len()));
                    pb.tick();
                }
            }
        }

        pb.finish_and_clear();

        info!(
            documents,
            ids = registry.len(),
            "Identifier registry built"
        );

        registry
    }

    fn collect_file(&mut self, path: &Path) -> Result<usize> {
        let doc = Document::load(path)?;
        let ids = existing_ids(&doc)?;
        let found = ids.len();
        self.ids.extend(ids);
        Ok(found)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns `false` when the identifier was already registered.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        self.ids.insert(id.to_string())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Dumps the registry one identifier per line, sorted.
    pub fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        let mut ids: Vec<&String> = self.ids.iter().collect();
        ids.sort_unstable();

        let file = File::create(path)
            .with_context(|| format!("Failed to create registry dump: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        for id in ids {
            writeln!(writer, "{id}")?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Identifiers of the expected length on any element of the document.
pub fn existing_ids(doc: &Document) -> Result<Vec<String>> {
    let mut reader = doc.reader();
    let mut ids = Vec::new();

    loop {
        match doc.next_event(&mut reader)? {
            (_, Event::Start(e)) | (_, Event::Empty(e)) => {
                if let Some(id) = doc.attribute(&e, XML_ID)? {
                    if id.chars().count() == ID_LENGTH {
                        ids.push(id);
                    }
                }
            }
            (_, Event::Eof) => break,
            _ => {}
        }
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const DOC: &str = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <text xml:id="textabcdef">
    <p xml:id="short"><s xml:id="aaaaaaaaaa">One.</s><s>Two.</s></p>
    <note xml:id="bbbbbbbbbb"/>
  </text>
</TEI>"#;

    #[test]
    fn collects_ids_of_expected_length_from_any_element() {
        let doc = Document::from_source("a.xml", DOC);
        let ids = existing_ids(&doc).unwrap();
        assert_eq!(ids, vec!["textabcdef", "aaaaaaaaaa", "bbbbbbbbbb"]);
    }

    #[test]
    fn insert_reports_duplicates() {
        let mut registry = IdentifierRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.insert("aaaaaaaaaa"));
        assert!(!registry.insert("aaaaaaaaaa"));
        assert!(registry.contains("aaaaaaaaaa"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn build_unions_all_roots_and_skips_broken_documents() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(first.path().join("a.xml"), DOC).unwrap();
        fs::write(
            second.path().join("b.xml"),
            r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><s xml:id="cccccccccc">x</s></TEI>"#,
        )
        .unwrap();
        fs::write(second.path().join("broken.xml"), "<TEI><s></p></TEI>").unwrap();

        let registry = IdentifierRegistry::build(&[
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);

        assert_eq!(registry.len(), 4);
        for id in ["textabcdef", "aaaaaaaaaa", "bbbbbbbbbb", "cccccccccc"] {
            assert!(registry.contains(id), "missing {id}");
        }
    }

    #[test]
    fn write_to_dumps_sorted_ids() {
        let dir = TempDir::new().unwrap();
        let mut registry = IdentifierRegistry::new();
        registry.insert("bbbbbbbbbb");
        registry.insert("aaaaaaaaaa");

        let path = dir.path().join("used_ids.txt");
        registry.write_to(&path).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "aaaaaaaaaa\nbbbbbbbbbb\n"
        );
    }
}
