use crate::extract::{extract_sentences, ExtractOptions};
use crate::models::CorpusRecord;
use crate::parser::Document;
use crate::rewrite;
use crate::scan::CorpusScanner;
use crate::stats::RunStats;
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use rustc_hash::FxHashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extracts every identified sentence under the roots, in root order and
/// then file-name order within each root.
pub fn collect_records(
    roots: &[PathBuf],
    options: &ExtractOptions,
    stats: &RunStats,
) -> Vec<CorpusRecord> {
    let mut records = Vec::new();
    let pb = ProgressBar::new_spinner();

    for root in roots {
        info!(root = %root.display(), "Extracting sentences");
        for path in CorpusScanner::new(root).sorted(true).files() {
            stats.inc_scanned();

            let extraction = match Document::load(&path).and_then(|doc| extract_sentences(&doc, options)) {
                Ok(extraction) => extraction,
                Err(e) => {
                    warn!(error = %e, "Skipping document");
                    stats.inc_skipped();
                    continue;
                }
            };

            if extraction.year.is_none() {
                debug!(path = %path.display(), "No source date");
                stats.inc_undated();
            }
            stats.add_extracted(extraction.records.len() as u64);
            stats.add_excluded(extraction.excluded as u64);
            records.extend(extraction.records);

            pb.set_message(format!("{} sentences", records.len()));
            pb.tick();
        }
    }

    pb.finish_and_clear();
    records
}

/// Sorts by lowercase text and keeps the first record of every distinct text.
///
/// The sort is stable, so among equal texts the first one collected wins and
/// the years of the later duplicates are dropped.
pub fn canonicalize(mut records: Vec<CorpusRecord>) -> (Vec<CorpusRecord>, usize) {
    records.sort_by_cached_key(|r| r.text.to_lowercase());

    let total = records.len();
    let mut seen = FxHashSet::default();
    records.retain(|r| seen.insert(r.text.clone()));

    let dropped = total - records.len();
    (records, dropped)
}

/// Writes one JSON object per line, replacing the file atomically.
pub fn write_jsonl(records: &[CorpusRecord], path: &Path) -> Result<()> {
    let mut buf = Vec::with_capacity(records.len() * 96);
    for record in records {
        serde_json::to_writer(&mut buf, record).context("Failed to serialize record")?;
        buf.write_all(b"\n")?;
    }

    rewrite::write_atomic(path, &buf)
        .with_context(|| format!("Failed to write dataset: {}", path.display()))
}

/// Builds the canonical dataset from all roots and persists it.
pub fn run_export(
    roots: &[PathBuf],
    output: &Path,
    options: &ExtractOptions,
    stats: &RunStats,
) -> Result<Vec<CorpusRecord>> {
    let records = collect_records(roots, options, stats);
    let (records, dropped) = canonicalize(records);
    stats.add_duplicates(dropped as u64);

    write_jsonl(&records, output)?;
    stats.add_written(records.len() as u64);

    info!(
        path = %output.display(),
        records = records.len(),
        duplicates = dropped,
        "Dataset written"
    );

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn rec(id: &str, text: &str, year: Option<i32>) -> CorpusRecord {
        CorpusRecord::new(id, text, year)
    }

    #[test]
    fn sorts_case_insensitively() {
        let (records, dropped) = canonicalize(vec![
            rec("aaaaaaaaaa", "banana", None),
            rec("bbbbbbbbbb", "Apple", None),
            rec("cccccccccc", "cherry", None),
        ]);
        let texts: Vec<_> = records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["Apple", "banana", "cherry"]);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn keeps_first_collected_duplicate() {
        let (records, dropped) = canonicalize(vec![
            rec("aaaaaaaaaa", "Same text", Some(2019)),
            rec("bbbbbbbbbb", "Other", Some(2020)),
            rec("cccccccccc", "Same text", Some(2021)),
            rec("dddddddddd", "Same text", Some(2018)),
        ]);
        assert_eq!(dropped, 2);
        assert_eq!(
            records,
            vec![
                rec("bbbbbbbbbb", "Other", Some(2020)),
                rec("aaaaaaaaaa", "Same text", Some(2019)),
            ]
        );
    }

    #[test]
    fn case_variants_are_distinct_texts() {
        let (records, dropped) = canonicalize(vec![
            rec("aaaaaaaaaa", "hello", None),
            rec("bbbbbbbbbb", "Hello", None),
            rec("cccccccccc", "hello", None),
        ]);
        assert_eq!(dropped, 1);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["aaaaaaaaaa", "bbbbbbbbbb"]);
    }

    #[test]
    fn write_jsonl_one_object_per_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sentences.jsonl");
        fs::write(&path, "stale\n").unwrap();

        write_jsonl(
            &[rec("aaaaaaaaaa", "Bye", Some(2021)), rec("bbbbbbbbbb", "Hví ikki", None)],
            &path,
        )
        .unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "{\"id\":\"aaaaaaaaaa\",\"text\":\"Bye\",\"year\":2021}\n\
             {\"id\":\"bbbbbbbbbb\",\"text\":\"Hví ikki\",\"year\":null}\n"
        );
    }

    #[test]
    fn write_failure_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("sentences.jsonl");
        assert!(write_jsonl(&[], &path).is_err());
    }
}
