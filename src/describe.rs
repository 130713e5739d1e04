use crate::config::FAROESE_DIACRITICS;
use crate::models::DatasetLine;
use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Descriptive statistics over a sentence dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetStats {
    pub sentences: u64,
    pub tokens: u64,
    pub types: u64,
    pub avg_tokens: f64,
    pub median_tokens: f64,
    pub p5_tokens: f64,
    pub p95_tokens: f64,
    pub avg_chars: f64,
    pub unique_ratio: f64,
    pub diacritic_pct: f64,
}

/// Reads a dataset file line by line. A line without `text` fails the whole run.
pub fn describe(path: &Path) -> Result<DatasetStats> {
    let file =
        File::open(path).with_context(|| format!("Failed to open dataset: {}", path.display()))?;
    describe_reader(BufReader::new(file))
}

pub fn describe_reader(reader: impl BufRead) -> Result<DatasetStats> {
    let mut lengths = Vec::new();
    let mut tokens = 0u64;
    let mut chars = 0u64;
    let mut vocab = FxHashSet::default();
    let mut seen = FxHashSet::default();
    let mut duplicates = 0u64;
    let mut diacritic_lines = 0u64;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: DatasetLine = serde_json::from_str(&line)
            .with_context(|| format!("Invalid dataset line {}", line_no + 1))?;
        let text = entry.text;

        let count = text.split_whitespace().count();
        tokens += count as u64;
        lengths.push(count);
        chars += text.chars().count() as u64;
        vocab.extend(text.split_whitespace().map(str::to_lowercase));
        if text.chars().any(|c| FAROESE_DIACRITICS.contains(c)) {
            diacritic_lines += 1;
        }
        if !seen.insert(text) {
            duplicates += 1;
        }
    }

    let n = lengths.len() as u64;
    if n == 0 {
        return Ok(DatasetStats::default());
    }

    lengths.sort_unstable();
    let nf = n as f64;

    Ok(DatasetStats {
        sentences: n,
        tokens,
        types: vocab.len() as u64,
        avg_tokens: tokens as f64 / nf,
        median_tokens: percentile(&lengths, 0.5),
        p5_tokens: percentile(&lengths, 0.05),
        p95_tokens: percentile(&lengths, 0.95),
        avg_chars: chars as f64 / nf,
        unique_ratio: (1.0 - duplicates as f64 / nf) * 100.0,
        diacritic_pct: diacritic_lines as f64 / nf * 100.0,
    })
}

/// Linear interpolation between closest ranks of a sorted slice.
pub fn percentile(sorted: &[usize], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let k = (sorted.len() - 1) as f64 * p;
    let (i, j) = (k.floor() as usize, k.ceil() as usize);
    let lo = sorted[i] as f64;
    if i == j {
        return lo;
    }
    lo + (sorted[j] as f64 - lo) * (k - i as f64)
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

impl DatasetStats {
    pub fn to_markdown(&self) -> String {
        format!(
            "| Metric | Value |\n\
             |---|---|\n\
             | Sentences | {} |\n\
             | Tokens (space-split) | {} |\n\
             | Types (unique tokens, case-folded) | {} |\n\
             | Avg. sentence length (tokens) | {:.2} |\n\
             | Median sentence length (tokens) | {:.0} |\n\
             | 5-95% sentence length (tokens) | {}-{} |\n\
             | Avg. sentence length (characters) | {:.1} |\n\
             | Unique sentence ratio | {:.2}% |\n\
             | Sentences with Faroese diacritics | {:.2}% |\n",
            group_thousands(self.sentences),
            group_thousands(self.tokens),
            group_thousands(self.types),
            self.avg_tokens,
            self.median_tokens,
            self.p5_tokens.trunc() as u64,
            self.p95_tokens.trunc() as u64,
            self.avg_chars,
            self.unique_ratio,
            self.diacritic_pct,
        )
    }
}
