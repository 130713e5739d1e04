use crate::config::{
    COVERAGE_JSON_FILE, COVERAGE_MARKDOWN_FILE, QUESTION_NUMBER_PATTERN,
    SECTION_52A_QUESTION_TOTALS,
};
use crate::describe::group_thousands;
use crate::scan::is_document;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

static QUESTION_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(QUESTION_NUMBER_PATTERN).unwrap());

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearCoverage {
    pub year: u32,
    pub collected: u32,
    pub official: u32,
    pub coverage_pct: f64,
    pub missing: u32,
    /// Inclusive ranges of question numbers with no file
    pub gaps: Vec<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageTotals {
    pub collected: u32,
    pub official: u32,
    pub coverage_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub by_year: Vec<YearCoverage>,
    pub totals: CoverageTotals,
}

/// Sequential question number from a file name like `52-118-2.xml`.
pub fn question_number(file_name: &str) -> Option<u32> {
    QUESTION_NUMBER
        .captures(file_name)
        .and_then(|c| c[1].parse().ok())
}

/// Document files directly inside a year directory, sorted.
fn year_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && is_document(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Inclusive ranges missing between consecutive numbers.
pub fn find_gaps(numbers: &[u32]) -> Vec<(u32, u32)> {
    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    sorted
        .windows(2)
        .filter(|w| w[1] - w[0] > 1)
        .map(|w| (w[0] + 1, w[1] - 1))
        .collect()
}

fn percent(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}

pub fn compute_coverage(base_dir: &Path) -> Result<CoverageReport> {
    let mut by_year = Vec::with_capacity(SECTION_52A_QUESTION_TOTALS.len());

    for &(year, official) in SECTION_52A_QUESTION_TOTALS {
        let files = year_files(&base_dir.join(year.to_string()))?;
        let numbers: Vec<u32> = files
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .filter_map(question_number)
            .collect();

        let collected = files.len() as u32;
        by_year.push(YearCoverage {
            year,
            collected,
            official,
            coverage_pct: percent(collected, official),
            missing: official.saturating_sub(collected),
            gaps: find_gaps(&numbers),
        });
    }

    let collected = by_year.iter().map(|r| r.collected).sum();
    let official = by_year.iter().map(|r| r.official).sum();

    Ok(CoverageReport {
        by_year,
        totals: CoverageTotals {
            collected,
            official,
            coverage_pct: percent(collected, official),
        },
    })
}

impl CoverageReport {
    pub fn to_markdown(&self) -> String {
        let mut md = String::from(
            "| Year | Collected | Official total | Coverage | Missing |\n\
             |:----:|----------:|---------------:|---------:|--------:|\n",
        );
        let rows: Vec<String> = self
            .by_year
            .iter()
            .map(|r| {
                format!(
                    "| {} | {:>9} | {:>14} | {:>7.1}% | {:>7} |",
                    r.year, r.collected, r.official, r.coverage_pct, r.missing
                )
            })
            .collect();
        md.push_str(&rows.join("\n"));
        md.push_str(&format!(
            "\n\n**Totals:** Collected **{}** of **{}** (overall coverage **{:.1}%**)\n",
            group_thousands(self.totals.collected as u64),
            group_thousands(self.totals.official as u64),
            self.totals.coverage_pct
        ));
        md
    }
}

/// Writes the markdown and JSON reports and logs every year with gaps.
pub fn run_coverage(base_dir: &Path, output_dir: &Path) -> Result<CoverageReport> {
    let report = compute_coverage(base_dir)?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let md_path = output_dir.join(COVERAGE_MARKDOWN_FILE);
    fs::write(&md_path, report.to_markdown())
        .with_context(|| format!("Failed to write {}", md_path.display()))?;

    let json_path = output_dir.join(COVERAGE_JSON_FILE);
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize coverage")?;
    fs::write(&json_path, json).with_context(|| format!("Failed to write {}", json_path.display()))?;

    for row in report.by_year.iter().filter(|r| !r.gaps.is_empty()) {
        warn!(year = row.year, gaps = ?row.gaps, "Missing question ranges");
    }

    info!(
        collected = report.totals.collected,
        official = report.totals.official,
        coverage_pct = report.totals.coverage_pct,
        "Coverage report written"
    );

    Ok(report)
}
