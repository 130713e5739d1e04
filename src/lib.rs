//! Tingmal: sentence identifiers and a canonical sentence dataset for a TEI corpus
//!
//! This crate manages a corpus of TEI-encoded parliamentary documents in two
//! passes:
//!
//! 1. **Stamping Pass** -- Collect every identifier already used anywhere in the
//!    corpus, then give each sentence element (`s`) lacking an `xml:id` a fresh,
//!    collision-free one. Documents are rewritten in place and atomically
//! 2. **Export Pass** -- Extract every identified sentence with its normalized
//!    text and the year of its source document, drop excluded languages, sort,
//!    deduplicate and write one JSON object per line
//!
//! Three supplementary tools work on the same data: dataset statistics, a
//! coverage and gap report over the collected questions, and a repair that
//! copies signature dates into documents lacking a source date.
//!
//! # Architecture
//!
//! - **Streaming XML parsing** -- Event-based reading; no DOM is built
//! - **Byte-level splicing** -- New attributes are inserted into the original
//!   bytes so formatting, comments and entity spellings survive untouched
//! - **Explicit registry** -- The set of used identifiers is a value passed by
//!   `&mut` into stamping, fully built before the first write
//! - **Atomic operations** -- Lock-free counters for run statistics
//!
//! # Key Modules
//!
//! - [`ident`] -- Random identifier generation over a 32-symbol alphabet
//! - [`scan`] -- Corpus traversal yielding document paths
//! - [`registry`] -- Set of identifiers already used in the corpus
//! - [`stamp`] -- Identifier assignment with in-place document rewrite
//! - [`extract`] -- Sentence text and provenance year extraction
//! - [`dataset`] -- Sorting, deduplication and JSONL output
//! - [`describe`] -- Descriptive statistics over the dataset
//! - [`coverage`] -- Collected versus official question counts per year
//! - [`dates`] -- Source date repair from document signatures
//! - [`parser`] -- Document loading and TEI element helpers
//! - [`rewrite`] -- Splicing and atomic file replacement
//! - [`error`] -- Library error type
//! - [`stats`] -- Atomic counters for run metrics
//! - [`config`] -- Constants
//!
//! # Example Usage
//!
//! ```bash
//! # Stamp all sentences, then build the dataset
//! tingmal -v run --root corpus/ --output sentences.jsonl
//!
//! # Describe the dataset
//! tingmal stats --input sentences.jsonl
//! ```

pub mod config;
pub mod coverage;
pub mod dataset;
pub mod dates;
pub mod describe;
pub mod error;
pub mod extract;
pub mod ident;
pub mod models;
pub mod parser;
pub mod registry;
pub mod rewrite;
pub mod scan;
pub mod stamp;
pub mod stats;
