use crate::config::{ID_LENGTH, PROGRESS_INTERVAL, XML_ID};
use crate::error::{CorpusError, Result};
use crate::ident::IdGenerator;
use crate::parser::{is_sentence, Document};
use crate::registry::IdentifierRegistry;
use crate::rewrite::{self, Splice};
use crate::scan::CorpusScanner;
use crate::stats::RunStats;
use indicatif::ProgressBar;
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use rand::{CryptoRng, RngCore};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// An `xml:id` attribute present with an empty value
static EMPTY_XML_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\sxml:id\s*=\s*(""|'')"#).unwrap());

/// Result of stamping a document in memory.
#[derive(Debug)]
pub struct Stamped {
    pub source: String,
    pub assigned: Vec<String>,
}

impl Stamped {
    pub fn is_modified(&self) -> bool {
        !self.assigned.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StampOptions {
    pub dry_run: bool,
    pub registry_out: Option<PathBuf>,
}

/// Assigns an identifier to every sentence element whose `xml:id` is absent
/// or empty, registering each one as soon as it is minted.
///
/// Only the new attribute bytes are spliced into the source; everything else
/// is copied through unchanged.
pub fn stamp_document<R: RngCore + CryptoRng>(
    doc: &Document,
    registry: &mut IdentifierRegistry,
    generator: &mut IdGenerator<R>,
) -> Result<Stamped> {
    let mut reader = doc.reader();
    let mut splices = Vec::new();
    let mut assigned = Vec::new();

    loop {
        let tag = match doc.next_event(&mut reader)? {
            (tei, Event::Start(e)) | (tei, Event::Empty(e)) if is_sentence(tei, &e) => e,
            (_, Event::Eof) => break,
            _ => continue,
        };

        let existing = doc.attribute(&tag, XML_ID)?;
        if existing.as_deref().is_some_and(|id| !id.is_empty()) {
            continue;
        }

        let tag_end = doc.position(&reader);
        let tag_start = doc.tag_start(tag_end)?;

        let id = generator.generate(ID_LENGTH)?;
        if !registry.insert(&id) {
            return Err(CorpusError::Collision {
                id,
                path: doc.path().to_path_buf(),
            });
        }

        let splice = match existing {
            None => Splice::insert(
                tag_start + 1 + tag.name().as_ref().len(),
                format!(" xml:id=\"{id}\""),
            ),
            Some(_) => {
                let raw = &doc.source()[tag_start..tag_end];
                let value = EMPTY_XML_ID
                    .captures(raw)
                    .and_then(|c| c.get(1))
                    .ok_or_else(|| doc.parse_error("empty xml:id could not be located"))?;
                Splice::replace(
                    tag_start + value.start()..tag_start + value.end(),
                    format!("\"{id}\""),
                )
            }
        };

        splices.push(splice);
        assigned.push(id);
    }

    let source = if splices.is_empty() {
        doc.source().to_string()
    } else {
        rewrite::apply(doc.source(), &splices)
    };

    Ok(Stamped { source, assigned })
}

/// Stamps one file, replacing it atomically when anything was assigned.
pub fn stamp_file<R: RngCore + CryptoRng>(
    path: &Path,
    registry: &mut IdentifierRegistry,
    generator: &mut IdGenerator<R>,
    dry_run: bool,
) -> Result<Vec<String>> {
    let doc = Document::load(path)?;
    let stamped = stamp_document(&doc, registry, generator)?;

    if stamped.is_modified() && !dry_run {
        rewrite::write_atomic(path, stamped.source.as_bytes())
            .map_err(|e| CorpusError::io(path, e))?;
    }

    Ok(stamped.assigned)
}

/// Registry pass over every root, then the stamping pass.
///
/// Per-document parse and I/O failures are logged and skipped; collisions and
/// generator failures abort the run.
pub fn run_stamping<R: RngCore + CryptoRng>(
    roots: &[PathBuf],
    options: &StampOptions,
    generator: &mut IdGenerator<R>,
    stats: &RunStats,
) -> anyhow::Result<IdentifierRegistry> {
    let mut registry = IdentifierRegistry::build(roots);
    stats.set_registered(registry.len() as u64);

    if let Some(ref out) = options.registry_out {
        registry.write_to(out)?;
        info!(path = %out.display(), ids = registry.len(), "Registry written");
    }

    let pb = ProgressBar::new_spinner();

    for root in roots {
        info!(root = %root.display(), dry_run = options.dry_run, "Stamping documents");
        for path in CorpusScanner::new(root).files() {
            stats.inc_scanned();

            match stamp_file(&path, &mut registry, generator, options.dry_run) {
                Ok(assigned) if assigned.is_empty() => {
                    debug!(path = %path.display(), "Already stamped");
                }
                Ok(assigned) => {
                    debug!(path = %path.display(), count = assigned.len(), "Assigned identifiers");
                    stats.inc_modified();
                    stats.add_assigned(assigned.len() as u64);
                }
                Err(e) if e.is_fatal() => {
                    pb.finish_and_clear();
                    return Err(e.into());
                }
                Err(e) => {
                    warn!(error = %e, "Skipping document");
                    stats.inc_skipped();
                }
            }

            if stats.scanned() % PROGRESS_INTERVAL == 0 {
                pb.set_message(format!("{} documents stamped", stats.scanned()));
                pb.tick();
            }
        }
    }

    pb.finish_and_clear();

    info!(
        scanned = stats.scanned(),
        modified = stats.modified(),
        skipped = stats.skipped(),
        assigned = stats.assigned(),
        "Stamping complete"
    );

    Ok(registry)
}
