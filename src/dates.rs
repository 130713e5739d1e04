use crate::config::QUESTION_FILE_PATTERN;
use crate::error::Result;
use crate::parser::{is_tei_element, Document};
use crate::rewrite::{self, Splice};
use anyhow::bail;
use once_cell::sync::Lazy;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

static QUESTION_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(QUESTION_FILE_PATTERN).unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateOutcome {
    /// A `<date when="…"/>` was added to the source description
    Added(String),
    AlreadyDated,
    MissingBibl,
    MissingSignatureDate,
    SignatureDateWithoutWhen,
}

/// Open element on the walk stack
struct Frame {
    tei: bool,
    local: Vec<u8>,
    signature: bool,
}

impl Frame {
    fn is(&self, name: &[u8]) -> bool {
        is_tei_element(self.tei, &self.local, name)
    }
}

/// What the walk learned about the first `teiHeader/fileDesc/sourceDesc/bibl`.
#[derive(Default)]
struct Bibl {
    /// Stack depth with the bibl itself on top
    level: usize,
    qname: String,
    /// (start, end) of a self-closing `<bibl/>`
    empty_tag: Option<(usize, usize)>,
    dated: bool,
    last_child: Option<(usize, usize)>,
    last_note: Option<(usize, usize)>,
    close_start: Option<usize>,
    open_child: Option<(usize, bool)>,
}

fn in_source_desc(stack: &[Frame]) -> bool {
    let n = stack.len();
    n >= 3 && stack[n - 3].is(b"teiHeader") && stack[n - 2].is(b"fileDesc") && stack[n - 1].is(b"sourceDesc")
}

fn is_untyped_date(doc: &Document, tei: bool, tag: &BytesStart) -> Result<bool> {
    Ok(is_tei_element(tei, tag.local_name().as_ref(), b"date") && doc.attribute(tag, b"type")?.is_none())
}

/// Leading whitespace of the line a tag starts on, if nothing else precedes it.
fn indentation(source: &str, tag_start: usize) -> Option<&str> {
    let line_start = memchr::memrchr(b'\n', &source.as_bytes()[..tag_start])? + 1;
    let indent = &source[line_start..tag_start];
    indent.chars().all(char::is_whitespace).then_some(indent)
}

/// Copies the signature date into the source description when it has no
/// untyped date of its own. Returns the new source alongside the outcome.
pub fn add_source_date(doc: &Document) -> Result<(DateOutcome, Option<String>)> {
    let mut reader = doc.reader();
    let mut stack: Vec<Frame> = Vec::new();
    let mut bibl: Option<Bibl> = None;
    let mut bibl_done = false;
    let mut signature_when: Option<Option<String>> = None;

    loop {
        let (tei, event) = doc.next_event(&mut reader)?;
        let empty = matches!(event, Event::Empty(_));

        match event {
            Event::Start(e) | Event::Empty(e) => {
                let end = doc.position(&reader);
                let local = e.local_name().as_ref().to_vec();

                if signature_when.is_none()
                    && is_tei_element(tei, &local, b"date")
                    && stack.iter().any(|f| f.signature)
                {
                    signature_when = Some(doc.attribute(&e, b"when")?);
                }

                match bibl.as_mut() {
                    None if !bibl_done && is_tei_element(tei, &local, b"bibl") && in_source_desc(&stack) => {
                        let mut found = Bibl {
                            level: stack.len() + 1,
                            qname: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                            ..Bibl::default()
                        };
                        if empty {
                            found.empty_tag = Some((doc.tag_start(end)?, end));
                            bibl_done = true;
                        }
                        bibl = Some(found);
                    }
                    Some(b) if !bibl_done && stack.len() == b.level => {
                        if is_untyped_date(doc, tei, &e)? {
                            b.dated = true;
                        }
                        let start = doc.tag_start(end)?;
                        let note = is_tei_element(tei, &local, b"note");
                        if empty {
                            b.last_child = Some((start, end));
                            if note {
                                b.last_note = Some((start, end));
                            }
                        } else {
                            b.open_child = Some((start, note));
                        }
                    }
                    _ => {}
                }

                if !empty {
                    let signature = is_tei_element(tei, &local, b"div")
                        && doc.attribute(&e, b"type")?.as_deref() == Some("signature");
                    stack.push(Frame { tei, local, signature });
                }
            }
            Event::End(_) => {
                stack.pop();
                let end = doc.position(&reader);
                if let Some(b) = bibl.as_mut().filter(|_| !bibl_done) {
                    if stack.len() == b.level {
                        if let Some((start, note)) = b.open_child.take() {
                            b.last_child = Some((start, end));
                            if note {
                                b.last_note = Some((start, end));
                            }
                        }
                    } else if stack.len() + 1 == b.level {
                        b.close_start = Some(doc.tag_start(end)?);
                        bibl_done = true;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let Some(bibl) = bibl else {
        return Ok((DateOutcome::MissingBibl, None));
    };
    if bibl.dated {
        return Ok((DateOutcome::AlreadyDated, None));
    }
    let when = match signature_when {
        None => return Ok((DateOutcome::MissingSignatureDate, None)),
        Some(None) => return Ok((DateOutcome::SignatureDateWithoutWhen, None)),
        Some(Some(when)) if when.is_empty() => {
            return Ok((DateOutcome::SignatureDateWithoutWhen, None))
        }
        Some(Some(when)) => when,
    };

    let prefix = bibl
        .qname
        .rsplit_once(':')
        .map(|(p, _)| format!("{p}:"))
        .unwrap_or_default();
    let element = format!("<{prefix}date when=\"{}\"/>", escape(when.as_str()));
    let source = doc.source();

    let splice = if let Some((start, end)) = bibl.last_note.or(bibl.last_child) {
        match indentation(source, start) {
            Some(indent) => Splice::insert(end, format!("\n{indent}{element}")),
            None => Splice::insert(end, element),
        }
    } else if let Some(close) = bibl.close_start {
        Splice::insert(close, element)
    } else if let Some((_, end)) = bibl.empty_tag {
        Splice::replace(end - 2..end, format!(">{element}</{}>", bibl.qname))
    } else {
        return Err(doc.parse_error("unterminated bibl element"));
    };

    let updated = rewrite::apply(source, &[splice]);
    Ok((DateOutcome::Added(when), Some(updated)))
}

/// Question files `<base>/<year>/52-*-*.xml`, sorted.
pub fn question_files(base_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(base_dir)
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_str().is_some_and(|n| QUESTION_FILE.is_match(n)))
        .map(|entry| entry.into_path())
        .collect()
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DateRunSummary {
    pub files: usize,
    pub modified: usize,
    pub failed: usize,
}

pub fn run_add_dates(base_dir: &Path) -> anyhow::Result<DateRunSummary> {
    if !base_dir.is_dir() {
        bail!("Question directory not found: {}", base_dir.display());
    }

    let files = question_files(base_dir);
    info!(files = files.len(), "Adding missing source dates");

    let mut summary = DateRunSummary {
        files: files.len(),
        ..DateRunSummary::default()
    };

    for path in &files {
        let result = Document::load(path).and_then(|doc| add_source_date(&doc));
        match result {
            Ok((DateOutcome::Added(when), Some(updated))) => {
                if let Err(e) = rewrite::write_atomic(path, updated.as_bytes()) {
                    warn!(path = %path.display(), error = %e, "Failed to write document");
                    summary.failed += 1;
                    continue;
                }
                info!(path = %path.display(), when = %when, "Added source date");
                summary.modified += 1;
            }
            Ok((outcome, _)) => {
                match outcome {
                    DateOutcome::AlreadyDated => debug!(path = %path.display(), "Source date already present"),
                    other => warn!(path = %path.display(), outcome = ?other, "Source date not added"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Skipping document");
                summary.failed += 1;
            }
        }
    }

    info!(modified = summary.modified, failed = summary.failed, "Source dates done");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(bibl: &str, signature: &str) -> Document {
        Document::from_source(
            "52-1-1.xml",
            format!(
                r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader>
    <fileDesc>
      <sourceDesc>
        {bibl}
      </sourceDesc>
    </fileDesc>
  </teiHeader>
  <text>
    <body>
      <div type="signature">
        <closer><dateline>Tórshavn, <date{signature}>1. mai 2022</date></dateline></closer>
      </div>
    </body>
  </text>
</TEI>"#
            ),
        )
    }

    #[test]
    fn inserts_after_last_note_with_its_indentation() {
        let d = doc(
            "<bibl>\n          <title>Fyrispurningur</title>\n          <note>52a</note>\n        </bibl>",
            r#" when="2022-05-01""#,
        );
        let (outcome, updated) = add_source_date(&d).unwrap();
        assert_eq!(outcome, DateOutcome::Added("2022-05-01".into()));
        assert!(updated.unwrap().contains(
            "<note>52a</note>\n          <date when=\"2022-05-01\"/>\n        </bibl>"
        ));
    }

    #[test]
    fn inserts_after_last_child_without_note() {
        let d = doc(
            "<bibl>\n          <title>A</title>\n          <author>B</author>\n        </bibl>",
            r#" when="2021-03-04""#,
        );
        let (_, updated) = add_source_date(&d).unwrap();
        assert!(updated.unwrap().contains(
            "<author>B</author>\n          <date when=\"2021-03-04\"/>\n        </bibl>"
        ));
    }

    #[test]
    fn childless_bibl_gets_date_before_close() {
        let d = doc("<bibl>Source</bibl>", r#" when="2020-01-02""#);
        let (_, updated) = add_source_date(&d).unwrap();
        assert!(updated
            .unwrap()
            .contains("<bibl>Source<date when=\"2020-01-02\"/></bibl>"));
    }

    #[test]
    fn self_closing_bibl_is_opened() {
        let d = doc("<bibl/>", r#" when="2020-01-02""#);
        let (_, updated) = add_source_date(&d).unwrap();
        assert!(updated
            .unwrap()
            .contains("<bibl><date when=\"2020-01-02\"/></bibl>"));
    }

    #[test]
    fn existing_untyped_date_is_kept() {
        let d = doc(
            r#"<bibl><date type="answered" when="2019"/><date when="2019-02-02"/></bibl>"#,
            r#" when="2022-05-01""#,
        );
        assert_eq!(add_source_date(&d).unwrap(), (DateOutcome::AlreadyDated, None));
    }

    #[test]
    fn typed_date_alone_does_not_count() {
        let d = doc(
            r#"<bibl><date type="answered" when="2019"/></bibl>"#,
            r#" when="2022-05-01""#,
        );
        let (outcome, updated) = add_source_date(&d).unwrap();
        assert_eq!(outcome, DateOutcome::Added("2022-05-01".into()));
        assert!(updated.unwrap().contains(
            r#"<date type="answered" when="2019"/><date when="2022-05-01"/></bibl>"#
        ));
    }

    #[test]
    fn reports_missing_pieces() {
        let no_when = doc("<bibl><title>A</title></bibl>", "");
        assert_eq!(
            add_source_date(&no_when).unwrap(),
            (DateOutcome::SignatureDateWithoutWhen, None)
        );

        let no_bibl = Document::from_source(
            "a.xml",
            r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><teiHeader><fileDesc><sourceDesc><p/></sourceDesc></fileDesc></teiHeader></TEI>"#,
        );
        assert_eq!(add_source_date(&no_bibl).unwrap(), (DateOutcome::MissingBibl, None));

        let no_signature = Document::from_source(
            "a.xml",
            r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><teiHeader><fileDesc><sourceDesc><bibl/></sourceDesc></fileDesc></teiHeader></TEI>"#,
        );
        assert_eq!(
            add_source_date(&no_signature).unwrap(),
            (DateOutcome::MissingSignatureDate, None)
        );
    }

    #[test]
    fn prefixed_documents_keep_their_prefix() {
        let d = Document::from_source(
            "a.xml",
            r#"<tei:TEI xmlns:tei="http://www.tei-c.org/ns/1.0"><tei:teiHeader><tei:fileDesc><tei:sourceDesc><tei:bibl><tei:title>A</tei:title></tei:bibl></tei:sourceDesc></tei:fileDesc></tei:teiHeader><tei:div type="signature"><tei:date when="2024-01-01"/></tei:div></tei:TEI>"#,
        );
        let (_, updated) = add_source_date(&d).unwrap();
        assert!(updated
            .unwrap()
            .contains(r#"<tei:title>A</tei:title><tei:date when="2024-01-01"/></tei:bibl>"#));
    }

    #[test]
    fn byte_order_mark_keeps_offsets_aligned() {
        let d = Document::from_source(
            "52-1-1.xml",
            "\u{feff}<TEI xmlns=\"http://www.tei-c.org/ns/1.0\"><teiHeader><fileDesc><sourceDesc><bibl><title>A</title></bibl></sourceDesc></fileDesc></teiHeader><div type=\"signature\"><date when=\"2011-01-11\"/></div></TEI>",
        );
        let (outcome, updated) = add_source_date(&d).unwrap();
        assert_eq!(outcome, DateOutcome::Added("2011-01-11".into()));
        let updated = updated.unwrap();
        assert!(updated.starts_with('\u{feff}'));
        assert!(updated.contains(r#"<title>A</title><date when="2011-01-11"/></bibl>"#));
    }
}
