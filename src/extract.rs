use crate::config::{ID_LENGTH, XML_ID, XML_LANG};
use crate::error::Result;
use crate::models::CorpusRecord;
use crate::parser::{is_sentence, is_tei_element, normalize_whitespace, Document};
use quick_xml::events::{BytesStart, Event};

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Primary language subtag whose sentences are left out, if any
    pub excluded_lang: Option<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            excluded_lang: Some(crate::config::DEFAULT_EXCLUDED_LANG.to_string()),
        }
    }
}

impl ExtractOptions {
    fn is_excluded(&self, lang: Option<&str>) -> bool {
        match (self.excluded_lang.as_deref(), lang) {
            (Some(excluded), Some(lang)) => lang
                .split('-')
                .next()
                .is_some_and(|primary| primary.eq_ignore_ascii_case(excluded)),
            _ => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct Extraction {
    pub year: Option<i32>,
    pub records: Vec<CorpusRecord>,
    /// Identified sentences skipped for their language
    pub excluded: usize,
}

/// Index of a pending record and the raw text collected for it so far
struct OpenSentence {
    record: usize,
    text: String,
}

/// Year of the first untyped `date` in the source description whose `when`
/// starts with four digits.
pub fn source_year(doc: &Document) -> Result<Option<i32>> {
    let mut reader = doc.reader();
    let mut source_desc_depth = 0usize;

    loop {
        match doc.next_event(&mut reader)? {
            (tei, Event::Start(e)) if is_tei_element(tei, e.local_name().as_ref(), b"sourceDesc") => {
                source_desc_depth += 1;
            }
            (tei, Event::End(e)) if is_tei_element(tei, e.local_name().as_ref(), b"sourceDesc") => {
                source_desc_depth = source_desc_depth.saturating_sub(1);
            }
            (tei, Event::Start(e)) | (tei, Event::Empty(e))
                if source_desc_depth > 0 && is_tei_element(tei, e.local_name().as_ref(), b"date") =>
            {
                if doc.attribute(&e, b"type")?.is_some() {
                    continue;
                }
                if let Some(year) = doc.attribute(&e, b"when")?.as_deref().and_then(parse_year) {
                    return Ok(Some(year));
                }
            }
            (_, Event::Eof) => return Ok(None),
            _ => {}
        }
    }
}

/// Four-digit year prefix of an ISO-8601-like date value.
pub fn parse_year(value: &str) -> Option<i32> {
    let prefix = value.trim().get(..4)?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok()
}

/// Records for every identified sentence of a document, in document order.
///
/// Sentences without an identifier of the expected length are not part of the
/// corpus and are passed over silently.
pub fn extract_sentences(doc: &Document, options: &ExtractOptions) -> Result<Extraction> {
    let year = source_year(doc)?;
    let mut reader = doc.reader();
    let mut records = Vec::new();
    let mut excluded = 0;
    // one slot per open element; Some for an open qualifying sentence
    let mut stack: Vec<Option<OpenSentence>> = Vec::new();

    loop {
        match doc.next_event(&mut reader)? {
            (tei, Event::Start(e)) => {
                let open = if is_sentence(tei, &e) {
                    qualifying_id(doc, &e, options, &mut excluded)?.map(|id| {
                        records.push(CorpusRecord::new(id, String::new(), year));
                        OpenSentence {
                            record: records.len() - 1,
                            text: String::new(),
                        }
                    })
                } else {
                    None
                };
                stack.push(open);
            }
            (tei, Event::Empty(e)) if is_sentence(tei, &e) => {
                if let Some(id) = qualifying_id(doc, &e, options, &mut excluded)? {
                    records.push(CorpusRecord::new(id, String::new(), year));
                }
            }
            (_, Event::End(_)) => {
                if let Some(Some(sentence)) = stack.pop() {
                    records[sentence.record].text = normalize_whitespace(&sentence.text);
                }
            }
            (_, Event::Text(t)) => {
                let text = t.unescape().map_err(|e| doc.parse_error(e))?;
                append_text(&mut stack, &text);
            }
            (_, Event::CData(c)) => {
                append_text(&mut stack, &String::from_utf8_lossy(&c));
            }
            (_, Event::Eof) => break,
            _ => {}
        }
    }

    Ok(Extraction {
        year,
        records,
        excluded,
    })
}

fn qualifying_id(
    doc: &Document,
    tag: &BytesStart,
    options: &ExtractOptions,
    excluded: &mut usize,
) -> Result<Option<String>> {
    let id = match doc.attribute(tag, XML_ID)? {
        Some(id) if id.chars().count() == ID_LENGTH => id,
        _ => return Ok(None),
    };
    let lang = doc.attribute(tag, XML_LANG)?;
    if options.is_excluded(lang.as_deref()) {
        *excluded += 1;
        return Ok(None);
    }
    Ok(Some(id))
}

// nested sentences also contribute to every enclosing one
fn append_text(stack: &mut [Option<OpenSentence>], text: &str) {
    for sentence in stack.iter_mut().flatten() {
        sentence.text.push_str(text);
    }
}
