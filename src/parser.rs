use crate::config::{SENTENCE_TAG, TEI_NAMESPACE};
use crate::error::{CorpusError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

/// A corpus document held in memory as its original UTF-8 source.
///
/// Every pass reads the source through a namespace-aware event reader and
/// works with byte offsets into it, so rewrites never touch bytes they do
/// not mean to change.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    source: String,
    /// Length of a leading UTF-8 byte-order mark, which the reader never sees
    bom: usize,
}

const BOM: char = '\u{feff}';

fn bom_len(source: &str) -> usize {
    if source.starts_with(BOM) {
        BOM.len_utf8()
    } else {
        0
    }
}

impl Document {
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|e| CorpusError::io(path, e))?;
        Ok(Self::from_source(path, source))
    }

    pub fn from_source(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            path: path.into(),
            bom: bom_len(&source),
            source,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn reader(&self) -> NsReader<&[u8]> {
        NsReader::from_str(&self.source[self.bom..])
    }

    /// Offset into [`Document::source`] just past the last event read.
    ///
    /// All splice offsets must come from here, not from the reader directly.
    pub fn position(&self, reader: &NsReader<&[u8]>) -> usize {
        self.bom + reader.buffer_position()
    }

    /// Next event, paired with whether its element is bound to the TEI namespace.
    pub fn next_event<'i>(&self, reader: &mut NsReader<&'i [u8]>) -> Result<(bool, Event<'i>)> {
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| self.parse_error(e))?;
        Ok((is_tei(&ns), event))
    }

    pub fn parse_error(&self, err: impl Display) -> CorpusError {
        CorpusError::Parse {
            path: self.path.clone(),
            message: err.to_string(),
        }
    }

    /// Unescaped value of the attribute with the given raw (prefixed) name.
    pub fn attribute(&self, tag: &BytesStart, key: &[u8]) -> Result<Option<String>> {
        for attr in tag.attributes() {
            let attr = attr.map_err(|e| self.parse_error(e))?;
            if attr.key.as_ref() == key {
                let value = attr.unescape_value().map_err(|e| self.parse_error(e))?;
                return Ok(Some(value.into_owned()));
            }
        }
        Ok(None)
    }

    /// Byte offset of the `<` opening the tag whose event ended at `tag_end`.
    pub fn tag_start(&self, tag_end: usize) -> Result<usize> {
        // `<` cannot occur inside attribute values of well-formed XML
        memchr::memrchr(b'<', &self.source.as_bytes()[..tag_end])
            .ok_or_else(|| self.parse_error(format!("no tag opening before offset {tag_end}")))
    }
}

fn is_tei(ns: &ResolveResult) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == TEI_NAMESPACE.as_bytes())
}

/// True when a TEI-bound element has the local name `name`.
pub fn is_tei_element(tei: bool, local: &[u8], name: &[u8]) -> bool {
    tei && local == name
}

pub fn is_sentence(tei: bool, tag: &BytesStart) -> bool {
    is_tei_element(tei, tag.local_name().as_ref(), SENTENCE_TAG)
}

/// Collapses every whitespace run to one space and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
