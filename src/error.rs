use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while reading, stamping or extracting corpus documents.
///
/// Per-document failures (`Parse`, `Io`) are logged and the document is
/// skipped. The remaining variants break a pipeline invariant and abort the run.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("generated identifier '{id}' is already in use (while stamping {})", path.display())]
    Collision { id: String, path: PathBuf },
    #[error("could not generate an identifier with an alphabetic first character in {attempts} attempts")]
    GenerationExhausted { attempts: u32 },
    #[error("identifier length must be greater than zero")]
    InvalidIdLength,
}

impl CorpusError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must stop the whole run rather than one document.
    pub fn is_fatal(&self) -> bool {
        match self {
            CorpusError::Parse { .. } | CorpusError::Io { .. } => false,
            CorpusError::Collision { .. }
            | CorpusError::GenerationExhausted { .. }
            | CorpusError::InvalidIdLength => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, CorpusError>;
