//! Error taxonomy for document, backend and glossary failures

use thiserror::Error;

/// Fatal for one document. The input file is never modified when one of these is raised.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid DOCX container: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Missing document part: {0}")]
    MissingPart(String),

    #[error("Failed to parse {part}: {message}")]
    Parse { part: String, message: String },

    #[error("Corrupt document structure: {0}")]
    Structure(String),

    #[error("Output would overwrite the input document: {0}")]
    OutputIsInput(String),

    #[error("Failed to write output {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a single backend call. Recoverable at segment granularity.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timed out: {0}")]
    Timeout(String),
}

impl BackendError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::InvalidResponse(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::NetworkFailure(e.to_string())
        }
    }
}

/// Glossary store failure. Callers degrade to an empty glossary.
#[derive(Error, Debug)]
pub enum GlossaryError {
    #[error("Glossary database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Glossary I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid glossary entry: {0}")]
    InvalidEntry(String),
}
