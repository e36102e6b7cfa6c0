//! Unified error type for repository and store operations.

/// Things that can go wrong when using a repository or a store.
///
/// Payloads are plain strings so the error stays `Clone`: a failed
/// background flush is parked in the store and handed to a later caller.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The requested document does not exist.
    #[error("document not found: {0}")]
    NotFound(String),
    /// Document content is not a valid JSON object.
    #[error("parse error: {0}")]
    Parse(String),
    /// Failed to serialize a document to bytes.
    #[error("serialization error: {0}")]
    Serialize(String),
    /// File system problem (read, write, rename, mkdir).
    #[error("i/o error: {0}")]
    Io(String),
    /// Bad configuration (empty store name, etc.).
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// `true` for [`Error::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Error::Io(err.to_string())
        } else if err.is_syntax() || err.is_eof() || err.is_data() {
            Error::Parse(err.to_string())
        } else {
            Error::Serialize(err.to_string())
        }
    }
}

/// Result alias using our [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
