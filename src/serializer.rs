//! Serialization layer. Documents are stored as JSON via serde_json.
//!
//! Implement [`Serializer`] if you need a different on-disk encoding.

use crate::error::{Error, Result};
use crate::Document;

/// Converts whole documents to/from bytes for persistence.
pub trait Serializer: Send + Sync {
    /// Encode a document to bytes.
    fn serialize(&self, doc: &Document) -> Result<Vec<u8>>;

    /// Decode bytes back into a document. Anything that is not a JSON object
    /// is a [`Error::Parse`].
    fn deserialize(&self, bytes: &[u8]) -> Result<Document>;
}

/// JSON serializer with optional pretty-printing.
#[derive(Debug, Clone, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// Compact JSON (single line, no extra whitespace).
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretty-printed JSON with indentation.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Serializer for JsonSerializer {
    fn serialize(&self, doc: &Document) -> Result<Vec<u8>> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(doc)
        } else {
            serde_json::to_vec(doc)
        };
        bytes.map_err(|e| Error::Serialize(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Document> {
        serde_json::from_slice(bytes).map_err(|e| Error::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_object_is_parse_error() {
        let ser = JsonSerializer::new();
        assert!(matches!(ser.deserialize(b"[1, 2]"), Err(Error::Parse(_))));
        assert!(matches!(ser.deserialize(b"42"), Err(Error::Parse(_))));
        assert!(matches!(ser.deserialize(b""), Err(Error::Parse(_))));
        assert!(matches!(ser.deserialize(b"{\"a\":"), Err(Error::Parse(_))));
    }

    #[test]
    fn pretty_output_is_indented() {
        let mut doc = Document::new();
        doc.insert("a".into(), json!({ "b": 1 }));

        let compact = JsonSerializer::new().serialize(&doc).unwrap();
        assert_eq!(compact, br#"{"a":{"b":1}}"#);

        let pretty = JsonSerializer::pretty().serialize(&doc).unwrap();
        assert!(pretty.contains(&b'\n'));
    }
}
