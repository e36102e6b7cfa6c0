//! Pluggable document backends.
//!
//! A [`CachedStore`](crate::CachedStore) only talks to its documents through
//! [`DocumentBackend`]. [`DocumentRepository`](crate::DocumentRepository) is
//! the on-disk implementation; an in-memory one is provided for
//! `RwLock<HashMap<String, Document>>`.

use crate::error::{Error, Result};
use crate::Document;
use async_trait::async_trait;
use std::collections::HashMap;

/// Whole-document load/store by name, in blocking and async flavours.
///
/// Both flavours must fail the same way: a missing document is
/// [`Error::NotFound`], unreadable content is [`Error::Parse`].
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Read the named document, blocking the calling thread.
    fn read_blocking(&self, name: &str) -> Result<Document>;

    /// Read the named document.
    async fn read_async(&self, name: &str) -> Result<Document>;

    /// Replace the named document, blocking the calling thread. A subsequent
    /// read never observes a partial document.
    fn write_blocking(&self, name: &str, doc: &Document) -> Result<()>;

    /// Replace the named document. Resolves once the write is committed.
    async fn write_async(&self, name: &str, doc: &Document) -> Result<()>;

    /// Read the named document, or create it empty if it doesn't exist.
    ///
    /// Only [`Error::NotFound`] is recovered. A corrupt document is an error,
    /// never silently replaced by an empty one.
    fn load_or_initialize(&self, name: &str) -> Result<Document> {
        match self.read_blocking(name) {
            Err(e) if e.is_not_found() => {
                tracing::debug!(name, "document missing, initializing empty");
                let empty = Document::new();
                self.write_blocking(name, &empty)?;
                Ok(empty)
            }
            other => other,
        }
    }
}

// ---- RwLock<HashMap> ---------------------------------------------------------

#[async_trait]
impl DocumentBackend for parking_lot::RwLock<HashMap<String, Document>> {
    fn read_blocking(&self, name: &str) -> Result<Document> {
        self.read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    async fn read_async(&self, name: &str) -> Result<Document> {
        self.read_blocking(name)
    }

    fn write_blocking(&self, name: &str, doc: &Document) -> Result<()> {
        self.write().insert(name.to_string(), doc.clone());
        Ok(())
    }

    async fn write_async(&self, name: &str, doc: &Document) -> Result<()> {
        self.write_blocking(name, doc)
    }
}
