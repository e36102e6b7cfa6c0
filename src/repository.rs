//! On-disk document repository: one JSON file per document under a root dir.

use crate::backend::DocumentBackend;
use crate::error::Result;
use crate::persist::{atomic_write, atomic_write_async, read, read_async};
use crate::serializer::{JsonSerializer, Serializer};
use crate::store::{CachedStore, StoreBuilder};
use crate::Document;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File extension every document is stored under.
pub const EXTENSION: &str = ".json";

/// Maps document names to `<root>/<name>.json` and loads/stores whole
/// documents. Holds no state besides its root and serializer settings.
///
/// ```rust,no_run
/// use json_store::DocumentRepository;
///
/// let db = DocumentRepository::open(".data");
/// let users = db.store("users").unwrap();
/// users.set("alice", serde_json::json!({ "age": 30 }));
/// users.save_sync().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    root: PathBuf,
    serializer: JsonSerializer,
}

impl DocumentRepository {
    /// Repository rooted at `root`, writing compact JSON. Nothing touches the
    /// disk until a document is written.
    pub fn open(root: impl AsRef<Path>) -> Self {
        Self::builder(root).build()
    }

    /// Start configuring a repository.
    pub fn builder(root: impl AsRef<Path>) -> RepositoryBuilder {
        RepositoryBuilder {
            root: root.as_ref().to_path_buf(),
            pretty: false,
        }
    }

    /// Root directory of the database.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `root/name`, with `.json` appended unless `name` already ends in it.
    #[must_use]
    pub fn resolve_path(&self, name: &str) -> PathBuf {
        if name.ends_with(EXTENSION) {
            self.root.join(name)
        } else {
            self.root.join(format!("{name}{EXTENSION}"))
        }
    }

    /// Open a cached store over the named document with default settings.
    pub fn store(&self, name: &str) -> Result<CachedStore<DocumentRepository>> {
        self.store_builder(name).build()
    }

    /// Configure a cached store over the named document.
    pub fn store_builder(&self, name: &str) -> StoreBuilder<DocumentRepository> {
        CachedStore::builder(name, Arc::new(self.clone()))
    }
}

#[async_trait]
impl DocumentBackend for DocumentRepository {
    #[tracing::instrument(name = "DocumentRepository::read_blocking", skip(self))]
    fn read_blocking(&self, name: &str) -> Result<Document> {
        read(&self.resolve_path(name), &self.serializer)
    }

    #[tracing::instrument(name = "DocumentRepository::read_async", skip(self))]
    async fn read_async(&self, name: &str) -> Result<Document> {
        read_async(&self.resolve_path(name), &self.serializer).await
    }

    #[tracing::instrument(name = "DocumentRepository::write_blocking", skip(self, doc))]
    fn write_blocking(&self, name: &str, doc: &Document) -> Result<()> {
        let bytes = self.serializer.serialize(doc)?;
        atomic_write(&self.resolve_path(name), &bytes)?;
        tracing::trace!(bytes = bytes.len(), "document written");
        Ok(())
    }

    #[tracing::instrument(name = "DocumentRepository::write_async", skip(self, doc))]
    async fn write_async(&self, name: &str, doc: &Document) -> Result<()> {
        let bytes = self.serializer.serialize(doc)?;
        atomic_write_async(&self.resolve_path(name), &bytes).await?;
        tracing::trace!(bytes = bytes.len(), "document written");
        Ok(())
    }
}

/// Configures a [`DocumentRepository`].
#[derive(Debug)]
pub struct RepositoryBuilder {
    root: PathBuf,
    pretty: bool,
}

impl RepositoryBuilder {
    /// Write human-readable JSON with indentation (default: compact).
    pub fn pretty(mut self, yes: bool) -> Self {
        self.pretty = yes;
        self
    }

    /// Finish configuration.
    pub fn build(self) -> DocumentRepository {
        let serializer = if self.pretty {
            JsonSerializer::pretty()
        } else {
            JsonSerializer::new()
        };
        DocumentRepository {
            root: self.root,
            serializer,
        }
    }
}
