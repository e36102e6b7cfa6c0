//! Named JSON documents on disk, each fronted by an in-memory cache with
//! debounced persistence.
//!
//! A [`DocumentRepository`] maps names to `<root>/<name>.json`. A
//! [`CachedStore`] loads one of those documents (creating it empty if
//! needed), answers every read from memory, and coalesces bursts of writes
//! into a single disk flush.
//!
//! ```rust,no_run
//! use json_store::DocumentRepository;
//! use serde_json::json;
//!
//! let db = DocumentRepository::open(".data");
//! let users = db.store("users").unwrap();
//! users.set("alice", json!({ "age": 30 }));
//! assert_eq!(users.get("alice"), Some(json!({ "age": 30 })));
//! users.flush().unwrap();
//! ```
//!
//! **Single-process only.** Two processes opening the same document will
//! clobber each other's writes.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod debounce;
pub mod error;
pub mod flush;
pub mod persist;
pub mod repository;
pub mod serializer;
pub mod store;

pub use backend::DocumentBackend;
pub use error::{Error, Result};
pub use repository::{DocumentRepository, RepositoryBuilder};
pub use store::{CachedStore, StoreBuilder};

pub use serde_json::Value;

/// Contents of one named store: string keys to arbitrary JSON values.
pub type Document = serde_json::Map<String, Value>;
