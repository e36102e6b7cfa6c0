//! Cached store over one named document, and its builder.

use crate::backend::DocumentBackend;
use crate::debounce::{Debouncer, Trigger, DEFAULT_WINDOW};
use crate::error::{Error, Result};
use crate::flush::{FlushWorker, WriteSlot, Writer};
use crate::Document;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

/// In-memory cache of one document with debounced persistence.
///
/// Reads never touch the backend. Mutations update the cache before they
/// return and then ask for a flush; the flush itself runs on a background
/// thread so mutations never wait on I/O.
///
/// Flush requests go through two leading-edge debounce gates, one for the
/// blocking path (mutations and [`save_sync`](Self::save_sync)) and one for
/// [`save`](Self::save). The first request on an idle gate writes right away;
/// requests inside the cooldown window are dropped and push the window out.
/// A burst of mutations therefore costs one write, and that write may miss
/// mutations made after it ran. Call [`flush`](Self::flush) after a burst
/// when the file must reflect the latest state.
///
/// Writes never overlap. A write requested while another is in flight is
/// handed to that writer, which writes again with a fresh snapshot before it
/// finishes, so the file always ends on the newest state either of them saw.
///
/// Background flush errors are parked and reported by the next `save`,
/// `save_sync`, `flush` or `settle`. Call [`close`](Self::close) (or
/// [`settle`](Self::settle)) before dropping the store to observe the outcome
/// of the last background flush; a plain drop only logs it.
///
/// Closures passed to [`select`](Self::select) and [`update`](Self::update)
/// run under the cache lock and must not call back into the same store.
pub struct CachedStore<B: DocumentBackend + 'static> {
    shared: Arc<Shared<B>>,
    worker: FlushWorker,
}

struct Shared<B> {
    name: String,
    backend: Arc<B>,
    cache: RwLock<Document>,
    sync_gate: Debouncer,
    async_gate: Debouncer,
    failure: Mutex<Option<Error>>,
    slot: WriteSlot,
}

impl<B: DocumentBackend> Shared<B> {
    fn snapshot(&self) -> Document {
        self.cache.read().clone()
    }

    // Snapshots are taken while holding the slot, so each round persists the
    // cache as of that round.
    fn write_blocking(&self) -> Result<()> {
        if !self.slot.acquire(Writer::Blocking) {
            tracing::trace!(store = %self.name, "write handed to in-flight save");
            return Ok(());
        }
        loop {
            let doc = self.snapshot();
            let res = self.backend.write_blocking(&self.name, &doc);
            if !self.slot.finish_round() {
                return res;
            }
        }
    }

    // Runs on the worker thread. Persists the cache as it is now, not as it
    // was when the flush was requested.
    fn write_cache(&self) {
        match self.write_blocking() {
            Ok(()) => tracing::trace!(store = %self.name, "background flush done"),
            Err(e) => {
                tracing::error!(store = %self.name, error = %e, "background flush failed");
                *self.failure.lock() = Some(e);
            }
        }
    }
}

impl<B: DocumentBackend + 'static> CachedStore<B> {
    /// Load (or create) the named document with default settings.
    pub fn open(name: &str, backend: Arc<B>) -> Result<Self> {
        Self::builder(name, backend).build()
    }

    /// Start configuring a store. Call [`.build()`](StoreBuilder::build) when
    /// ready.
    pub fn builder(name: &str, backend: Arc<B>) -> StoreBuilder<B> {
        StoreBuilder {
            name: name.to_string(),
            backend,
            window: DEFAULT_WINDOW,
        }
    }

    /// Name of the backing document.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Cooldown window of the flush gates.
    #[must_use]
    pub fn debounce_window(&self) -> Duration {
        self.shared.sync_gate.window()
    }

    // ---- reads ----

    /// Run `selector` against the cached document and return what it derives.
    pub fn select<R, F>(&self, selector: F) -> R
    where
        F: FnOnce(&Document) -> R,
    {
        let cache = self.shared.cache.read();
        selector(&*cache)
    }

    /// Value stored under `key`, or `None`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.select(|doc| doc.get(key).cloned())
    }

    /// Value under `key` deserialized into `T`. A value of the wrong shape is
    /// an [`Error::Parse`].
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    /// `true` if `key` is present.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.select(|doc| doc.contains_key(key))
    }

    /// Number of top-level keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.select(|doc| doc.len())
    }

    /// `true` when the document has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the top-level keys.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.select(|doc| doc.keys().cloned().collect())
    }

    /// Owned copy of the whole document.
    #[must_use]
    pub fn snapshot(&self) -> Document {
        self.shared.snapshot()
    }

    // ---- writes ----

    /// Replace the document with `updater(current)` and schedule a flush.
    /// Returns the new document.
    pub fn update<F>(&self, updater: F) -> Document
    where
        F: FnOnce(&Document) -> Document,
    {
        match self.try_update(|doc| Ok::<_, Infallible>(updater(doc))) {
            Ok(doc) => doc,
            Err(never) => match never {},
        }
    }

    /// Fallible [`update`](Self::update). If `updater` fails the cache is left
    /// untouched, no flush is scheduled and the error is returned as is.
    pub fn try_update<F, E>(&self, updater: F) -> std::result::Result<Document, E>
    where
        F: FnOnce(&Document) -> std::result::Result<Document, E>,
    {
        let next = {
            let mut cache = self.shared.cache.write();
            let next = updater(&*cache)?;
            *cache = next.clone();
            next
        };
        self.schedule_flush();
        Ok(next)
    }

    /// Shallow-merge `{key: value}` into the document. Nested values are
    /// replaced, not merged. Returns the new document.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Document {
        let (key, value) = (key.into(), value.into());
        self.mutate(move |doc| {
            doc.insert(key, value);
        })
    }

    /// Remove `key`. Returns the new document.
    pub fn delete(&self, key: &str) -> Document {
        self.mutate(|doc| {
            doc.remove(key);
        })
    }

    /// Drop every key. Returns the (empty) document.
    pub fn clear(&self) -> Document {
        self.mutate(|doc| doc.clear())
    }

    // ---- persistence ----

    /// Debounced blocking flush. On the leading edge of a burst this writes
    /// the cache before returning; inside the cooldown window it returns
    /// `Ok(())` without I/O.
    ///
    /// Shares its gate with mutations, so right after a mutation this is
    /// coalesced into the write the mutation already scheduled.
    pub fn save_sync(&self) -> Result<()> {
        if self.begin_flush(&self.shared.sync_gate)? {
            self.shared.write_blocking()?;
        }
        Ok(())
    }

    /// Debounced async flush with its own gate. Resolves once the write is
    /// committed, or right away when coalesced or when another write is
    /// already in flight (that writer picks up the current state).
    ///
    /// Blocking writes requested while this future is writing are folded into
    /// it: it keeps writing fresh snapshots until none are pending. If the
    /// future is dropped mid-write, a pending request goes to the background
    /// worker.
    pub async fn save(&self) -> Result<()> {
        if !self.begin_flush(&self.shared.async_gate)? {
            return Ok(());
        }
        if !self.shared.slot.acquire(Writer::Async) {
            tracing::trace!(store = %self.shared.name, "save handed to in-flight write");
            return Ok(());
        }
        let mut guard = AsyncWrite {
            store: self,
            armed: true,
        };
        loop {
            let doc = self.snapshot();
            let res = self
                .shared
                .backend
                .write_async(&self.shared.name, &doc)
                .await;
            if !self.shared.slot.finish_round() {
                guard.armed = false;
                return res;
            }
        }
    }

    /// Write the current cache now, bypassing both gates. If a [`save`](Self::save)
    /// is mid-write, the write is handed to it and this returns right away.
    pub fn flush(&self) -> Result<()> {
        self.take_failure()?;
        self.shared.write_blocking()
    }

    /// Wait for background flushes scheduled so far, then report the failure
    /// of any of them that went wrong since the last check.
    pub fn settle(&self) -> Result<()> {
        self.worker.wait_idle();
        self.take_failure()
    }

    /// Settle, then shut the flush worker down. Unlike a plain drop this
    /// reports a failed final flush.
    pub fn close(self) -> Result<()> {
        let res = self.settle();
        drop(self);
        res
    }

    // ---- internal ----

    fn mutate<F>(&self, f: F) -> Document
    where
        F: FnOnce(&mut Document),
    {
        let next = {
            let mut cache = self.shared.cache.write();
            f(&mut *cache);
            cache.clone()
        };
        self.schedule_flush();
        next
    }

    fn schedule_flush(&self) {
        match self.shared.sync_gate.trigger() {
            Trigger::Fire => {
                tracing::debug!(store = %self.shared.name, "scheduling flush");
                self.worker.trigger();
            }
            Trigger::Coalesced => {
                tracing::trace!(store = %self.shared.name, "flush coalesced");
            }
        }
    }

    // Shared front half of save/save_sync: surface parked failures, then ask
    // the gate whether this request writes.
    fn begin_flush(&self, gate: &Debouncer) -> Result<bool> {
        self.take_failure()?;
        match gate.trigger() {
            Trigger::Fire => Ok(true),
            Trigger::Coalesced => {
                tracing::trace!(store = %self.shared.name, "save coalesced");
                Ok(false)
            }
        }
    }

    fn take_failure(&self) -> Result<()> {
        match self.shared.failure.lock().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// Releases the write slot if a `save` future is dropped mid-write.
struct AsyncWrite<'a, B: DocumentBackend + 'static> {
    store: &'a CachedStore<B>,
    armed: bool,
}

impl<B: DocumentBackend + 'static> Drop for AsyncWrite<'_, B> {
    fn drop(&mut self) {
        if self.armed && self.store.shared.slot.abandon() {
            tracing::debug!(store = %self.store.shared.name, "save cancelled, pending write goes to worker");
            self.store.worker.trigger();
        }
    }
}

impl<B: DocumentBackend + 'static> std::fmt::Debug for CachedStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedStore")
            .field("name", &self.shared.name)
            .field("debounce", &self.shared.sync_gate.window())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and opens a [`CachedStore`].
///
/// ```rust,no_run
/// use json_store::DocumentRepository;
/// use std::time::Duration;
///
/// let db = DocumentRepository::open(".data");
/// let settings = db
///     .store_builder("settings")
///     .debounce(Duration::from_millis(200))
///     .build()
///     .unwrap();
/// ```
pub struct StoreBuilder<B> {
    name: String,
    backend: Arc<B>,
    window: Duration,
}

impl<B: DocumentBackend + 'static> StoreBuilder<B> {
    /// Cooldown window for the flush gates (default: 50ms). A zero window
    /// disables coalescing.
    pub fn debounce(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Load (or create) the document and start the flush worker.
    pub fn build(self) -> Result<CachedStore<B>> {
        if self.name.is_empty() {
            return Err(Error::Config("store name must not be empty".into()));
        }

        let cache = self.backend.load_or_initialize(&self.name)?;
        tracing::debug!(store = %self.name, keys = cache.len(), "store opened");

        let shared = Arc::new(Shared {
            name: self.name,
            backend: self.backend,
            cache: RwLock::new(cache),
            sync_gate: Debouncer::new(self.window),
            async_gate: Debouncer::new(self.window),
            failure: Mutex::new(None),
            slot: WriteSlot::default(),
        });

        let worker_ref = Arc::clone(&shared);
        let worker = FlushWorker::start(&shared.name, move || worker_ref.write_cache())?;

        Ok(CachedStore { shared, worker })
    }
}

impl<B> std::fmt::Debug for StoreBuilder<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreBuilder")
            .field("name", &self.name)
            .field("debounce", &self.window)
            .finish_non_exhaustive()
    }
}
