#![allow(dead_code)]

use async_trait::async_trait;
use json_store::{DocumentBackend, Document, Error, Result};
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory backend.
pub type MemoryBackend = RwLock<HashMap<String, Document>>;

/// Wraps a backend and records every call that reaches it.
#[derive(Default)]
pub struct CountingBackend<B> {
    inner: B,
    reads: AtomicUsize,
    blocking_writes: AtomicUsize,
    async_writes: AtomicUsize,
    fail_writes: AtomicBool,
    written: Mutex<Vec<Document>>,
    held: Mutex<bool>,
    released: Condvar,
    async_delay: Mutex<Duration>,
}

impl<B: DocumentBackend> CountingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            blocking_writes: AtomicUsize::new(0),
            async_writes: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            written: Mutex::new(Vec::new()),
            held: Mutex::new(false),
            released: Condvar::new(),
            async_delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn blocking_writes(&self) -> usize {
        self.blocking_writes.load(Ordering::SeqCst)
    }

    pub fn async_writes(&self) -> usize {
        self.async_writes.load(Ordering::SeqCst)
    }

    /// Every document that was successfully written, oldest first.
    pub fn written(&self) -> Vec<Document> {
        self.written.lock().clone()
    }

    pub fn fail_writes(&self, yes: bool) {
        self.fail_writes.store(yes, Ordering::SeqCst);
    }

    /// While held, blocking writes park before they are counted.
    pub fn hold_writes(&self, yes: bool) {
        *self.held.lock() = yes;
        if !yes {
            self.released.notify_all();
        }
    }

    /// Every async write sleeps this long before touching the inner backend.
    pub fn slow_async_writes(&self, delay: Duration) {
        *self.async_delay.lock() = delay;
    }

    pub fn reset(&self) {
        self.reads.store(0, Ordering::SeqCst);
        self.blocking_writes.store(0, Ordering::SeqCst);
        self.async_writes.store(0, Ordering::SeqCst);
        self.written.lock().clear();
    }

    fn check_failure(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(Error::Io("disk full".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl<B: DocumentBackend> DocumentBackend for CountingBackend<B> {
    fn read_blocking(&self, name: &str) -> Result<Document> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_blocking(name)
    }

    async fn read_async(&self, name: &str) -> Result<Document> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_async(name).await
    }

    fn write_blocking(&self, name: &str, doc: &Document) -> Result<()> {
        {
            let mut held = self.held.lock();
            while *held {
                self.released.wait(&mut held);
            }
        }
        self.blocking_writes.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        self.inner.write_blocking(name, doc)?;
        self.written.lock().push(doc.clone());
        Ok(())
    }

    async fn write_async(&self, name: &str, doc: &Document) -> Result<()> {
        self.async_writes.fetch_add(1, Ordering::SeqCst);
        let delay = *self.async_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.check_failure()?;
        self.inner.write_async(name, doc).await?;
        self.written.lock().push(doc.clone());
        Ok(())
    }
}

/// Memory backend pre-seeded with one document.
pub fn seeded(name: &str, doc: serde_json::Value) -> MemoryBackend {
    let mut map = HashMap::new();
    let serde_json::Value::Object(doc) = doc else {
        panic!("seed must be an object");
    };
    map.insert(name.to_string(), doc);
    RwLock::new(map)
}
