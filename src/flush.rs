//! Background flush worker, and the slot that orders every document write.

use crate::error::Result;
use parking_lot::{Condvar, Mutex};
use std::sync::mpsc;
use std::thread;

enum Message {
    Flush,
    Barrier(mpsc::SyncSender<()>),
}

/// Thread that runs a flush closure whenever it is poked.
/// Joins the thread on drop, after every queued flush has run.
pub struct FlushWorker {
    tx: Option<mpsc::Sender<Message>>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl FlushWorker {
    /// Spawn a worker for the store called `name`.
    pub fn start<F>(name: &str, flush_fn: F) -> Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Message>();

        let join_handle = thread::Builder::new()
            .name(format!("json-store-flush-{name}"))
            .spawn(move || {
                while let Ok(msg) = rx.recv() {
                    match msg {
                        Message::Flush => flush_fn(),
                        Message::Barrier(ack) => {
                            let _ = ack.send(());
                        }
                    }
                }
            })?;

        Ok(Self {
            tx: Some(tx),
            join_handle: Some(join_handle),
        })
    }

    /// Non-blocking request to flush. Returns immediately.
    pub fn trigger(&self) {
        if let Some(ref t) = self.tx {
            let _ = t.send(Message::Flush);
        }
    }

    /// Block until every flush requested before this call has finished.
    pub fn wait_idle(&self) {
        let Some(ref t) = self.tx else { return };
        let (ack_tx, ack_rx) = mpsc::sync_channel(1);
        if t.send(Message::Barrier(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}

impl Drop for FlushWorker {
    fn drop(&mut self) {
        drop(self.tx.take());
        if let Some(h) = self.join_handle.take() {
            let _ = h.join();
        }
    }
}

impl std::fmt::Debug for FlushWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushWorker")
            .field("running", &self.join_handle.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Write slot
// ---------------------------------------------------------------------------

/// Which kind of writer holds a [`WriteSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Writer {
    /// A thread doing blocking I/O (the worker, `save_sync`, `flush`).
    Blocking,
    /// A `save` future awaiting async I/O.
    Async,
}

#[derive(Debug, Default)]
struct SlotState {
    active: Option<Writer>,
    dirty: bool,
}

/// Admits one document write at a time.
///
/// A request that arrives while a write is in flight marks the slot dirty,
/// and the holder runs another round with a fresh snapshot before letting
/// go. Writes never overlap, so the last one to land is the newest state.
///
/// Blocking writers wait for another blocking writer. Nobody waits for an
/// async writer: its future may only make progress on the very thread that
/// would be waiting, so requests are handed to it instead.
#[derive(Debug, Default)]
pub struct WriteSlot {
    state: Mutex<SlotState>,
    idle: Condvar,
}

impl WriteSlot {
    /// Try to become the writer. `false` means the request was handed to the
    /// current holder, which will write again on its behalf.
    pub fn acquire(&self, kind: Writer) -> bool {
        let mut state = self.state.lock();
        loop {
            match (state.active, kind) {
                (None, _) => {
                    state.active = Some(kind);
                    return true;
                }
                (Some(Writer::Blocking), Writer::Blocking) => self.idle.wait(&mut state),
                _ => {
                    state.dirty = true;
                    return false;
                }
            }
        }
    }

    /// End a write round. `true` means requests came in meanwhile: the caller
    /// still holds the slot and must write again.
    pub fn finish_round(&self) -> bool {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.dirty) {
            return true;
        }
        state.active = None;
        self.idle.notify_all();
        false
    }

    /// Release the slot mid-write (the holder was cancelled). Returns `true`
    /// if a handed-off request is still owed a write.
    pub fn abandon(&self) -> bool {
        let mut state = self.state.lock();
        state.active = None;
        self.idle.notify_all();
        std::mem::take(&mut state.dirty)
    }
}
