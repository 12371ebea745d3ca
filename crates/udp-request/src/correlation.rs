//! Per-call listener registry for inbound datagram fan-out.
//!
//! Every datagram the client receives is delivered to all currently
//! registered listeners; each listener independently decides whether the
//! datagram is the response it is waiting for. Registration and removal
//! contend on one lock with dispatch, so a listener is never invoked after
//! its removal has completed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// A registered inbound listener. Invoked with the raw payload of every
/// datagram received while registered.
pub(crate) type InboundListener = Box<dyn Fn(&[u8]) + Send>;

/// The shared set of per-call listeners attached to a client's socket.
pub(crate) struct ListenerSet {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, InboundListener)>>,
}

impl ListenerSet {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Register a listener and return its id.
    pub(crate) fn register(&self, listener: InboundListener) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().push((id, listener));
        id
    }

    /// Remove a listener by id. Returns `true` if it was still registered.
    pub(crate) fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Drop all listeners. Pending calls observe this as their resolution
    /// channel closing.
    pub(crate) fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of currently registered listeners.
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Deliver a datagram payload to every registered listener.
    pub(crate) fn dispatch(&self, payload: &[u8]) {
        let entries = self.entries.lock();
        for (_, listener) in entries.iter() {
            listener(payload);
        }
    }
}

/// RAII handle that removes its listener from the set on drop.
///
/// Each `send` call holds exactly one guard, so the listener is deregistered
/// on every exit path: match, timeout, transport error, or cancellation.
pub(crate) struct ListenerGuard {
    set: Arc<ListenerSet>,
    id: u64,
}

impl ListenerGuard {
    pub(crate) fn new(set: Arc<ListenerSet>, id: u64) -> Self {
        Self { set, id }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.set.remove(self.id);
    }
}
