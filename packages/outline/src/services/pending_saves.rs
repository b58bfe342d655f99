//! Registry of pending auto-saves
//!
//! One slot per node id. Each slot carries a cancellation token and a flush
//! signal for the timer task that owns it. The registry is shared between the
//! [`AutoSaveCoordinator`](super::AutoSaveCoordinator), which fills it, and the
//! [`NodeStore`](super::NodeStore), which cancels slots of deleted nodes and
//! reports the pending count in its stats.
//!
//! A slot becomes in flight once its timer task holds the store write lock
//! and is committing. In-flight slots can no longer be cancelled; they clear
//! themselves when the save returns.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

struct PendingSlot {
    ticket: u64,
    token: CancellationToken,
    flush: Arc<Notify>,
    in_flight: bool,
}

/// Handles given to the timer task that owns a slot
pub(crate) struct SlotLease {
    pub ticket: u64,
    pub token: CancellationToken,
    pub flush: Arc<Notify>,
}

/// Per-node pending save slots
#[derive(Default)]
pub struct PendingSaves {
    slots: Mutex<HashMap<String, PendingSlot>>,
    next_ticket: AtomicU64,
    /// Signalled whenever a slot is added or removed
    changed: Notify,
}

impl PendingSaves {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `id`, cancelling whatever held it before
    pub(crate) fn register(&self, id: &str) -> SlotLease {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let flush = Arc::new(Notify::new());

        let previous = self.slots.lock().insert(
            id.to_string(),
            PendingSlot {
                ticket,
                token: token.clone(),
                flush: Arc::clone(&flush),
                in_flight: false,
            },
        );

        if let Some(previous) = previous {
            previous.token.cancel();
            tracing::debug!("Superseded pending save for node '{}'", id);
        }
        self.changed.notify_waiters();

        SlotLease {
            ticket,
            token,
            flush,
        }
    }

    /// Cancel and clear the slot for `id`
    ///
    /// Returns `false` when nothing is pending or when the save is already in
    /// flight; an in-flight save completes and delivers its result.
    pub fn cancel(&self, id: &str) -> bool {
        let cancelled = {
            let mut slots = self.slots.lock();
            match slots.get(id) {
                Some(slot) if !slot.in_flight => {
                    if let Some(slot) = slots.remove(id) {
                        slot.token.cancel();
                    }
                    true
                }
                _ => false,
            }
        };
        if cancelled {
            self.changed.notify_waiters();
        }
        cancelled
    }

    /// Cancel every listed slot that is not in flight, returning how many were cancelled
    pub fn cancel_many<I, S>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cancelled = {
            let mut slots = self.slots.lock();
            let mut cancelled = 0;
            for id in ids {
                let id = id.as_ref();
                if slots.get(id).is_some_and(|slot| !slot.in_flight) {
                    if let Some(slot) = slots.remove(id) {
                        slot.token.cancel();
                        cancelled += 1;
                    }
                }
            }
            cancelled
        };
        if cancelled > 0 {
            self.changed.notify_waiters();
        }
        cancelled
    }

    /// Mark the slot as committing, `false` if it was cancelled or superseded
    ///
    /// Called with the store write lock held, right before the save runs.
    pub(crate) fn begin_save(&self, id: &str, ticket: u64) -> bool {
        match self.slots.lock().get_mut(id) {
            Some(slot) if slot.ticket == ticket && !slot.token.is_cancelled() => {
                slot.in_flight = true;
                true
            }
            _ => false,
        }
    }

    /// Clear the slot once its save has run, unless a newer schedule took it over
    pub(crate) fn release(&self, id: &str, ticket: u64) -> bool {
        let released = {
            let mut slots = self.slots.lock();
            match slots.get(id) {
                Some(slot) if slot.ticket == ticket => {
                    slots.remove(id);
                    true
                }
                _ => false,
            }
        };
        if released {
            self.changed.notify_waiters();
        }
        released
    }

    /// Make the pending save for `id` fire now
    pub fn flush(&self, id: &str) -> bool {
        match self.slots.lock().get(id) {
            Some(slot) => {
                slot.flush.notify_one();
                true
            }
            None => false,
        }
    }

    /// Make every waiting save fire now, returning how many were signalled
    pub fn flush_all(&self) -> usize {
        let slots = self.slots.lock();
        let mut signalled = 0;
        for slot in slots.values().filter(|slot| !slot.in_flight) {
            slot.flush.notify_one();
            signalled += 1;
        }
        signalled
    }

    /// Flush every slot and wait until the registry is empty
    ///
    /// Slots registered while draining are flushed as well. Waits on slot
    /// changes rather than polling.
    pub async fn drain(&self) {
        loop {
            let changed = self.changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            self.flush_all();
            if self.is_empty() {
                return;
            }
            changed.await;
        }
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.slots.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
