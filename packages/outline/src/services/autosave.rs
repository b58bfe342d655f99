//! Auto-save coordinator with per-node debounce
//!
//! Editors call [`AutoSaveCoordinator::schedule`] on every keystroke. Each node
//! id owns at most one pending save; scheduling again resets the idle timer
//! and abandons the earlier request, so a burst of edits produces exactly one
//! [`NodeStore::save`](super::NodeStore::save) with the last content.
//!
//! ## Event-Driven Model
//!
//! Every schedule spawns one timer task that waits on whichever comes first:
//! 1. its cancellation token (superseded, cancelled, or node deleted) - exits silently
//! 2. a flush signal - saves immediately
//! 3. the debounce delay - saves
//!
//! ## Abandoned Requests
//!
//! A superseded or cancelled [`PendingSave`] never receives a `SaveResult`;
//! awaiting it yields `None` once its timer task has exited. No save is ever
//! performed on its behalf. A save that already holds the store lock is in
//! flight: it can no longer be cancelled and always resolves.

use crate::models::SaveResult;
use crate::services::node_store::NodeStore;
use crate::services::pending_saves::{PendingSaves, SlotLease};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Handle to a scheduled save
///
/// Resolves to `Some(SaveResult)` once the save ran, or `None` if the request
/// was abandoned (superseded, cancelled, or its node deleted).
#[derive(Debug)]
#[must_use = "dropping a PendingSave does not cancel it; await it or ignore the result explicitly"]
pub struct PendingSave {
    node_id: String,
    rx: oneshot::Receiver<SaveResult>,
}

impl PendingSave {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }
}

impl Future for PendingSave {
    type Output = Option<SaveResult>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}

/// Debounces content saves per node id
pub struct AutoSaveCoordinator {
    store: Arc<NodeStore>,
    pending: Arc<PendingSaves>,
    delay: Duration,
}

impl AutoSaveCoordinator {
    /// Create a coordinator saving into `store`
    ///
    /// Uses the store's configured debounce window and shares its pending-save
    /// registry, so deletions cancel timers and stats count them.
    pub fn new(store: Arc<NodeStore>) -> Self {
        let pending = Arc::clone(store.pending_saves());
        let delay = store.config().autosave.debounce();
        Self {
            store,
            pending,
            delay,
        }
    }

    /// Debounce window applied by [`schedule`](Self::schedule)
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule a save after the configured debounce window
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule(
        &self,
        id: impl Into<String>,
        content: impl Into<String>,
        title: Option<String>,
    ) -> PendingSave {
        self.schedule_with_delay(id, content, title, self.delay)
    }

    /// Schedule a save after `delay` of inactivity for this id
    ///
    /// Any save already pending for the id is cancelled first and its handle
    /// abandoned.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule_with_delay(
        &self,
        id: impl Into<String>,
        content: impl Into<String>,
        title: Option<String>,
        delay: Duration,
    ) -> PendingSave {
        let node_id = id.into();
        let content = content.into();
        let deadline = Instant::now() + delay;
        let lease = self.pending.register(&node_id);
        let (tx, rx) = oneshot::channel();

        tracing::debug!(
            "Scheduled save for node '{}' in {}ms (ticket {})",
            node_id,
            delay.as_millis(),
            lease.ticket
        );

        tokio::spawn(run_pending_save(
            Arc::clone(&self.store),
            Arc::clone(&self.pending),
            lease,
            node_id.clone(),
            content,
            title,
            deadline,
            tx,
        ));

        PendingSave { node_id, rx }
    }

    /// Cancel the pending save for `id`
    ///
    /// Returns `false` when nothing is pending, and also when the save has
    /// already started committing: that save completes and its handle
    /// resolves with the result.
    pub fn cancel(&self, id: &str) -> bool {
        let cancelled = self.pending.cancel(id);
        if cancelled {
            tracing::debug!("Cancelled pending save for node '{}'", id);
        }
        cancelled
    }

    /// Fire the pending save for `id` now instead of waiting out the delay
    pub fn flush(&self, id: &str) -> bool {
        self.pending.flush(id)
    }

    /// Fire every pending save now, returning how many were signalled
    pub fn flush_all(&self) -> usize {
        let flushed = self.pending.flush_all();
        if flushed > 0 {
            tracing::info!("Flushing {} pending save(s)", flushed);
        }
        flushed
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.is_pending(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Flush every pending save and wait until all of them have finished
    pub async fn drain(&self) {
        self.pending.drain().await;
    }
}

impl std::fmt::Debug for AutoSaveCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoSaveCoordinator")
            .field("delay", &self.delay)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_pending_save(
    store: Arc<NodeStore>,
    pending: Arc<PendingSaves>,
    lease: SlotLease,
    node_id: String,
    content: String,
    title: Option<String>,
    deadline: Instant,
    tx: oneshot::Sender<SaveResult>,
) {
    let SlotLease {
        ticket,
        token,
        flush,
    } = lease;

    tokio::select! {
        biased;
        _ = token.cancelled() => {
            tracing::trace!("Pending save for node '{}' abandoned (ticket {})", node_id, ticket);
            return;
        }
        _ = flush.notified() => {
            tracing::debug!("Pending save for node '{}' flushed early", node_id);
        }
        _ = tokio::time::sleep_until(deadline) => {}
    }

    // The slot stays claimed until the save returns
    let result = store.save_scheduled(&node_id, content, title, ticket).await;
    pending.release(&node_id, ticket);

    match result {
        Some(result) => {
            let _ = tx.send(result);
        }
        None => {
            tracing::trace!("Pending save for node '{}' cancelled before commit", node_id);
        }
    }
}
