// ── Load queue ──
//
// One worker task per queue expands nodes strictly in arrival order. The
// channel carries node ids only; deduplication lives in the node's load
// state, which the browser flips to `Pending` before sending. Cancelling
// the token lets the in-flight expansion finish, stops the worker pulling
// further ids, and hands every id still queued back as `NotLoaded`.

use std::sync::Arc;

use audtek_api::PaginatedCollection;
use futures_util::TryStreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::state::{Fetched, TreeState};
use crate::tree::{ChildSource, LoadStatus, NodeId};

pub(crate) struct LoadQueue {
    tx: mpsc::UnboundedSender<NodeId>,
    cancel: CancellationToken,
    generation: u64,
    handle: JoinHandle<()>,
}

impl LoadQueue {
    /// Spawn a worker on the current tokio runtime.
    pub(crate) fn spawn(state: Arc<TreeState>, generation: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(worker(state, rx, cancel.clone(), generation));
        Self {
            tx,
            cancel,
            generation,
            handle,
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether new requests would be refused.
    pub(crate) fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    /// Whether the worker task is still alive.
    pub(crate) fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub(crate) fn submit(&self, id: NodeId) -> Result<(), CoreError> {
        if self.cancel.is_cancelled() {
            return Err(CoreError::QueueClosed);
        }
        self.tx.send(id).map_err(|_| CoreError::QueueClosed)
    }

    pub(crate) fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            info!(generation = self.generation, "cancelling load queue");
            self.cancel.cancel();
        }
    }
}

impl Drop for LoadQueue {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn worker(
    state: Arc<TreeState>,
    mut rx: mpsc::UnboundedReceiver<NodeId>,
    cancel: CancellationToken,
    generation: u64,
) {
    debug!(generation, "load queue worker started");

    loop {
        let id = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(id) => id,
                None => break,
            },
        };
        expand(&state, id, generation, &cancel).await;
    }

    // Refuse further sends, then hand back whatever was already queued.
    rx.close();
    let mut abandoned = 0usize;
    while let Ok(id) = rx.try_recv() {
        if state.abandon(id, generation) {
            abandoned += 1;
        }
    }
    debug!(generation, abandoned, "load queue worker stopped");
}

/// Fetch and publish the children of one node.
async fn expand(state: &TreeState, id: NodeId, generation: u64, cancel: &CancellationToken) {
    let source = {
        let arena = state.read();
        match arena.get(id) {
            Some(slot)
                if slot.node.status == LoadStatus::Pending && slot.generation == generation =>
            {
                slot.node.child_source()
            }
            Some(_) => {
                debug!(node = %id, "request no longer owned by this queue, skipping");
                return;
            }
            None => {
                debug!(node = %id, "node detached before expansion, skipping");
                return;
            }
        }
    };

    let outcome = match source {
        ChildSource::Static => Ok(Fetched::Containers),
        ChildSource::None => Ok(Fetched::Items(Vec::new())),
        ChildSource::Collection(endpoint) => {
            debug!(node = %id, path = %endpoint.path, "expanding node");
            PaginatedCollection::new(state.client.clone(), endpoint, state.page_size)
                .with_cancellation(cancel.clone())
                .iterate()
                .try_collect::<Vec<_>>()
                .await
                .map(Fetched::Items)
                .map_err(CoreError::from)
        }
    };

    state.publish(id, generation, outcome);
}
