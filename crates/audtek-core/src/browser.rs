// ── Catalog browser ──
//
// Facade over the lazily-built catalog tree. Reads are synchronous
// snapshots of the arena; expansion goes through the load queue and hands
// back an `Expansion` the caller may await. Title details are fetched on
// the caller's task, once per node.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use audtek_api::{CatalogClient, ItemKind};
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tracing::debug;

use crate::config::BrowserConfig;
use crate::error::CoreError;
use crate::event::TreeEvent;
use crate::queue::LoadQueue;
use crate::state::TreeState;
use crate::tree::{LoadStatus, NodeId, VirtualPathNode};

/// Lazily-expanded view of one catalog account.
///
/// Must be created inside a tokio runtime: construction spawns the load
/// queue worker. Dropping the browser stops the worker once its in-flight
/// expansion, if any, has finished.
pub struct CatalogBrowser {
    state: Arc<TreeState>,
    queue: Mutex<LoadQueue>,
    generations: AtomicU64,
}

impl CatalogBrowser {
    pub fn new(client: CatalogClient) -> Self {
        Self::with_config(client, BrowserConfig::default())
    }

    pub fn with_config(client: CatalogClient, config: BrowserConfig) -> Self {
        let state = Arc::new(TreeState::new(
            client,
            config.page_size,
            config.event_capacity,
        ));
        let queue = LoadQueue::spawn(Arc::clone(&state), 1);
        Self {
            state,
            queue: Mutex::new(queue),
            generations: AtomicU64::new(1),
        }
    }

    pub fn client(&self) -> &CatalogClient {
        &self.state.client
    }

    fn queue(&self) -> MutexGuard<'_, LoadQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Tree reads ───────────────────────────────────────────────────

    pub fn root(&self) -> NodeId {
        self.state.read().root()
    }

    /// Snapshot of one node.
    pub fn node(&self, id: NodeId) -> Result<VirtualPathNode, CoreError> {
        self.state
            .read()
            .get(id)
            .map(|slot| slot.node.clone())
            .ok_or(CoreError::NodeNotFound { id })
    }

    /// Snapshots of a node's current children, in service order. Empty
    /// until the node is loaded.
    pub fn children(&self, id: NodeId) -> Result<Vec<VirtualPathNode>, CoreError> {
        let arena = self.state.read();
        let slot = arena.get(id).ok_or(CoreError::NodeNotFound { id })?;
        Ok(slot
            .node
            .children
            .iter()
            .filter_map(|child| arena.get(*child).map(|slot| slot.node.clone()))
            .collect())
    }

    /// Absolute path of a node, e.g. `/shelf/b-1`.
    pub fn path_of(&self, id: NodeId) -> Result<String, CoreError> {
        self.state
            .read()
            .path_of(id)
            .ok_or(CoreError::NodeNotFound { id })
    }

    /// Walk `path` from the root, expanding each level on the way.
    pub async fn resolve(&self, path: &str) -> Result<NodeId, CoreError> {
        let mut current = self.root();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            self.expand(current)?.wait().await?;
            let next = self.state.read().child_named(current, segment);
            current = next.ok_or_else(|| CoreError::PathNotFound {
                path: path.to_owned(),
            })?;
        }
        Ok(current)
    }

    // ── Expansion ────────────────────────────────────────────────────

    /// Request a node's children.
    ///
    /// A loaded node resolves immediately; a pending one is joined rather
    /// than queued again. Leaves load at once with no children.
    pub fn expand(&self, id: NodeId) -> Result<Expansion, CoreError> {
        self.schedule(id, false)
    }

    /// Drop a node's subtree and fetch its children afresh. Joins an
    /// expansion that is already pending.
    pub fn reload(&self, id: NodeId) -> Result<Expansion, CoreError> {
        self.schedule(id, true)
    }

    /// Reload the whole tree, restarting the queue first if it was
    /// cancelled.
    pub fn reload_all(&self) -> Result<Expansion, CoreError> {
        self.restart();
        self.reload(self.root())
    }

    fn schedule(&self, id: NodeId, reload: bool) -> Result<Expansion, CoreError> {
        let queue = self.queue();
        let mut arena = self.state.write();
        let slot = arena.get_mut(id).ok_or(CoreError::NodeNotFound { id })?;

        if !slot.node.is_container() {
            slot.node.status = LoadStatus::Loaded;
            return Ok(Expansion::ready(id));
        }
        match slot.node.status {
            LoadStatus::Pending if slot.generation == queue.generation() => {
                debug!(node = %id, "joining pending expansion");
                let (tx, rx) = oneshot::channel();
                slot.waiters.push(tx);
                return Ok(Expansion::waiting(id, rx));
            }
            LoadStatus::Loaded if !reload => return Ok(Expansion::ready(id)),
            _ => {}
        }
        if queue.is_closed() {
            return Err(CoreError::QueueClosed);
        }

        let detached = if reload {
            arena.detach_children(id)
        } else {
            Vec::new()
        };
        let slot = arena.get_mut(id).ok_or(CoreError::NodeNotFound { id })?;
        let (tx, rx) = oneshot::channel();
        slot.node.status = LoadStatus::Pending;
        slot.generation = queue.generation();
        slot.waiters.push(tx);

        if let Err(err) = queue.submit(id) {
            slot.node.status = LoadStatus::NotLoaded;
            slot.notify(&Err(err.clone()));
            return Err(err);
        }
        debug!(node = %id, reload, detached = detached.len(), "expansion queued");

        for mut gone in detached {
            let gone_id = gone.node.id;
            gone.notify(&Err(CoreError::NodeDetached { id: gone_id }));
        }
        Ok(Expansion::waiting(id, rx))
    }

    // ── Queue control ────────────────────────────────────────────────

    /// Stop the load queue. The in-flight expansion completes; queued
    /// requests are dropped and their nodes return to `NotLoaded`. Further
    /// expansions fail with [`CoreError::QueueClosed`] until
    /// [`restart`](Self::restart).
    pub fn cancel(&self) {
        self.queue().cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.queue().is_closed()
    }

    /// Replace a cancelled queue with a fresh worker. No-op while the
    /// current queue is open.
    pub fn restart(&self) {
        let mut queue = self.queue();
        if !queue.is_closed() && queue.is_running() {
            return;
        }
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        *queue = LoadQueue::spawn(Arc::clone(&self.state), generation);
        debug!(generation, "load queue restarted");
    }

    // ── Notifications ────────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.state.subscribe()
    }

    // ── Detail ───────────────────────────────────────────────────────

    /// Full record behind a node.
    ///
    /// Titles cost one extra request (`audiobooks/{id}`) on first access;
    /// concurrent callers share it and the result is kept for the node's
    /// lifetime. A failed fetch is not cached. Other records return the
    /// summary they were listed with.
    ///
    /// Unlike expansions, the fetch runs on the caller's task rather than
    /// the load queue worker, so it is neither ordered behind queued
    /// expansions nor stopped by [`cancel`](Self::cancel).
    pub async fn detail(&self, id: NodeId) -> Result<Arc<Value>, CoreError> {
        let (cell, item) = {
            let arena = self.state.read();
            let slot = arena.get(id).ok_or(CoreError::NodeNotFound { id })?;
            (Arc::clone(&slot.detail), slot.node.payload.clone())
        };
        let item = item.ok_or(CoreError::NoRecord { id })?;
        if item.kind != ItemKind::Product {
            return Ok(Arc::new(item.raw.clone()));
        }

        let client = &self.state.client;
        let record = cell
            .get_or_try_init(|| async {
                debug!(node = %id, title = %item.id, "fetching title detail");
                let raw = client.audiobook(&item.id).await?;
                Ok::<_, CoreError>(Arc::new(raw))
            })
            .await?;
        Ok(Arc::clone(record))
    }
}

// ── Expansion handle ─────────────────────────────────────────────────

#[derive(Debug)]
enum Pending {
    Ready,
    Waiting(oneshot::Receiver<Result<(), CoreError>>),
}

/// Completion handle for one expansion request.
///
/// Dropping it does not cancel the expansion.
#[derive(Debug)]
pub struct Expansion {
    node: NodeId,
    pending: Pending,
}

impl Expansion {
    fn ready(node: NodeId) -> Self {
        Self {
            node,
            pending: Pending::Ready,
        }
    }

    fn waiting(node: NodeId, rx: oneshot::Receiver<Result<(), CoreError>>) -> Self {
        Self {
            node,
            pending: Pending::Waiting(rx),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Whether the node was already loaded when requested.
    pub fn is_ready(&self) -> bool {
        matches!(self.pending, Pending::Ready)
    }

    /// Wait for the node's children to be published.
    pub async fn wait(self) -> Result<(), CoreError> {
        match self.pending {
            Pending::Ready => Ok(()),
            Pending::Waiting(rx) => rx.await.unwrap_or(Err(CoreError::QueueClosed)),
        }
    }
}
