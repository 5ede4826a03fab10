// ── Shared tree state ──
//
// Everything the browser facade and the load queue worker both touch:
// the node arena, the catalog client, and the event channel. The arena
// lock is a plain `RwLock` and is never held across an await.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use audtek_api::{CatalogClient, Item};
use strum::IntoEnumIterator;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::event::TreeEvent;
use crate::tree::arena::Arena;
use crate::tree::{LoadStatus, NodeId, StaticCollection};

/// Result of one expansion, before it is attached to the tree.
pub(crate) enum Fetched {
    /// The root's fixed containers.
    Containers,
    Items(Vec<Item>),
}

pub(crate) struct TreeState {
    arena: RwLock<Arena>,
    pub(crate) client: CatalogClient,
    pub(crate) page_size: u32,
    events: broadcast::Sender<TreeEvent>,
}

impl TreeState {
    pub(crate) fn new(client: CatalogClient, page_size: u32, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            arena: RwLock::new(Arena::new()),
            client,
            page_size: page_size.max(1),
            events,
        }
    }

    // Arena mutations never panic part-way, so a poisoned lock is reused.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Arena> {
        self.arena.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Arena> {
        self.arena.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.events.subscribe()
    }

    /// Attach an expansion result to its node, notify subscribers, then
    /// wake the node's waiters. A node removed while its fetch was in
    /// flight is ignored; its waiters were already told. So is a result
    /// fetched for an earlier request generation: after a cancel and
    /// restart the node belongs to the new queue.
    pub(crate) fn publish(&self, id: NodeId, generation: u64, outcome: Result<Fetched, CoreError>) {
        let (event, waiters, result) = {
            let mut arena = self.write();
            match arena.get(id) {
                Some(slot)
                    if slot.node.status == LoadStatus::Pending && slot.generation == generation => {}
                Some(_) => {
                    debug!(node = %id, generation, "stale expansion result, dropping");
                    return;
                }
                None => {
                    debug!(node = %id, "node detached during expansion, dropping result");
                    return;
                }
            }

            match outcome {
                Ok(fetched) => {
                    let children = match fetched {
                        Fetched::Containers => {
                            arena.insert_containers(id, StaticCollection::iter())
                        }
                        Fetched::Items(items) => arena.insert_items(id, items),
                    };
                    let Some(slot) = arena.get_mut(id) else {
                        return;
                    };
                    slot.node.children.clone_from(&children);
                    slot.node.status = LoadStatus::Loaded;
                    debug!(node = %id, children = children.len(), "expansion published");
                    (
                        Some(TreeEvent::ChildrenChanged { node: id, children }),
                        std::mem::take(&mut slot.waiters),
                        Ok(()),
                    )
                }
                Err(reason) => {
                    let Some(slot) = arena.get_mut(id) else {
                        return;
                    };
                    slot.node.status = LoadStatus::NotLoaded;
                    let event = if reason == CoreError::Cancelled {
                        debug!(node = %id, "expansion cancelled between pages");
                        None
                    } else {
                        warn!(node = %id, error = %reason, "expansion failed");
                        Some(TreeEvent::ExpansionFailed {
                            node: id,
                            reason: reason.clone(),
                        })
                    };
                    (event, std::mem::take(&mut slot.waiters), Err(reason))
                }
            }
        };

        if let Some(event) = event {
            // No subscribers is not an error.
            let _ = self.events.send(event);
        }
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }

    /// Drop a request the worker will never process.
    pub(crate) fn abandon(&self, id: NodeId, generation: u64) -> bool {
        self.write().reset_pending(id, generation, &CoreError::Cancelled)
    }
}
