// ── Node arena ──
//
// Owns every node of one browser's tree, keyed by `NodeId`. Parents own
// their children through the `children` list; the back reference is a
// plain id. Callers hold the enclosing lock only for synchronous work.

use std::collections::HashMap;
use std::sync::Arc;

use audtek_api::Item;
use serde_json::Value;
use tokio::sync::{OnceCell, oneshot};

use super::node::{LoadStatus, NodeId, StaticCollection, VirtualPathNode};
use crate::error::CoreError;

pub(crate) type Waiter = oneshot::Sender<Result<(), CoreError>>;

/// A node plus the bookkeeping callers never see.
pub(crate) struct Slot {
    pub(crate) node: VirtualPathNode,
    /// Callers awaiting the pending expansion. Non-empty only while
    /// `node.status` is `Pending`.
    pub(crate) waiters: Vec<Waiter>,
    /// Load queue generation that owns the pending expansion.
    pub(crate) generation: u64,
    /// Full record of a title, fetched at most once per node.
    pub(crate) detail: Arc<OnceCell<Arc<Value>>>,
}

impl Slot {
    fn new(node: VirtualPathNode) -> Self {
        Self {
            node,
            waiters: Vec::new(),
            generation: 0,
            detail: Arc::new(OnceCell::new()),
        }
    }

    /// Complete the pending expansion for every waiter.
    pub(crate) fn notify(&mut self, result: &Result<(), CoreError>) {
        for waiter in self.waiters.drain(..) {
            // A waiter that dropped its handle no longer cares.
            let _ = waiter.send(result.clone());
        }
    }
}

pub(crate) struct Arena {
    slots: HashMap<NodeId, Slot>,
    root: NodeId,
    next_id: u64,
}

impl Arena {
    pub(crate) fn new() -> Self {
        let root = NodeId(0);
        let mut slots = HashMap::new();
        slots.insert(root, Slot::new(VirtualPathNode::root(root)));
        Self {
            slots,
            root,
            next_id: 1,
        }
    }

    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Slot> {
        self.slots.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Slot> {
        self.slots.get_mut(&id)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Attach the fixed containers under `parent`.
    pub(crate) fn insert_containers(
        &mut self,
        parent: NodeId,
        collections: impl IntoIterator<Item = StaticCollection>,
    ) -> Vec<NodeId> {
        collections
            .into_iter()
            .map(|collection| {
                let id = self.allocate();
                self.slots
                    .insert(id, Slot::new(VirtualPathNode::container(id, parent, collection)));
                id
            })
            .collect()
    }

    /// Attach one node per item under `parent`, preserving order. A record
    /// whose id repeats an earlier sibling is skipped so paths stay unique.
    pub(crate) fn insert_items(&mut self, parent: NodeId, items: Vec<Item>) -> Vec<NodeId> {
        let mut seen = std::collections::HashSet::new();
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            if !seen.insert(item.id.clone()) {
                tracing::warn!(parent = %parent, id = %item.id, "duplicate record in collection, skipping");
                continue;
            }
            let id = self.allocate();
            self.slots
                .insert(id, Slot::new(VirtualPathNode::item(id, parent, item)));
            ids.push(id);
        }
        ids
    }

    /// Remove every descendant of `id`, leaving `id` itself with no
    /// children. Returns the removed slots so their waiters can be told.
    pub(crate) fn detach_children(&mut self, id: NodeId) -> Vec<Slot> {
        let Some(slot) = self.slots.get_mut(&id) else {
            return Vec::new();
        };
        let mut stack = std::mem::take(&mut slot.node.children);
        let mut removed = Vec::new();
        while let Some(child) = stack.pop() {
            if let Some(mut slot) = self.slots.remove(&child) {
                stack.append(&mut slot.node.children);
                removed.push(slot);
            }
        }
        removed
    }

    /// Slash-separated path from the root, e.g. `/shelf/b-1`.
    pub(crate) fn path_of(&self, id: NodeId) -> Option<String> {
        let mut segments = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let slot = self.slots.get(&current)?;
            if slot.node.parent.is_some() {
                segments.push(slot.node.path.as_str());
            }
            cursor = slot.node.parent;
        }
        segments.reverse();
        Some(format!("/{}", segments.join("/")))
    }

    /// Child of `parent` with path segment `segment`, if loaded.
    pub(crate) fn child_named(&self, parent: NodeId, segment: &str) -> Option<NodeId> {
        self.slots.get(&parent)?.node.children.iter().copied().find(|child| {
            self.slots
                .get(child)
                .is_some_and(|slot| slot.node.path == segment)
        })
    }

    /// Put a node left pending by queue `generation` back to `NotLoaded`,
    /// failing its waiters with `error`. A node since handed to a newer
    /// queue is left alone.
    pub(crate) fn reset_pending(&mut self, id: NodeId, generation: u64, error: &CoreError) -> bool {
        let Some(slot) = self.slots.get_mut(&id) else {
            return false;
        };
        if slot.node.status != LoadStatus::Pending || slot.generation != generation {
            return false;
        }
        slot.node.status = LoadStatus::NotLoaded;
        slot.notify(&Err(error.clone()));
        true
    }
}
