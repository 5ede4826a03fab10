// ── Tree notifications ──
//
// Broadcast to every subscriber after the worker publishes an expansion.
// Subscribers that lag behind lose the oldest events; the tree itself is
// always the source of truth.

use crate::error::CoreError;
use crate::tree::NodeId;

/// Default broadcast buffer for tree events.
pub const EVENT_CHANNEL_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    /// A node finished loading; `children` is its complete new child list.
    ChildrenChanged { node: NodeId, children: Vec<NodeId> },
    /// An expansion attempt failed. The node is back to `NotLoaded` with no
    /// children and may be expanded again.
    ExpansionFailed { node: NodeId, reason: CoreError },
}

impl TreeEvent {
    pub fn node(&self) -> NodeId {
        match self {
            Self::ChildrenChanged { node, .. } | Self::ExpansionFailed { node, .. } => *node,
        }
    }
}
