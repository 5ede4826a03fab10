// Tree model: nodes and the arena that owns them.

pub(crate) mod arena;
mod node;

pub(crate) use node::ChildSource;
pub use node::{LoadStatus, NodeId, NodeKind, StaticCollection, VirtualPathNode};
