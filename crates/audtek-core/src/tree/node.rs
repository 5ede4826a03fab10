// ── Virtual path nodes ──
//
// A node is a position in the browsable tree: the root, one of the fixed
// top-level collections, or a catalog record. Nodes refer to their parent
// and children by `NodeId`; the arena owns them all.

use std::fmt;
use std::sync::Arc;

use audtek_api::{CollectionEndpoint, Item, ItemKind, rel};
use serde::Serialize;
use strum::{AsRefStr, EnumIter, EnumString, IntoStaticStr};

/// Arena handle for a node. Never reused within one browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The fixed collections shown directly under the root.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, IntoStaticStr, EnumIter, EnumString, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StaticCollection {
    Shelf,
    Favourites,
    Categories,
}

impl StaticCollection {
    /// Path segment of this container.
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn endpoint(self) -> CollectionEndpoint {
        match self {
            Self::Shelf => CollectionEndpoint::shelf(),
            Self::Favourites => CollectionEndpoint::favourites(),
            Self::Categories => CollectionEndpoint::categories(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "collection", rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    StaticContainer(StaticCollection),
    DynamicItem,
}

/// Caller-visible load state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    NotLoaded,
    /// Queued or in flight.
    Pending,
    Loaded,
}

/// Where a node's children come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChildSource {
    /// The root's fixed containers; no fetch needed.
    Static,
    Collection(CollectionEndpoint),
    /// A leaf: expands to nothing without a fetch.
    None,
}

/// Snapshot of one tree position.
#[derive(Debug, Clone, Serialize)]
pub struct VirtualPathNode {
    pub id: NodeId,
    /// Segment under the parent: the container name or the record id.
    pub path: String,
    /// Human-readable label.
    pub name: String,
    pub kind: NodeKind,
    #[serde(skip)]
    pub payload: Option<Arc<Item>>,
    pub parent: Option<NodeId>,
    /// Ordered as the service returned them. Empty until loaded.
    pub children: Vec<NodeId>,
    pub status: LoadStatus,
}

impl VirtualPathNode {
    pub(crate) fn root(id: NodeId) -> Self {
        Self {
            id,
            path: String::new(),
            name: "audioteka".into(),
            kind: NodeKind::Root,
            payload: None,
            parent: None,
            children: Vec::new(),
            status: LoadStatus::NotLoaded,
        }
    }

    pub(crate) fn container(id: NodeId, parent: NodeId, collection: StaticCollection) -> Self {
        Self {
            id,
            path: collection.name().into(),
            name: collection.name().into(),
            kind: NodeKind::StaticContainer(collection),
            payload: None,
            parent: Some(parent),
            children: Vec::new(),
            status: LoadStatus::NotLoaded,
        }
    }

    pub(crate) fn item(id: NodeId, parent: NodeId, item: Item) -> Self {
        Self {
            id,
            path: item.id.clone(),
            name: item.name.clone(),
            kind: NodeKind::DynamicItem,
            payload: Some(Arc::new(item)),
            parent: Some(parent),
            children: Vec::new(),
            status: LoadStatus::NotLoaded,
        }
    }

    /// Kind of the catalog record behind a dynamic item.
    pub fn item_kind(&self) -> Option<ItemKind> {
        self.payload.as_ref().map(|item| item.kind)
    }

    pub fn is_loaded(&self) -> bool {
        self.status == LoadStatus::Loaded
    }

    /// Whether this node can have children. Categories and titles are
    /// browsable; tracks and unrecognised records are leaves.
    pub fn is_container(&self) -> bool {
        match self.kind {
            NodeKind::Root | NodeKind::StaticContainer(_) => true,
            NodeKind::DynamicItem => matches!(
                self.item_kind(),
                Some(ItemKind::Category | ItemKind::Product)
            ),
        }
    }

    pub(crate) fn child_source(&self) -> ChildSource {
        match (self.kind, self.payload.as_deref()) {
            (NodeKind::Root, _) => ChildSource::Static,
            (NodeKind::StaticContainer(collection), _) => {
                ChildSource::Collection(collection.endpoint())
            }
            (NodeKind::DynamicItem, Some(item)) => match item.kind {
                ItemKind::Category => ChildSource::Collection(
                    item.link(rel::PRODUCTS).map_or_else(
                        || CollectionEndpoint::category_products(&item.id),
                        |href| CollectionEndpoint::new(href, rel::PRODUCT),
                    ),
                ),
                ItemKind::Product => ChildSource::Collection(
                    item.link(rel::TRACKS).map_or_else(
                        || CollectionEndpoint::audiobook_tracks(&item.id),
                        |href| CollectionEndpoint::new(href, rel::TRACK),
                    ),
                ),
                ItemKind::Track | ItemKind::Other => ChildSource::None,
            },
            (NodeKind::DynamicItem, None) => ChildSource::None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use serde_json::json;
    use strum::IntoEnumIterator;

    fn item(rel: &str, raw: serde_json::Value) -> Item {
        Item::from_value(rel, raw).unwrap()
    }

    #[test]
    fn static_collections_round_trip_through_their_names() {
        let names: Vec<&str> = StaticCollection::iter().map(StaticCollection::name).collect();
        assert_eq!(names, ["shelf", "favourites", "categories"]);
        for collection in StaticCollection::iter() {
            assert_eq!(collection.as_ref(), collection.name());
            assert_eq!(StaticCollection::from_str(collection.name()).unwrap(), collection);
        }
    }

    #[test]
    fn containers_and_leaves() {
        let root = VirtualPathNode::root(NodeId(0));
        assert!(root.is_container());
        assert_eq!(root.child_source(), ChildSource::Static);

        let title = VirtualPathNode::item(
            NodeId(1),
            NodeId(0),
            item(rel::PRODUCT, json!({ "id": "b-1", "name": "Solaris" })),
        );
        assert!(title.is_container());
        assert_eq!(title.path, "b-1");
        assert_eq!(
            title.child_source(),
            ChildSource::Collection(CollectionEndpoint::audiobook_tracks("b-1"))
        );

        let track = VirtualPathNode::item(
            NodeId(2),
            NodeId(1),
            item(rel::TRACK, json!({ "id": 3, "title": "Rozdział 1" })),
        );
        assert!(!track.is_container());
        assert_eq!(track.child_source(), ChildSource::None);
    }

    #[test]
    fn hal_link_takes_precedence_over_conventional_path() {
        let category = VirtualPathNode::item(
            NodeId(1),
            NodeId(0),
            item(
                rel::CATEGORY,
                json!({
                    "id": "c-7",
                    "name": "Fantastyka",
                    "_links": { "app:products": { "href": "https://x/categories/c-7/products?x=1" } }
                }),
            ),
        );
        match category.child_source() {
            ChildSource::Collection(endpoint) => {
                assert_eq!(endpoint.path, "https://x/categories/c-7/products?x=1");
                assert_eq!(endpoint.rel, rel::PRODUCT);
            }
            other => panic!("expected a collection, got {other:?}"),
        }
    }
}
