//! Lazy catalog tree between `audtek-api` and its consumers.
//!
//! - **[`CatalogBrowser`]**: facade over the tree. [`expand()`](CatalogBrowser::expand)
//!   queues a node for loading and returns an [`Expansion`] handle;
//!   [`detail()`](CatalogBrowser::detail) fetches a title's full record once
//!   per node; [`subscribe()`](CatalogBrowser::subscribe) yields
//!   [`TreeEvent`]s as expansions are published.
//!
//! - **Tree model** ([`tree`]): [`VirtualPathNode`] snapshots addressed by
//!   [`NodeId`]. The root holds the fixed [`StaticCollection`]s; below them
//!   categories and titles expand on demand, tracks are leaves.
//!
//! - **Load queue**: one background worker per browser expands nodes in
//!   FIFO order. A node is never queued twice; cancellation lets the
//!   in-flight expansion finish and drops the rest.

pub mod browser;
pub mod config;
pub mod error;
pub mod event;
mod queue;
mod state;
pub mod tree;

// ── Primary re-exports ──────────────────────────────────────────────
pub use browser::{CatalogBrowser, Expansion};
pub use config::BrowserConfig;
pub use error::CoreError;
pub use event::TreeEvent;
pub use tree::{LoadStatus, NodeId, NodeKind, StaticCollection, VirtualPathNode};
