// audtek-api: Async Rust client for the Audioteka audiobook catalog API

pub mod auth;
pub mod catalog;
pub mod client;
pub mod error;
pub mod models;
pub mod pagination;
pub mod session;
pub mod transport;

pub use auth::{Credentials, Session, SessionPersistence};
pub use catalog::{CollectionEndpoint, DEFAULT_PAGE_SIZE};
pub use client::{CatalogClient, DEFAULT_BASE_URL};
pub use error::Error;
pub use models::{CollectionPage, Item, ItemKind, rel};
pub use pagination::PaginatedCollection;
pub use session::SessionManager;
pub use transport::{RawResponse, TlsMode, Transport, TransportConfig};
