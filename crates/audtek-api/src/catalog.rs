// Catalog endpoints
//
// Typed wrappers over the generic client: collection pages, single
// records, and HAL sub-resources. Collections are described by a
// `CollectionEndpoint` so the paginator can drive any of them.

use serde_json::Value;
use tracing::debug;

use crate::client::CatalogClient;
use crate::error::Error;
use crate::models::{CollectionPage, rel};
use crate::pagination::PaginatedCollection;

/// Default number of items requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// A paginated collection: where it lives and under which `_embedded`
/// relation its records arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionEndpoint {
    /// Relative path or absolute href.
    pub path: String,
    /// `_embedded` key holding the records.
    pub rel: &'static str,
    /// Extra query parameters (sort, order, filters).
    pub params: Vec<(&'static str, String)>,
}

impl CollectionEndpoint {
    pub fn new(path: impl Into<String>, rel: &'static str) -> Self {
        Self {
            path: path.into(),
            rel,
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.params.push((key, value.into()));
        self
    }

    /// Titles on the account's shelf.
    pub fn shelf() -> Self {
        Self::new("me/shelf", rel::PRODUCT)
            .param("sort", "added_at")
            .param("order", "desc")
    }

    /// Titles marked as favourite.
    pub fn favourites() -> Self {
        Self::new("me/favourites", rel::PRODUCT)
    }

    /// Top-level categories.
    pub fn categories() -> Self {
        Self::new("categories", rel::CATEGORY)
    }

    /// Titles within a category.
    pub fn category_products(category_id: &str) -> Self {
        Self::new(format!("categories/{category_id}/products"), rel::PRODUCT)
    }

    /// Tracks of a title.
    pub fn audiobook_tracks(audiobook_id: &str) -> Self {
        Self::new(format!("audiobooks/{audiobook_id}/tracks"), rel::TRACK)
    }
}

impl CatalogClient {
    /// Fetch one page (1-based) of a collection.
    ///
    /// `GET {endpoint.path}?page={page}&limit={limit}&{endpoint.params}`
    pub async fn collection_page(
        &self,
        endpoint: &CollectionEndpoint,
        page: u32,
        limit: u32,
    ) -> Result<CollectionPage, Error> {
        let mut query: Vec<(&str, String)> =
            vec![("page", page.to_string()), ("limit", limit.to_string())];
        query.extend(endpoint.params.iter().cloned());

        debug!(path = %endpoint.path, page, limit, "fetching collection page");
        let raw: Value = self.get_json(&endpoint.path, &query).await?;
        CollectionPage::from_value(endpoint.rel, raw)
    }

    /// Lazy traversal over every item of a collection.
    pub fn collection(&self, endpoint: CollectionEndpoint, page_size: u32) -> PaginatedCollection {
        PaginatedCollection::new(self.clone(), endpoint, page_size)
    }

    /// Fetch a full record by relative path.
    pub async fn get_item(&self, path: &str) -> Result<Value, Error> {
        self.get_json(path, &[]).await
    }

    /// Follow a HAL link to a sub-resource.
    pub async fn get_link(&self, href: &str) -> Result<Value, Error> {
        debug!(href, "following link");
        self.get_json(href, &[]).await
    }

    /// `GET audiobooks/{id}`: the full record of a title.
    pub async fn audiobook(&self, id: &str) -> Result<Value, Error> {
        self.get_item(&format!("audiobooks/{id}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_carry_relation_and_params() {
        let shelf = CollectionEndpoint::shelf();
        assert_eq!(shelf.path, "me/shelf");
        assert_eq!(shelf.rel, rel::PRODUCT);
        assert!(shelf.params.iter().any(|(k, v)| *k == "order" && v == "desc"));

        let tracks = CollectionEndpoint::audiobook_tracks("b-1");
        assert_eq!(tracks.path, "audiobooks/b-1/tracks");
        assert_eq!(tracks.rel, rel::TRACK);
    }
}
