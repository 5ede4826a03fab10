// Lazy, restartable traversal over a paginated collection.
//
// Pages are requested one at a time, only after the previous page's items
// have been consumed. The total advertised by the first page bounds the
// traversal; short pages are tolerated, an empty page before the total is
// reached ends it.

use async_stream::try_stream;
use futures_util::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::catalog::CollectionEndpoint;
use crate::client::CatalogClient;
use crate::error::Error;
use crate::models::Item;

/// A collection endpoint bound to a client and a page size.
#[derive(Clone)]
pub struct PaginatedCollection {
    client: CatalogClient,
    endpoint: CollectionEndpoint,
    page_size: u32,
    cancel: Option<CancellationToken>,
}

impl PaginatedCollection {
    pub fn new(client: CatalogClient, endpoint: CollectionEndpoint, page_size: u32) -> Self {
        Self {
            client,
            endpoint,
            page_size: page_size.max(1),
            cancel: None,
        }
    }

    /// Observe `cancel` between pages. A traversal that sees the token
    /// cancelled before fetching another page ends with
    /// [`Error::Cancelled`]; a page already requested is never abandoned.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn endpoint(&self) -> &CollectionEndpoint {
        &self.endpoint
    }

    /// Start a fresh traversal at page 1.
    ///
    /// Each call is independent; the stream borrows nothing from `self`.
    pub fn iterate(&self) -> impl Stream<Item = Result<Item, Error>> + Send + 'static {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let page_size = self.page_size;
        let cancel = self.cancel.clone();

        try_stream! {
            let mut page_no: u32 = 1;
            let mut page = client.collection_page(&endpoint, page_no, page_size).await?;
            let total = page.total;
            let mut yielded: u64 = 0;
            debug!(path = %endpoint.path, total, "collection traversal started");

            while yielded < total {
                if page.items.is_empty() {
                    warn!(
                        path = %endpoint.path,
                        page = page_no,
                        yielded,
                        total,
                        "empty page before advertised total, stopping"
                    );
                    break;
                }

                for item in std::mem::take(&mut page.items) {
                    yield item;
                    yielded += 1;
                    if yielded >= total {
                        break;
                    }
                }
                if yielded >= total {
                    break;
                }

                if cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                    debug!(path = %endpoint.path, page = page_no, "traversal cancelled between pages");
                    Err::<(), Error>(Error::Cancelled)?;
                }

                page_no += 1;
                page = client.collection_page(&endpoint, page_no, page_size).await?;
            }
        }
    }
}
