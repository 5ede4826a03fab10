use audtek_api::DEFAULT_PAGE_SIZE;

use crate::event::EVENT_CHANNEL_SIZE;

/// Tuning for a [`CatalogBrowser`](crate::CatalogBrowser).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserConfig {
    /// Items requested per collection page.
    pub page_size: u32,
    /// Capacity of the tree event broadcast channel.
    pub event_capacity: usize,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            event_capacity: EVENT_CHANNEL_SIZE,
        }
    }
}
