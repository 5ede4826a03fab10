// Catalog payload models
//
// The service speaks HAL-flavoured JSON: collection pages carry a `total`
// and an `_embedded` map keyed by relation (`app:product`, `app:category`,
// `app:track`); records carry `_links` to their sub-resources. Only the
// fields the browser relies on are typed; the full record is kept as raw
// JSON for callers that need more.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::Session;
use crate::error::Error;

/// Embedded relation names used by the catalog.
pub mod rel {
    pub const CATEGORY: &str = "app:category";
    pub const PRODUCT: &str = "app:product";
    pub const TRACK: &str = "app:track";
    pub const PRODUCTS: &str = "app:products";
    pub const TRACKS: &str = "app:tracks";
    pub const SELF: &str = "self";
}

/// What a catalog record represents, derived from its embedding relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Category,
    Product,
    Track,
    Other,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Category => "category",
            Self::Product => "title",
            Self::Track => "track",
            Self::Other => "item",
        })
    }
}

impl ItemKind {
    pub fn from_rel(rel: &str) -> Self {
        match rel {
            rel::CATEGORY => Self::Category,
            rel::PRODUCT => Self::Product,
            rel::TRACK => Self::Track,
            _ => Self::Other,
        }
    }
}

/// One catalog record as yielded by a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    /// HAL links: relation → href.
    pub links: BTreeMap<String, String>,
    /// The record as received.
    pub raw: Value,
}

impl Item {
    /// Parse a record embedded under relation `rel`.
    ///
    /// `id` may be a string or a number; `name` falls back to `title`.
    pub fn from_value(rel: &str, raw: Value) -> Result<Self, Error> {
        let id = match raw.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(Error::validation(format!("{rel} record without an id"))),
        };
        let name = raw
            .get("name")
            .or_else(|| raw.get("title"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::validation(format!("{rel} record {id} without a name")))?
            .to_owned();

        let links = raw
            .get("_links")
            .and_then(Value::as_object)
            .map(|links| {
                links
                    .iter()
                    .filter_map(|(rel, link)| {
                        link.get("href")
                            .and_then(Value::as_str)
                            .map(|href| (rel.clone(), href.to_owned()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            id,
            name,
            kind: ItemKind::from_rel(rel),
            links,
            raw,
        })
    }

    pub fn link(&self, rel: &str) -> Option<&str> {
        self.links.get(rel).map(String::as_str)
    }
}

/// One page of a collection.
#[derive(Debug, Clone)]
pub struct CollectionPage {
    pub items: Vec<Item>,
    pub total: u64,
}

impl CollectionPage {
    /// Parse a HAL page, taking items from `_embedded[rel]`.
    ///
    /// `total` may arrive as a number or a numeric string. A page without
    /// an `_embedded` entry for `rel` is an empty page.
    pub fn from_value(rel: &str, mut raw: Value) -> Result<Self, Error> {
        let total = match raw.get("total") {
            Some(Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| Error::validation(format!("invalid total: {n}")))?,
            Some(Value::String(s)) => s
                .parse()
                .map_err(|_| Error::validation(format!("invalid total: {s:?}")))?,
            _ => return Err(Error::validation("collection page without a total")),
        };

        let records = match raw
            .get_mut("_embedded")
            .and_then(|embedded| embedded.get_mut(rel))
            .map(Value::take)
        {
            Some(Value::Array(records)) => records,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err(Error::validation(format!("_embedded.{rel} is not a list"))),
        };

        let items = records
            .into_iter()
            .map(|record| Item::from_value(rel, record))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { items, total })
    }
}

/// Response to the `authenticate` and `refresh-token` commands.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl AuthResponse {
    pub(crate) fn into_session(self, device_id: &str) -> Session {
        Session {
            token: self.token,
            refresh_id: self.refresh_token,
            device_id: device_id.to_owned(),
            expires_at: self.expires_at,
        }
    }
}
