// Authenticated catalog client
//
// Wraps the transport and the session manager. Every request carries the
// current session's headers; an authorization failure triggers exactly one
// recovery (refresh or login) and one re-issue. The bound is structural:
// the retry is a second straight-line send, not a loop.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::auth::{Credentials, SessionPersistence};
use crate::error::Error;
use crate::session::SessionManager;
use crate::transport::{RawResponse, Transport, TransportConfig};

/// Default catalog endpoint.
pub const DEFAULT_BASE_URL: &str = "https://audioteka.com/pl/api/v2/";

/// Body-level status markers the service returns in place of an HTTP code.
pub(crate) const LOGIN_FAILED: &str = "login_failed";
const ITEM_NOT_FOUND: &str = "item_not_found";

/// Async client for the catalog API. Cheap to clone; clones share the
/// session.
#[derive(Clone)]
pub struct CatalogClient {
    transport: Transport,
    base_url: Url,
    session: Arc<SessionManager>,
}

impl CatalogClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client for `base_url` with fresh transport.
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        Self::from_transport(base_url, Transport::new(transport)?, credentials, None)
    }

    /// Build a client that restores and persists its session through
    /// `persistence`.
    pub fn with_persistence(
        base_url: &str,
        credentials: Credentials,
        transport: &TransportConfig,
        persistence: Arc<dyn SessionPersistence>,
    ) -> Result<Self, Error> {
        Self::from_transport(
            base_url,
            Transport::new(transport)?,
            credentials,
            Some(persistence),
        )
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        credentials: Credentials,
    ) -> Result<Self, Error> {
        Self::from_transport(base_url, Transport::with_client(http), credentials, None)
    }

    fn from_transport(
        base_url: &str,
        transport: Transport,
        credentials: Credentials,
        persistence: Option<Arc<dyn SessionPersistence>>,
    ) -> Result<Self, Error> {
        let base_url = normalize_base_url(base_url)?;
        let mut manager = SessionManager::new(transport.clone(), base_url.clone(), credentials);
        if let Some(persistence) = persistence {
            manager = manager.with_persistence(persistence);
        }
        Ok(Self {
            transport,
            base_url,
            session: Arc::new(manager),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The session manager shared by all clones of this client.
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Resolve a relative path or an absolute HAL href against the base URL.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Issue a request, recovering once from an authorization failure.
    ///
    /// Returns the successful response; 404 surfaces as
    /// [`Error::NotFound`], other failures as [`Error::Api`], and a request
    /// still unauthorized after recovery as [`Error::Authentication`].
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<RawResponse, Error> {
        let url = self.url(path)?;

        // A session known to be past its expiry is recovered up front
        // instead of spending a request on a guaranteed 401.
        // That counts as the request's one recovery.
        let sent_with = self.session.current();
        if sent_with.as_deref().is_some_and(crate::auth::Session::is_expired) {
            debug!("session expired, refreshing before request");
            self.session.recover(sent_with.as_deref()).await?;
            let resp = self.send_once(method, url, query, body).await?;
            return finish(resp, path);
        }

        let first = self
            .send_once(method.clone(), url.clone(), query, body)
            .await?;
        if !is_unauthorized(&first) {
            return classify(first, path);
        }

        debug!(path, "unauthorized, recovering session");
        self.session.recover(sent_with.as_deref()).await?;

        let retried = self.send_once(method, url, query, body).await?;
        finish(retried, path)
    }

    async fn send_once(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<RawResponse, Error> {
        self.transport
            .send(method, url, self.session.headers(), query, body)
            .await
    }

    /// GET and decode JSON.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        let resp = self.request(Method::GET, path, query, None).await?;
        decode(resp)
    }

    /// POST a JSON body and decode the JSON response.
    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, Error> {
        let resp = self.request(Method::POST, path, &[], Some(body)).await?;
        decode(resp)
    }
}

/// Base URLs must end in `/` so relative endpoint paths join beneath them.
fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Body-level marker, if the body is exactly a JSON string.
pub(crate) fn body_marker(resp: &RawResponse) -> Option<String> {
    match serde_json::from_str::<Value>(&resp.body) {
        Ok(Value::String(marker)) => Some(marker),
        _ => None,
    }
}

fn is_unauthorized(resp: &RawResponse) -> bool {
    resp.status == StatusCode::UNAUTHORIZED || body_marker(resp).as_deref() == Some(LOGIN_FAILED)
}

/// Classify the response to a request sent after recovery; no further
/// recovery is attempted.
fn finish(resp: RawResponse, path: &str) -> Result<RawResponse, Error> {
    if is_unauthorized(&resp) {
        warn!(path, "still unauthorized after session recovery");
        return Err(Error::Authentication {
            message: format!("{path} rejected after re-authentication"),
        });
    }
    classify(resp, path)
}

fn classify(resp: RawResponse, path: &str) -> Result<RawResponse, Error> {
    if resp.status == StatusCode::NOT_FOUND
        || body_marker(&resp).as_deref() == Some(ITEM_NOT_FOUND)
    {
        return Err(Error::NotFound {
            resource: path.to_owned(),
        });
    }
    if !resp.status.is_success() {
        return Err(Error::Api {
            status: resp.status.as_u16(),
            message: resp.preview().to_owned(),
        });
    }
    Ok(resp)
}

fn decode<T: DeserializeOwned>(resp: RawResponse) -> Result<T, Error> {
    let parsed = serde_json::from_str(&resp.body);
    parsed.map_err(|e| {
        let preview = resp.preview().to_owned();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: resp.body,
        }
    })
}
