// Session lifecycle
//
// Owns the one mutable piece of process-wide state: the current session.
// Reads are lock-free through `ArcSwapOption`; login and refresh are
// serialized behind a single async mutex so two concurrent 401 recoveries
// cannot race to overwrite each other's session.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use reqwest::Method;
use reqwest::header::HeaderMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{self, Credentials, Session, SessionPersistence};
use crate::client::{LOGIN_FAILED, body_marker};
use crate::error::Error;
use crate::models::AuthResponse;
use crate::transport::{RawResponse, Transport};

const AUTHENTICATE_PATH: &str = "commands/authenticate";
const REFRESH_PATH: &str = "commands/refresh-token";

/// Authentication state for one catalog account.
pub struct SessionManager {
    transport: Transport,
    base_url: Url,
    credentials: Credentials,
    session: ArcSwapOption<Session>,
    /// Held for the whole of a login or refresh.
    recovery: Mutex<()>,
    persistence: Option<Arc<dyn SessionPersistence>>,
}

impl SessionManager {
    /// Create an unauthenticated manager. No network traffic happens until
    /// the first login or recovery.
    pub fn new(transport: Transport, base_url: Url, credentials: Credentials) -> Self {
        Self {
            transport,
            base_url,
            credentials,
            session: ArcSwapOption::empty(),
            recovery: Mutex::new(()),
            persistence: None,
        }
    }

    /// Attach a persistence backend and adopt the session it holds, if any.
    ///
    /// A stored session for a different device id is ignored.
    pub fn with_persistence(mut self, persistence: Arc<dyn SessionPersistence>) -> Self {
        match persistence.load() {
            Some(session) if session.device_id == self.credentials.device_id => {
                debug!(expires_at = %session.expires_at, "restored persisted session");
                self.session.store(Some(Arc::new(session)));
            }
            Some(_) => warn!("persisted session belongs to another device, ignoring"),
            None => debug!("no persisted session"),
        }
        self.persistence = Some(persistence);
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The current session, if authenticated.
    pub fn current(&self) -> Option<Arc<Session>> {
        self.session.load_full()
    }

    /// Headers for the current session (anonymous when absent).
    pub fn headers(&self) -> HeaderMap {
        auth::headers(self.session.load().as_deref())
    }

    /// Adopt an externally restored session.
    pub fn restore(&self, session: Session) {
        self.session.store(Some(Arc::new(session)));
    }

    /// Drop the session (logout / teardown) and forget any persisted copy.
    pub fn clear(&self) {
        self.session.store(None);
        if let Some(persistence) = &self.persistence {
            persistence.clear();
        }
        debug!("session cleared");
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Authenticate with the account credentials.
    ///
    /// `POST commands/authenticate`. Rejections are not retried.
    pub async fn login(&self) -> Result<Session, Error> {
        let _guard = self.recovery.lock().await;
        self.login_locked().await
    }

    /// Exchange a session's refresh id for a new session.
    ///
    /// `POST commands/refresh-token`. A rejected refresh (for example a
    /// revoked refresh id) surfaces as [`Error::Authentication`]; the caller
    /// is expected to fall back to [`login`](Self::login).
    pub async fn refresh(&self, session: &Session) -> Result<Session, Error> {
        let _guard = self.recovery.lock().await;
        self.refresh_locked(session).await
    }

    /// One recovery step after an authorization failure: refresh when a
    /// session exists, otherwise (or if the refresh is rejected) log in.
    ///
    /// `stale` is the session the failed request was sent with. If another
    /// task replaced it while this one waited for the lock, the newer
    /// session is returned without touching the network.
    pub async fn recover(&self, stale: Option<&Session>) -> Result<Session, Error> {
        let _guard = self.recovery.lock().await;

        let current = self.current();
        if let Some(current) = current.as_deref() {
            if stale != Some(current) && !current.is_expired() {
                debug!("session already replaced by a concurrent recovery");
                return Ok(current.clone());
            }
        }

        match current {
            Some(session) => match self.refresh_locked(&session).await {
                Ok(fresh) => Ok(fresh),
                Err(Error::Authentication { message }) => {
                    info!(reason = %message, "refresh rejected, logging in again");
                    self.login_locked().await
                }
                Err(e) => Err(e),
            },
            None => self.login_locked().await,
        }
    }

    // ── Internals (caller holds `recovery`) ─────────────────────────

    async fn login_locked(&self) -> Result<Session, Error> {
        debug!(email = %self.credentials.email, "logging in");
        let body = auth::authenticate_command(&self.credentials);
        let resp = self.send_command(AUTHENTICATE_PATH, &body).await?;
        let session = self.accept(resp, "login")?;
        info!(expires_at = %session.expires_at, "login successful");
        Ok(session)
    }

    async fn refresh_locked(&self, session: &Session) -> Result<Session, Error> {
        debug!("refreshing session");
        let body = auth::refresh_command(session);
        let resp = self.send_command(REFRESH_PATH, &body).await?;
        let session = self.accept(resp, "refresh")?;
        debug!(expires_at = %session.expires_at, "session refreshed");
        Ok(session)
    }

    async fn send_command(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<RawResponse, Error> {
        let url = self.base_url.join(path)?;
        self.transport
            .send(Method::POST, url, auth::anonymous_headers(), &[], Some(body))
            .await
    }

    /// Classify a command response; on success swap in and persist the
    /// new session.
    fn accept(&self, resp: RawResponse, action: &str) -> Result<Session, Error> {
        if resp.status.is_client_error() || body_marker(&resp).as_deref() == Some(LOGIN_FAILED) {
            return Err(Error::Authentication {
                message: format!("{action} rejected (HTTP {}): {}", resp.status, resp.preview()),
            });
        }
        if !resp.status.is_success() {
            return Err(Error::Api {
                status: resp.status.as_u16(),
                message: format!("{action} failed: {}", resp.preview()),
            });
        }

        let parsed: AuthResponse =
            serde_json::from_str(&resp.body).map_err(|e| Error::Deserialization {
                message: format!("{action} response: {e}"),
                body: resp.body.clone(),
            })?;
        let session = parsed.into_session(&self.credentials.device_id);

        self.session.store(Some(Arc::new(session.clone())));
        if let Some(persistence) = &self.persistence {
            persistence.store(&session);
        }
        Ok(session)
    }
}
