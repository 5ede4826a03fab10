use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Catalog API version advertised on every request.
pub const API_VERSION: &str = "3.39.0";

/// Account credentials for the catalog service.
///
/// Immutable once built. The password lives in a [`SecretString`] so it is
/// never printed by `Debug` or logged.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
    pub device_id: String,
}

impl Credentials {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<SecretString>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            device_id: device_id.into(),
        }
    }
}

/// An authenticated session.
///
/// Created by login and replaced wholesale by refresh. Serializes verbatim
/// so a persisted session restores byte-identically.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub refresh_id: String,
    pub device_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the bearer token has passed its advertised expiry.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("refresh_id", &"[REDACTED]")
            .field("device_id", &self.device_id)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Storage for a session that outlives the process.
///
/// Implementations must treat a missing or unreadable record as "no
/// session" rather than an error.
pub trait SessionPersistence: Send + Sync {
    fn load(&self) -> Option<Session>;
    fn store(&self, session: &Session);
    fn clear(&self);
}

/// Headers sent with every request, before authentication.
pub fn anonymous_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("pl"));
    headers.insert("X-Api-Version", HeaderValue::from_static(API_VERSION));
    headers.insert(
        "X-Distribution-Channel",
        HeaderValue::from_static("audioteka"),
    );
    headers
}

/// Header set for a request: the anonymous defaults plus a bearer
/// authorization header when a session is present.
pub fn headers(session: Option<&Session>) -> HeaderMap {
    let mut headers = anonymous_headers();
    let Some(session) = session else {
        return headers;
    };

    // A token with non-visible-ASCII bytes cannot be sent; fall back to the
    // anonymous set and let the 401 path recover.
    if let Ok(mut value) = HeaderValue::from_str(&format!("Bearer {}", session.token)) {
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    if let Ok(value) = HeaderValue::from_str(&session.device_id) {
        headers.insert("X-Device-Id", value);
    }
    headers
}

/// Body of the `authenticate` command.
pub(crate) fn authenticate_command(credentials: &Credentials) -> serde_json::Value {
    serde_json::json!({
        "name": "authenticate",
        "email": credentials.email,
        "password": credentials.password.expose_secret(),
        "device_id": credentials.device_id,
    })
}

/// Body of the `refresh-token` command.
pub(crate) fn refresh_command(session: &Session) -> serde_json::Value {
    serde_json::json!({
        "name": "refresh-token",
        "refresh_token": session.refresh_id,
        "device_id": session.device_id,
    })
}
