use thiserror::Error;

/// Top-level error type for the `audtek-api` crate.
///
/// Covers every failure mode of the catalog client: authentication,
/// transport, HTTP status classification, and payload validation.
/// `audtek-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login or refresh rejected, or a request still unauthorized after
    /// the one recovery attempt.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Catalog ─────────────────────────────────────────────────────
    /// The requested item does not exist (HTTP 404 or `"item_not_found"`).
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Any other non-success HTTP status.
    #[error("Catalog API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Well-formed JSON that lacks fields the client relies on.
    #[error("Malformed payload: {message}")]
    Validation { message: String },

    // ── Control ─────────────────────────────────────────────────────
    /// A paginated traversal observed cancellation between pages.
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
