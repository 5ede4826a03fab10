// ── Core error types ──
//
// User-facing errors from audtek-core. Consumers never see raw HTTP
// statuses or JSON parse failures; the `From<audtek_api::Error>` impl
// translates them. `CoreError` is `Clone` because one expansion result
// fans out to every caller waiting on that node.

use thiserror::Error;

use crate::tree::NodeId;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Session ──────────────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Connectivity ─────────────────────────────────────────────────
    #[error("Cannot reach catalog service: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Request timed out")]
    Timeout,

    // ── Catalog ──────────────────────────────────────────────────────
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Catalog API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected catalog payload: {message}")]
    InvalidPayload { message: String },

    // ── Tree ─────────────────────────────────────────────────────────
    #[error("No node with id {id}")]
    NodeNotFound { id: NodeId },

    #[error("No node at path {path}")]
    PathNotFound { path: String },

    #[error("Node {id} was removed from the tree before its expansion finished")]
    NodeDetached { id: NodeId },

    #[error("Node {id} has no catalog record")]
    NoRecord { id: NodeId },

    // ── Queue ────────────────────────────────────────────────────────
    #[error("Expansion cancelled")]
    Cancelled,

    #[error("Load queue is closed; restart the browser to expand further")]
    QueueClosed,

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from API-layer errors ─────────────────────────────────

impl From<audtek_api::Error> for CoreError {
    fn from(err: audtek_api::Error) -> Self {
        match err {
            audtek_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            audtek_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else {
                    CoreError::ConnectionFailed {
                        reason: e.to_string(),
                    }
                }
            }
            audtek_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            audtek_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                reason: format!("TLS error: {msg}"),
            },
            audtek_api::Error::NotFound { resource } => CoreError::NotFound { resource },
            audtek_api::Error::Api { status, message } => CoreError::Api { status, message },
            audtek_api::Error::Deserialization { message, body: _ }
            | audtek_api::Error::Validation { message } => CoreError::InvalidPayload { message },
            audtek_api::Error::Cancelled => CoreError::Cancelled,
        }
    }
}
