//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use audtek_config::ConfigError;
use audtek_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the catalog service")]
    #[diagnostic(
        code(audtek::connection_failed),
        help("Check your network connection and the profile's base_url.\n{reason}")
    )]
    ConnectionFailed { reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(audtek::timeout),
        help("Increase the timeout with --timeout or retry later.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed for profile '{profile}'")]
    #[diagnostic(
        code(audtek::auth_failed),
        help(
            "Verify the email and password.\n\
             Run: audtek config set-password --profile {profile}\n\
             {message}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(audtek::no_credentials),
        help(
            "Add an email to the profile in {path}\n\
             and set AUDIOTEKA_PASSWORD or run: audtek config set-password"
        )
    )]
    NoCredentials { profile: String, path: String },

    // ── Catalog ──────────────────────────────────────────────────────
    #[error("Nothing at '{path}'")]
    #[diagnostic(
        code(audtek::not_found),
        help("Run: audtek tree {parent} to see what is there")
    )]
    NotFound { path: String, parent: String },

    #[error("Catalog API error: {message}")]
    #[diagnostic(code(audtek::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(audtek::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(audtek::profile_not_found),
        help("Available profiles: {available}\nEdit: {path}")
    )]
    ProfileNotFound {
        name: String,
        available: String,
        path: String,
    },

    #[error(transparent)]
    #[diagnostic(code(audtek::config))]
    Config(Box<figment::Error>),

    #[error("Keyring error: {0}")]
    #[diagnostic(code(audtek::keyring))]
    Keyring(String),

    // ── Control ──────────────────────────────────────────────────────
    #[error("Interrupted")]
    #[diagnostic(code(audtek::interrupted))]
    Interrupted,

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to write config: {0}")]
    #[diagnostic(code(audtek::config_write))]
    ConfigWrite(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } | Self::Keyring(_) => {
                exit_code::AUTH
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } => exit_code::USAGE,
            Self::Interrupted => exit_code::INTERRUPTED,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the lookup path to a path-not-found error.
    pub(crate) fn not_found(path: &str) -> Self {
        let trimmed = path.trim_end_matches('/');
        let parent = match trimmed.rfind('/') {
            Some(0) | None => "/".to_owned(),
            Some(idx) => trimmed[..idx].to_owned(),
        };
        Self::NotFound {
            path: path.to_owned(),
            parent,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },
            CoreError::Timeout => CliError::Timeout,
            CoreError::NotFound { resource } => CliError::not_found(&resource),
            CoreError::PathNotFound { path } => CliError::not_found(&path),
            CoreError::Api { status, message } => CliError::ApiError {
                message: format!("HTTP {status}: {message}"),
            },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Cancelled | CoreError::QueueClosed => CliError::Interrupted,
            other @ (CoreError::InvalidPayload { .. }
            | CoreError::NodeNotFound { .. }
            | CoreError::NodeDetached { .. }
            | CoreError::NoRecord { .. }) => CliError::ApiError {
                message: other.to_string(),
            },
        }
    }
}

impl From<audtek_api::Error> for CliError {
    fn from(err: audtek_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials {
                profile,
                path: audtek_config::config_path().display().to_string(),
            },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: String::new(),
                path: audtek_config::config_path().display().to_string(),
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Figment(err) => CliError::Config(err),
            ConfigError::Serialization(err) => CliError::ConfigWrite(err.to_string()),
            ConfigError::Keyring(reason) => CliError::Keyring(reason),
            ConfigError::Io(err) => CliError::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        let auth: CliError = CoreError::AuthenticationFailed {
            message: "nope".into(),
        }
        .into();
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let missing: CliError = CoreError::PathNotFound {
            path: "/shelf/x".into(),
        }
        .into();
        assert_eq!(missing.exit_code(), exit_code::NOT_FOUND);

        assert_eq!(CliError::from(CoreError::Timeout).exit_code(), exit_code::TIMEOUT);
        assert_eq!(CliError::Interrupted.exit_code(), exit_code::INTERRUPTED);
    }

    #[test]
    fn not_found_points_at_parent() {
        match CliError::not_found("/shelf/b-1") {
            CliError::NotFound { parent, .. } => assert_eq!(parent, "/shelf"),
            other => panic!("unexpected {other:?}"),
        }
        match CliError::not_found("/shelf") {
            CliError::NotFound { parent, .. } => assert_eq!(parent, "/"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
