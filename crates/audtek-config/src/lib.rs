//! Shared configuration for audtek.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! file-backed session persistence, and translation to the settings the
//! API client and catalog browser are built from.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use audtek_api::{Credentials, DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE, TlsMode, TransportConfig};
use audtek_core::BrowserConfig;

mod session_store;

pub use session_store::FileSessionStore;

/// Environment variables consulted during credential resolution.
pub const EMAIL_ENV: &str = "AUDIOTEKA_EMAIL";
pub const PASSWORD_ENV: &str = "AUDIOTEKA_PASSWORD";
pub const DEVICE_ID_ENV: &str = "AUDIOTEKA_DEVICE_ID";

const KEYRING_SERVICE: &str = "audtek";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Profile name to use when none is given explicitly.
    pub fn default_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            page_size: default_page_size(),
        }
    }
}

fn default_output() -> String {
    "text".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}
fn default_save_session() -> bool {
    true
}

/// A named catalog account.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Account email.
    pub email: Option<String>,

    /// Password (plaintext; prefer keyring or env var).
    pub password: Option<String>,

    /// Device id registered with the service. Generated on first use.
    pub device_id: Option<String>,

    /// Catalog API base URL override.
    pub base_url: Option<String>,

    /// Path to an extra CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override page size.
    pub page_size: Option<u32>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Persist the session between runs.
    #[serde(default = "default_save_session")]
    pub save_session: bool,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "audtek", "audtek")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory holding persisted sessions.
pub fn session_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".cache").join("sessions"),
        |dirs| dirs.cache_dir().join("sessions"),
    )
}

fn dirs_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("audtek");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path`, layered over defaults and under `AUDTEK_`
/// environment variables (`AUDTEK_DEFAULTS__TIMEOUT=60`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("AUDTEK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Resolve the account password: env var, then system keyring, then
/// plaintext in the profile.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_password_with(profile, profile_name, process_env)
}

fn resolve_password_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Env var
    if let Some(pw) = env(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    // 2. Keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password")) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Save a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .map_err(keyring_error)?;
    entry
        .set_password(password.expose_secret())
        .map_err(keyring_error)?;
    debug!(profile = profile_name, "password stored in keyring");
    Ok(())
}

fn keyring_error(err: keyring::Error) -> ConfigError {
    ConfigError::Keyring(err.to_string())
}

/// Fill in a missing device id with a fresh UUID. Returns `true` when one
/// was generated, so the caller can save it back to the config.
pub fn ensure_device_id(profile: &mut Profile) -> bool {
    let configured = profile.device_id.as_deref().is_some_and(|id| !id.is_empty());
    if configured || process_env(DEVICE_ID_ENV).is_some() {
        return false;
    }
    let id = uuid::Uuid::new_v4().to_string();
    debug!(device_id = %id, "generated device id");
    profile.device_id = Some(id);
    true
}

/// Resolve the full credential set for a profile.
pub fn resolve_credentials(profile: &Profile, profile_name: &str) -> Result<Credentials, ConfigError> {
    resolve_credentials_with(profile, profile_name, process_env)
}

fn resolve_credentials_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Credentials, ConfigError> {
    let email = env(EMAIL_ENV)
        .or_else(|| profile.email.clone())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;
    let device_id = env(DEVICE_ID_ENV)
        .or_else(|| profile.device_id.clone())
        .ok_or_else(|| ConfigError::Validation {
            field: "device_id".into(),
            reason: format!("profile '{profile_name}' has no device id"),
        })?;
    let password = resolve_password_with(profile, profile_name, &env)?;
    Ok(Credentials::new(email, password, device_id))
}

// ── Profile → runtime settings ──────────────────────────────────────

/// Everything needed to build a client and a browser for one profile.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub profile: String,
    pub base_url: String,
    pub credentials: Credentials,
    pub transport: TransportConfig,
    pub browser: BrowserConfig,
    pub save_session: bool,
}

/// Build `ClientSettings` from a profile and the global defaults.
pub fn profile_to_settings(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientSettings, ConfigError> {
    let base_url = profile
        .base_url
        .clone()
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
    url::Url::parse(&base_url).map_err(|_| ConfigError::Validation {
        field: "base_url".into(),
        reason: format!("invalid URL: {base_url}"),
    })?;

    let page_size = profile.page_size.unwrap_or(defaults.page_size);
    if page_size == 0 {
        return Err(ConfigError::Validation {
            field: "page_size".into(),
            reason: "must be at least 1".into(),
        });
    }

    let credentials = resolve_credentials(profile, profile_name)?;

    let tls = profile
        .ca_cert
        .clone()
        .map_or(TlsMode::System, TlsMode::CustomCa);
    let timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    Ok(ClientSettings {
        profile: profile_name.to_owned(),
        base_url,
        credentials,
        transport: TransportConfig { tls, timeout },
        browser: BrowserConfig {
            page_size,
            ..BrowserConfig::default()
        },
        save_session: profile.save_session,
    })
}

/// Warn about settings that work but are discouraged.
pub fn lint_profile(profile: &Profile, profile_name: &str) {
    if profile.password.is_some() {
        warn!(
            profile = profile_name,
            "password stored in plaintext config; prefer the system keyring or {PASSWORD_ENV}"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn profile() -> Profile {
        Profile {
            email: Some("reader@example.com".into()),
            password: Some("plaintext".into()),
            device_id: Some("dev-1".into()),
            save_session: true,
            ..Profile::default()
        }
    }

    #[test]
    fn loads_profiles_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "home"

[defaults]
timeout = 10

[profiles.home]
email = "reader@example.com"
device_id = "dev-1"
page_size = 25
save_session = false
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.default_profile_name(), "home");
        assert_eq!(cfg.defaults.timeout, 10);
        assert_eq!(cfg.defaults.output, "text");
        let home = &cfg.profiles["home"];
        assert_eq!(home.page_size, Some(25));
        assert!(!home.save_session);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile_name(), "default");
        assert!(cfg.profiles.is_empty());
        assert_eq!(cfg.defaults.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert("default".into(), profile());
        save_config_to(&path, &cfg).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(
            loaded.profiles["default"].email.as_deref(),
            Some("reader@example.com")
        );
    }

    #[test]
    fn env_overrides_profile_values() {
        let env = |name: &str| match name {
            EMAIL_ENV => Some("env@example.com".to_owned()),
            PASSWORD_ENV => Some("from-env".to_owned()),
            _ => None,
        };
        let creds = resolve_credentials_with(&profile(), "default", env).unwrap();
        assert_eq!(creds.email, "env@example.com");
        assert_eq!(creds.password.expose_secret(), "from-env");
        assert_eq!(creds.device_id, "dev-1");
    }

    #[test]
    fn missing_email_is_no_credentials() {
        let mut p = profile();
        p.email = None;
        let err = resolve_credentials_with(&p, "work", no_env).unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { ref profile } if profile == "work"));
    }

    #[test]
    fn missing_device_id_is_validation_error() {
        let mut p = profile();
        p.device_id = None;
        let err = resolve_credentials_with(&p, "default", no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "device_id"));
    }

    #[test]
    fn device_id_is_generated_once() {
        let mut p = profile();
        assert!(!ensure_device_id(&mut p));
        assert_eq!(p.device_id.as_deref(), Some("dev-1"));

        if process_env(DEVICE_ID_ENV).is_none() {
            p.device_id = None;
            assert!(ensure_device_id(&mut p));
            let generated = p.device_id.clone().unwrap();
            assert!(uuid::Uuid::parse_str(&generated).is_ok());
            assert!(!ensure_device_id(&mut p));
            assert_eq!(p.device_id.as_deref(), Some(generated.as_str()));
        }
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let mut p = profile();
        p.page_size = Some(0);
        let err = profile_to_settings(&p, "default", &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "page_size"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let mut p = profile();
        p.base_url = Some("not a url".into());
        let err = profile_to_settings(&p, "default", &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "base_url"));
    }
}
