//! CLI configuration: thin wrapper around `audtek_config` shared types.
//!
//! Picks the active profile and applies `GlobalOpts` flag overrides
//! (--timeout, --page-size) before handing off to the shared resolution.

use std::sync::Arc;

use audtek_api::CatalogClient;
use audtek_config::{ClientSettings, FileSessionStore, profile_to_settings};
use tracing::{debug, warn};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use audtek_config::{Config, Profile, config_path, load_config, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.default_profile_name().to_owned())
}

/// Look up a profile. A missing default profile is tolerated so the
/// `AUDIOTEKA_*` variables alone can drive a run; a profile named
/// explicitly on the command line must exist.
pub fn find_profile(global: &GlobalOpts, config: &Config, name: &str) -> Result<Profile, CliError> {
    if let Some(profile) = config.profiles.get(name) {
        return Ok(profile.clone());
    }
    if global.profile.is_some() {
        let mut available: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
        available.sort_unstable();
        return Err(CliError::ProfileNotFound {
            name: name.to_owned(),
            available: if available.is_empty() {
                "(none)".into()
            } else {
                available.join(", ")
            },
            path: config_path().display().to_string(),
        });
    }
    debug!(profile = name, "profile not in config, using environment only");
    Ok(Profile {
        save_session: true,
        ..Profile::default()
    })
}

/// Build the runtime settings for the active profile.
///
/// A device id generated on first use is written back to the config file
/// so the service sees the same device on every run.
pub fn resolve_settings(global: &GlobalOpts) -> Result<ClientSettings, CliError> {
    let mut config = load_config()?;
    let name = active_profile_name(global, &config);
    let mut profile = find_profile(global, &config, &name)?;

    if audtek_config::ensure_device_id(&mut profile) {
        config.profiles.insert(name.clone(), profile.clone());
        if let Err(e) = save_config(&config) {
            warn!(error = %e, "could not save generated device id");
        }
    }
    audtek_config::lint_profile(&profile, &name);

    apply_overrides(&mut profile, global);
    Ok(profile_to_settings(&profile, &name, &config.defaults)?)
}

/// CLI flags take priority over profile values.
fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    if let Some(page_size) = global.page_size {
        profile.page_size = Some(page_size);
    }
}

/// Build the catalog client, persisting the session when the profile
/// asks for it.
pub fn build_client(settings: &ClientSettings) -> Result<CatalogClient, CliError> {
    let client = if settings.save_session {
        CatalogClient::with_persistence(
            &settings.base_url,
            settings.credentials.clone(),
            &settings.transport,
            Arc::new(FileSessionStore::for_profile(&settings.profile)),
        )?
    } else {
        CatalogClient::new(
            &settings.base_url,
            settings.credentials.clone(),
            &settings.transport,
        )?
    };
    Ok(client)
}
