//! `audtek login` / `audtek logout`.

use audtek_api::SessionPersistence;
use audtek_config::FileSessionStore;

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

/// Authenticate now and report the session expiry.
pub async fn login(global: &GlobalOpts) -> Result<(), CliError> {
    let settings = config::resolve_settings(global)?;
    let client = config::build_client(&settings)?;

    let session = client
        .session()
        .login()
        .await
        .map_err(|e| auth_error(e, &settings.profile))?;

    let note = if settings.save_session {
        ""
    } else {
        " (not saved)"
    };
    output::print_output(
        &format!(
            "Logged in as {} until {}{note}",
            settings.credentials.email,
            session.expires_at.format("%Y-%m-%d %H:%M UTC"),
        ),
        global.quiet,
    );
    Ok(())
}

/// Forget the stored session for the active profile.
pub fn logout(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config()?;
    let name = config::active_profile_name(global, &cfg);
    let store = FileSessionStore::for_profile(&name);
    store.clear();
    output::print_output(&format!("Session for '{name}' removed"), global.quiet);
    Ok(())
}

fn auth_error(err: audtek_api::Error, profile: &str) -> CliError {
    match CliError::from(err) {
        CliError::AuthFailed { message, .. } => CliError::AuthFailed {
            profile: profile.to_owned(),
            message,
        },
        other => other,
    }
}
