//! `audtek config`: inspect the config file and store secrets.

use std::io::BufRead;

use secrecy::SecretString;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
        ConfigCommand::Show => show(global),
        ConfigCommand::SetPassword => set_password(global),
    }
}

fn show(global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::load_config()?;
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(REDACTED.into());
        }
    }

    let rendered = match global.output {
        OutputFormat::Text => {
            toml::to_string_pretty(&cfg).map_err(|e| CliError::ConfigWrite(e.to_string()))?
        }
        OutputFormat::Json => output::render_json_pretty(&cfg),
        OutputFormat::JsonCompact => output::render_json_compact(&cfg),
    };
    output::print_output(&rendered, global.quiet);
    Ok(())
}

/// Read one line from stdin and store it as the active profile's password.
fn set_password(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config()?;
    let name = config::active_profile_name(global, &cfg);

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "empty input".into(),
        });
    }

    audtek_config::store_password(&name, &SecretString::from(password.to_owned()))?;
    output::print_output(
        &format!("Password for '{name}' stored in the system keyring"),
        global.quiet,
    );
    Ok(())
}
