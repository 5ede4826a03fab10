mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use audtek_core::CatalogBrowser;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Account and config commands don't need the catalog tree
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),
        Command::Login => commands::session::login(&cli.global).await,
        Command::Logout => commands::session::logout(&cli.global),

        cmd => {
            let settings = config::resolve_settings(&cli.global)?;
            let client = config::build_client(&settings)?;
            let browser = CatalogBrowser::with_config(client, settings.browser);

            tracing::debug!(command = ?cmd, profile = %settings.profile, "dispatching command");
            commands::dispatch(cmd, &browser, &cli.global).await
        }
    }
}
