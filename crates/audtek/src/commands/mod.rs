//! Command handlers, one module per subcommand group.

pub mod config_cmd;
pub mod session;
pub mod show;
pub mod tree;

use audtek_core::CatalogBrowser;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a catalog command to its handler.
pub async fn dispatch(
    cmd: Command,
    browser: &CatalogBrowser,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Tree(args) => tree::handle(args, browser, global).await,
        Command::Show(args) => show::handle(args, browser, global).await,
        Command::Login | Command::Logout | Command::Config(_) => {
            unreachable!("handled before the browser is built")
        }
    }
}
