//! Clap derive structures for the `audtek` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// audtek -- browse an Audioteka library from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "audtek",
    version,
    about = "Browse your Audioteka audiobook library",
    long_about = "Browse the shelf, favourites and category listings of an Audioteka\n\
        account as a tree. Collections are fetched lazily, one level at a time.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Account profile to use
    #[arg(long, short = 'p', env = "AUDTEK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "AUDTEK_OUTPUT",
        default_value = "text",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "AUDTEK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Items requested per page (overrides profile)
    #[arg(long, global = true)]
    pub page_size: Option<u32>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented tree / key-value text (default)
    Text,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the catalog tree below a path
    #[command(alias = "ls")]
    Tree(TreeArgs),

    /// Show one node and its full record
    Show(ShowArgs),

    /// Log in and store the session
    Login,

    /// Forget the stored session
    Logout,

    /// Inspect and edit configuration
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Path to start from, e.g. /shelf or /categories/123
    #[arg(default_value = "/")]
    pub path: String,

    /// Levels to expand below the path
    #[arg(long, short = 'd', default_value_t = 1)]
    pub depth: usize,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Path of the node, e.g. /shelf/<title-id>
    pub path: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Print the active configuration (secrets redacted)
    Show,

    /// Store the profile's password in the system keyring, read from stdin
    SetPassword,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn tree_defaults_to_root_and_one_level() {
        let cli = Cli::parse_from(["audtek", "tree"]);
        match cli.command {
            Command::Tree(args) => {
                assert_eq!(args.path, "/");
                assert_eq!(args.depth, 1);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.global.output, OutputFormat::Text);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["audtek", "show", "/shelf/b-1", "-o", "json", "-vv"]);
        assert_eq!(cli.global.output, OutputFormat::Json);
        assert_eq!(cli.global.verbose, 2);
    }
}
