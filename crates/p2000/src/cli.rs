//! Clap derive structures for the `p2000` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// p2000 -- live Dutch emergency dispatch alerts in your terminal
#[derive(Debug, Parser)]
#[command(
    name = "p2000",
    version,
    about = "Stream P2000 dispatch alerts from the LiveP2000 feed",
    long_about = "Follows the LiveP2000 WebSocket feed and prints fire, ambulance,\n\
        police and sea-rescue dispatch alerts as they are paged.\n\n\
        A session token is fetched from the monitor page before each connection.",
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
    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "P2000_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Token request timeout in seconds
    #[arg(long, env = "P2000_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Monitor page that hands out the session token
    #[arg(long, env = "P2000_MONITOR_URL", global = true)]
    pub monitor_url: Option<String>,

    /// Live feed WebSocket endpoint
    #[arg(long, env = "P2000_WEBSOCKET_URL", global = true)]
    pub websocket_url: Option<String>,
}

impl GlobalOpts {
    pub fn output_format(&self) -> OutputFormat {
        self.output.clone().unwrap_or(OutputFormat::Table)
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color.clone().unwrap_or(ColorMode::Auto)
    }
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON, one alert per line
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain tab-separated text, one alert per line (scripting)
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
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
    /// Stream alerts until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Fetch a session token from the monitor page and print it
    Token,

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Only show priority incidents (GRIP, large fires, water accidents)
    #[arg(long, short = 'P')]
    pub priority_only: bool,

    /// Only show alerts from these services (repeatable)
    #[arg(long = "service", short = 's', value_enum)]
    pub services: Vec<ServiceFilter>,

    /// Only show alerts paging one of these capcodes (repeatable)
    #[arg(long = "capcode", short = 'c')]
    pub capcodes: Vec<u32>,

    /// Stop after this many alerts
    #[arg(long, short = 'n', value_parser = clap::value_parser!(u64).range(1..))]
    pub count: Option<u64>,

    /// Use this session token instead of fetching one
    #[arg(long, env = "P2000_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServiceFilter {
    /// Brandweer
    Fire,
    /// Ambulance
    Ambulance,
    /// Politie
    Police,
    /// KNRM
    SeaRescue,
    /// Trauma helicopter (MMT)
    Helicopter,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Show the effective configuration (file + environment)
    Show,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long, short = 'f')]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
