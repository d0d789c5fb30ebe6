//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use p2000_config::ConfigError;
use p2000_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const TOKEN: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to the feed at {url}")]
    #[diagnostic(
        code(p2000::connection_failed),
        help(
            "Check your network connection and the feed endpoint.\n\
             URL: {url}"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Could not obtain a session token: {message}")]
    #[diagnostic(
        code(p2000::no_token),
        help(
            "The monitor page did not hand out a usable session cookie.\n\
             Check --monitor-url, or pass a token with --token."
        )
    )]
    TokenUnavailable { message: String },

    #[error("The feed closed the connection")]
    #[diagnostic(
        code(p2000::feed_lost),
        help("The session is not resumed automatically. Run the command again to reconnect.")
    )]
    FeedLost,

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(p2000::timeout),
        help("Increase the timeout with --timeout or check the feed's responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Feed data ────────────────────────────────────────────────────

    #[error("Unexpected data from the feed: {message}")]
    #[diagnostic(code(p2000::protocol))]
    Protocol { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(p2000::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(p2000::config_exists),
        help("Use --force to overwrite it, or edit it directly.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(
        code(p2000::config),
        help("Check the config file (p2000 config path) and P2000_* environment variables.")
    )]
    Config(Box<figment::Error>),

    // ── Internal ─────────────────────────────────────────────────────

    #[error("Internal error: {message}")]
    #[diagnostic(code(p2000::internal))]
    Internal { message: String },

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::FeedLost => exit_code::CONNECTION,
            Self::TokenUnavailable { .. } => exit_code::TOKEN,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ConfigExists { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::Token { message } => CliError::TokenUnavailable { message },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Protocol { message } => CliError::Protocol { message },

            CoreError::Decode(e) => CliError::Protocol {
                message: e.to_string(),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::AlreadyConnected => CliError::Internal {
                message: "a feed session is already running".into(),
            },

            CoreError::Internal(message) => CliError::Internal { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Serialization(e) => CliError::Internal {
                message: format!("failed to serialize config: {e}"),
            },
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
