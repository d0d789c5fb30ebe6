//! CLI configuration: thin wrapper around `p2000_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--monitor-url, --timeout, etc.).

use clap::ValueEnum;

use p2000_core::ClientConfig;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use p2000_config::{Config, config_path, load_config, save_config_to};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Fill output and color from the config file where no flag was given.
pub fn apply_defaults(global: &mut GlobalOpts, config: &Config) -> Result<(), CliError> {
    if global.output.is_none() {
        global.output = Some(parse_choice("defaults.output", &config.defaults.output)?);
    }
    if global.color.is_none() {
        global.color = Some(parse_choice::<ColorMode>("defaults.color", &config.defaults.color)?);
    }
    Ok(())
}

fn parse_choice<T: ValueEnum>(field: &str, raw: &str) -> Result<T, CliError> {
    T::from_str(raw, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}

/// Translate the feed section + global flags into a `ClientConfig`.
///
/// CLI flag overrides take priority over config values.
pub fn resolve_client_config(
    config: &Config,
    global: &GlobalOpts,
) -> Result<ClientConfig, CliError> {
    let mut feed = config.feed.clone();

    if let Some(ref url) = global.monitor_url {
        feed.monitor_url.clone_from(url);
    }
    if let Some(ref url) = global.websocket_url {
        feed.websocket_url.clone_from(url);
    }
    if let Some(timeout) = global.timeout {
        feed.timeout = timeout;
    }

    let client_config = feed.to_client_config()?;
    tracing::debug!(
        monitor = %client_config.monitor_url,
        websocket = %client_config.websocket_url,
        timeout_secs = client_config.timeout.as_secs(),
        "resolved feed configuration"
    );
    Ok(client_config)
}
