//! Shared configuration for the p2000 CLI.
//!
//! A TOML file plus `P2000_` environment overrides, and translation to
//! `p2000_core::ClientConfig`. The CLI layers its flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use p2000_core::config::{DEFAULT_MONITOR_URL, DEFAULT_WEBSOCKET_URL};
use p2000_core::{ClientConfig, KeepaliveMonitor};

/// Prefix for environment overrides. Nested keys use `__`, e.g.
/// `P2000_FEED__IDLE_TIMEOUT_SECS=60`.
pub const ENV_PREFIX: &str = "P2000_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

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
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// CLI presentation defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Feed endpoints and session timing.
    #[serde(default)]
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    /// Page that hands out the session cookie.
    #[serde(default = "default_monitor_url")]
    pub monitor_url: String,

    /// Live feed endpoint.
    #[serde(default = "default_websocket_url")]
    pub websocket_url: String,

    /// Override the browser user agent sent on both requests.
    pub user_agent: Option<String>,

    /// Token request timeout, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// How often the session checks for silence, in seconds.
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval_secs: u64,

    /// Silence before a ping is sent, in seconds.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            monitor_url: default_monitor_url(),
            websocket_url: default_websocket_url(),
            user_agent: None,
            timeout: default_timeout(),
            keepalive_interval_secs: default_keepalive_interval(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

fn default_monitor_url() -> String {
    DEFAULT_MONITOR_URL.into()
}
fn default_websocket_url() -> String {
    DEFAULT_WEBSOCKET_URL.into()
}
fn default_timeout() -> u64 {
    10
}
fn default_keepalive_interval() -> u64 {
    1
}
fn default_idle_timeout() -> u64 {
    300
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("nl", "p2000", "p2000").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("p2000");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it can't be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to runtime config ───────────────────────────────────

impl FeedConfig {
    /// Build a validated `ClientConfig`.
    pub fn to_client_config(&self) -> Result<ClientConfig, ConfigError> {
        let monitor_url = parse_url("monitor_url", &self.monitor_url, &["http", "https"])?;
        let websocket_url = parse_url("websocket_url", &self.websocket_url, &["ws", "wss"])?;

        let timeout = positive_secs("timeout", self.timeout)?;
        let keepalive = KeepaliveMonitor {
            tick: positive_secs("keepalive_interval_secs", self.keepalive_interval_secs)?,
            idle_timeout: positive_secs("idle_timeout_secs", self.idle_timeout_secs)?,
        };

        let defaults = ClientConfig::default();
        Ok(ClientConfig {
            monitor_url,
            websocket_url,
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            timeout,
            keepalive,
        })
    }
}

fn parse_url(field: &str, raw: &str, schemes: &[&str]) -> Result<Url, ConfigError> {
    let url: Url = raw.parse().map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("expected a {} URL, got '{raw}'", schemes.join("/")),
        });
    }
    Ok(url)
}

fn positive_secs(field: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be at least 1 second".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_feed_config_matches_client_defaults() {
        let client = FeedConfig::default().to_client_config().unwrap();
        let expected = ClientConfig::default();
        assert_eq!(client.monitor_url, expected.monitor_url);
        assert_eq!(client.websocket_url, expected.websocket_url);
        assert_eq!(client.user_agent, expected.user_agent);
        assert_eq!(client.timeout, expected.timeout);
        assert_eq!(client.keepalive, expected.keepalive);
    }

    #[test]
    fn rejects_wrong_scheme() {
        let feed = FeedConfig {
            websocket_url: "https://www.livep2000.nl/LSM/websocket".into(),
            ..FeedConfig::default()
        };
        let err = feed.to_client_config().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "websocket_url"));
    }

    #[test]
    fn rejects_unparseable_url() {
        let feed = FeedConfig {
            monitor_url: "not a url".into(),
            ..FeedConfig::default()
        };
        assert!(feed.to_client_config().is_err());
    }

    #[test]
    fn rejects_zero_durations() {
        let feed = FeedConfig {
            idle_timeout_secs: 0,
            ..FeedConfig::default()
        };
        let err = feed.to_client_config().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid idle_timeout_secs: must be at least 1 second"
        );
    }

    #[test]
    fn user_agent_override_is_applied() {
        let feed = FeedConfig {
            user_agent: Some("p2000-test".into()),
            ..FeedConfig::default()
        };
        assert_eq!(feed.to_client_config().unwrap().user_agent, "p2000-test");
    }
}
