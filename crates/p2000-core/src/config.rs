// ── Runtime client configuration ──
//
// These are the *runtime* types passed to `Client::new()`. They are
// constructed by the config crate (from TOML profiles) or directly by
// tests. No disk I/O here.

use std::time::Duration;

use url::Url;

use p2000_api::TransportConfig;
use p2000_api::transport::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};

use crate::keepalive::KeepaliveMonitor;

pub const DEFAULT_MONITOR_URL: &str = "https://www.livep2000.nl/monitor/";
pub const DEFAULT_WEBSOCKET_URL: &str = "wss://www.livep2000.nl/LSM/websocket";

/// Configuration for one feed client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Page whose `Set-Cookie` header carries the session token.
    pub monitor_url: Url,
    /// Live feed endpoint.
    pub websocket_url: Url,
    /// Sent on both the token request and the WebSocket upgrade.
    pub user_agent: String,
    /// Timeout for the token request.
    pub timeout: Duration,
    pub keepalive: KeepaliveMonitor,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            monitor_url: DEFAULT_MONITOR_URL
                .parse()
                .expect("default monitor URL is valid"),
            websocket_url: DEFAULT_WEBSOCKET_URL
                .parse()
                .expect("default websocket URL is valid"),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            keepalive: KeepaliveMonitor::default(),
        }
    }
}

impl ClientConfig {
    /// Transport settings for the token request.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: self.timeout,
            user_agent: self.user_agent.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_public_feed() {
        let config = ClientConfig::default();
        assert_eq!(config.monitor_url.host_str(), Some("www.livep2000.nl"));
        assert_eq!(config.websocket_url.scheme(), "wss");
        assert_eq!(config.websocket_url.path(), "/LSM/websocket");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.keepalive.idle_timeout, Duration::from_secs(300));
    }

    #[test]
    fn transport_carries_timeout_and_user_agent() {
        let config = ClientConfig {
            timeout: Duration::from_secs(3),
            user_agent: "probe/1.0".into(),
            ..ClientConfig::default()
        };
        let transport = config.transport();
        assert_eq!(transport.timeout, Duration::from_secs(3));
        assert_eq!(transport.user_agent, "probe/1.0");
    }
}
