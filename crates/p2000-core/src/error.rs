// ── Core error types ──
//
// Session- and decode-level errors from p2000-core. The
// `From<p2000_api::Error>` impl folds wire-layer failures into the
// network/protocol classes consumers care about.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Could not obtain a session token: {message}")]
    Token { message: String },

    #[error("Connection timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("A session is already running on this client")]
    AlreadyConnected,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Bootstrap and transport failures. These abort a connection attempt.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::Token { .. } | Self::Timeout { .. }
        )
    }
}

/// Why a single alert could not be decoded. Sibling alerts in the same
/// batch are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("alert is not a JSON object")]
    NotAnObject,

    #[error("missing required field {field}")]
    MissingField { field: &'static str },

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("invalid SPI '{spi}': {reason}")]
    InvalidTimestamp { spi: String, reason: &'static str },
}

// ── Conversion from wire-layer errors ────────────────────────────────

impl From<p2000_api::Error> for CoreError {
    fn from(err: p2000_api::Error) -> Self {
        match err {
            p2000_api::Error::Token { message } => CoreError::Token { message },
            p2000_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                }
            }
            p2000_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            p2000_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            p2000_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            p2000_api::Error::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket closed (code {code}): {reason}"),
            },
            p2000_api::Error::Protocol { message } => CoreError::Protocol { message },
        }
    }
}
