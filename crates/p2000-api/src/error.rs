use thiserror::Error;

/// Top-level error type for the `p2000-api` crate.
///
/// Covers every failure mode of the wire layer: session token bootstrap,
/// HTTP transport, WebSocket transport, and frame parsing.
/// `p2000-core` maps these into session-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Token bootstrap ─────────────────────────────────────────────
    /// The monitor endpoint answered, but no usable session token could
    /// be extracted (cookie absent, truncated, or in an unexpected shape).
    #[error("Session token unavailable: {message}")]
    Token { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed (handshake, read, or write).
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// The server closed the WebSocket with a non-normal close code.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    // ── Protocol ────────────────────────────────────────────────────
    /// A frame that is neither a control object nor an alert batch.
    #[error("Protocol violation: {message}")]
    Protocol { message: String },
}

impl Error {
    /// Returns `true` for failures that belong to the network class:
    /// bootstrap, HTTP, and WebSocket transport errors.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Token { .. }
                | Self::Transport(_)
                | Self::Timeout { .. }
                | Self::WebSocketConnect(_)
                | Self::WebSocketClosed { .. }
        )
    }

    pub(crate) fn token(message: impl Into<String>) -> Self {
        Self::Token {
            message: message.into(),
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}
