// ── Session state machine ──
//
// Pure protocol logic for one feed connection: which frame to send at
// open, how to react to each inbound frame, and when to probe a silent
// connection. No I/O happens here; the client's session task feeds
// frames in and writes the returned requests out.

use std::fmt;

use secrecy::SecretString;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use p2000_api::{Command, Frame, Request};

use crate::convert::decode_batch;
use crate::keepalive::KeepaliveMonitor;
use crate::model::Alert;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    /// Token fetched, transport being opened.
    Connecting,
    /// Handshake sent, waiting for `AUTr`.
    AwaitingAuthResponse,
    /// Data requested, waiting for `STAc`. Batches are held back.
    AwaitingUnlock,
    /// Unlocked: alert batches are delivered.
    Ready,
}

impl ConnectionState {
    /// Whether a transport is open in this state.
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Disconnected | Self::Connecting)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingAuthResponse => "awaiting authentication",
            Self::AwaitingUnlock => "awaiting unlock",
            Self::Ready => "ready",
        })
    }
}

// ── Dispatch ─────────────────────────────────────────────────────

/// What the session task must do after one inbound frame.
#[derive(Debug, Default)]
pub struct Dispatch {
    /// Frame to write back on the same connection.
    pub reply: Option<Request>,
    /// Non-empty batch to publish to subscribers.
    pub alerts: Option<Vec<Alert>>,
}

// ── Session ──────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Session {
    state: ConnectionState,
    last_message: Option<Instant>,
    keepalive: KeepaliveMonitor,
}

impl Session {
    pub fn new(keepalive: KeepaliveMonitor) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            last_message: None,
            keepalive,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Arrival time of the newest inbound frame on this connection.
    pub fn last_message(&self) -> Option<Instant> {
        self.last_message
    }

    pub fn begin_connect(&mut self) {
        self.state = ConnectionState::Connecting;
        self.last_message = None;
    }

    /// Transport is open. Returns the handshake, which must be the first
    /// frame written.
    pub fn on_open(&mut self, token: &SecretString) -> Request {
        self.state = ConnectionState::AwaitingAuthResponse;
        Request::auth(token)
    }

    /// Handle one inbound text frame received at `now`.
    ///
    /// Malformed frames are logged and discarded; the connection stays up.
    pub fn on_frame(&mut self, text: &str, now: Instant) -> Dispatch {
        self.last_message = Some(now);

        match Frame::parse(text) {
            Ok(Frame::Control { command, payload }) => self.on_control(command, &payload),
            Ok(Frame::Batch(items)) => self.on_batch(&items),
            Err(e) => {
                warn!(error = %e, "discarding malformed frame");
                Dispatch::default()
            }
        }
    }

    fn on_control(&mut self, command: Command, payload: &Map<String, Value>) -> Dispatch {
        match command {
            Command::AuthResponse => {
                debug!("authentication accepted, requesting data");
                if self.state == ConnectionState::AwaitingAuthResponse {
                    self.state = ConnectionState::AwaitingUnlock;
                }
                Dispatch {
                    reply: Some(Request::data()),
                    alerts: None,
                }
            }
            Command::Unlock => {
                if self.state != ConnectionState::Ready {
                    info!("feed unlocked");
                }
                self.state = ConnectionState::Ready;
                Dispatch::default()
            }
            Command::PingResponse => {
                trace!("ping answered");
                Dispatch::default()
            }
            other => {
                debug!(
                    command = %other,
                    fields = ?payload.keys().collect::<Vec<_>>(),
                    "ignoring control frame"
                );
                Dispatch::default()
            }
        }
    }

    fn on_batch(&self, items: &[Value]) -> Dispatch {
        let alerts = decode_batch(items);
        if alerts.is_empty() {
            return Dispatch::default();
        }
        if self.state != ConnectionState::Ready {
            debug!(
                count = alerts.len(),
                state = %self.state,
                "holding back batch received before unlock"
            );
            return Dispatch::default();
        }
        Dispatch {
            reply: None,
            alerts: Some(alerts),
        }
    }

    /// Keepalive check. Returns a probe when the connection has been
    /// silent past the idle timeout.
    pub fn on_tick(&self, now: Instant) -> Option<Request> {
        (self.state.is_open() && self.keepalive.probe_due(self.last_message, now))
            .then(Request::ping)
    }

    pub fn on_close(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.last_message = None;
    }
}
