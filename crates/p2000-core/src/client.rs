// ── Feed client ──
//
// Lifecycle management for one LiveP2000 feed connection: token
// bootstrap, transport open, and a single session task that owns the
// socket, the keepalive timer, and the protocol state. Consumers observe
// it through a state watch channel and an event broadcast.

use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use p2000_api::WebSocketConnection;

use crate::config::ClientConfig;
use crate::error::CoreError;
use crate::keepalive::KeepaliveMonitor;
use crate::model::Alert;
use crate::session::{ConnectionState, Session};

const EVENT_CHANNEL_SIZE: usize = 256;

// ── SessionEvent ─────────────────────────────────────────────────

/// Lifecycle and data notifications, in the order they happened.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Transport opened and handshake sent.
    Connected,
    /// Transport closed, for any reason.
    Disconnected,
    /// One decoded, non-empty batch received after unlock.
    AlertsReceived(Arc<[Alert]>),
}

// ── Client ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ClientInner>`. At most one session runs
/// at a time; a dropped connection is reported, never retried.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    channels: SessionChannels,
    active: Mutex<Option<ActiveSession>>,
}

struct ActiveSession {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if let Some(session) = self.active.get_mut().take() {
            session.cancel.cancel();
        }
    }
}

impl Client {
    /// Create a client. Does NOT connect -- call [`connect()`](Self::connect).
    pub fn new(config: ClientConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        Self {
            inner: Arc::new(ClientInner {
                config,
                channels: SessionChannels {
                    state: Arc::new(state_tx),
                    events: event_tx,
                },
                active: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to lifecycle and alert events. Subscribe before
    /// connecting to see every event.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.channels.events.subscribe()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.channels.state.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.channels.state.subscribe()
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Obtain a session token from the monitor page.
    pub async fn fetch_token(&self) -> Result<SecretString, CoreError> {
        let config = &self.inner.config;
        Ok(p2000_api::fetch_token(&config.transport(), &config.monitor_url).await?)
    }

    /// Fetch a token, open the feed, and start the session task.
    ///
    /// Returns once the transport is open and the handshake is queued.
    /// Unlock and alerts arrive later through [`subscribe()`](Self::subscribe).
    pub async fn connect(&self) -> Result<(), CoreError> {
        let mut active = self.inner.active.lock().await;
        ensure_idle(active.as_ref())?;

        self.inner.channels.publish(ConnectionState::Connecting);
        let token = match self.fetch_token().await {
            Ok(token) => token,
            Err(e) => {
                self.inner.channels.publish(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        *active = Some(self.open(token).await?);
        Ok(())
    }

    /// Open the feed with a token obtained elsewhere.
    pub async fn connect_with_token(&self, token: SecretString) -> Result<(), CoreError> {
        let mut active = self.inner.active.lock().await;
        ensure_idle(active.as_ref())?;

        self.inner.channels.publish(ConnectionState::Connecting);
        *active = Some(self.open(token).await?);
        Ok(())
    }

    async fn open(&self, token: SecretString) -> Result<ActiveSession, CoreError> {
        let config = &self.inner.config;

        let connection =
            match WebSocketConnection::connect(&config.websocket_url, Some(&config.user_agent))
                .await
            {
                Ok(connection) => connection,
                Err(e) => {
                    self.inner.channels.publish(ConnectionState::Disconnected);
                    return Err(CoreError::ConnectionFailed {
                        url: config.websocket_url.to_string(),
                        reason: e.to_string(),
                    });
                }
            };

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(session_task(
            connection,
            token,
            config.keepalive,
            self.inner.channels.clone(),
            cancel.clone(),
        ));

        Ok(ActiveSession { cancel, handle })
    }

    /// Close the running session, if any, and wait for it to finish.
    pub async fn disconnect(&self) {
        let active = self.inner.active.lock().await.take();
        if let Some(session) = active {
            session.cancel.cancel();
            if let Err(e) = session.handle.await {
                warn!(error = %e, "session task ended abnormally");
            }
        }
        debug!("disconnected");
    }
}

fn ensure_idle(active: Option<&ActiveSession>) -> Result<(), CoreError> {
    match active {
        Some(session) if !session.handle.is_finished() => {
            warn!("connect called while a session is running");
            Err(CoreError::AlreadyConnected)
        }
        _ => Ok(()),
    }
}

// ── Session task ─────────────────────────────────────────────────

/// What the session task needs from the client. Holding these instead of
/// the client itself lets a dropped client end its session.
#[derive(Clone)]
struct SessionChannels {
    state: Arc<watch::Sender<ConnectionState>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionChannels {
    /// Update the observable state. Stored even with no watchers.
    fn publish(&self, state: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

/// Owns one connection from handshake to close. Every frame is handled
/// to completion before the next one is read, and every write goes
/// through this task, so outbound frames keep their order.
async fn session_task(
    connection: WebSocketConnection,
    token: SecretString,
    keepalive: KeepaliveMonitor,
    channels: SessionChannels,
    cancel: CancellationToken,
) {
    let (mut writer, mut reader) = connection.split();
    let mut session = Session::new(keepalive);
    session.begin_connect();

    let hello = session.on_open(&token);
    drop(token);
    channels.publish(session.state());
    channels.emit(SessionEvent::Connected);

    let mut ticker = keepalive.ticker();

    let reason = if let Err(e) = writer.send(&hello).await {
        warn!(error = %e, "handshake send failed");
        "handshake failed"
    } else {
        info!("handshake sent, awaiting authentication");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    writer.close().await;
                    break "closed by client";
                }
                frame = reader.next_text() => match frame {
                    Some(Ok(text)) => {
                        let dispatch = session.on_frame(&text, Instant::now());
                        channels.publish(session.state());

                        if let Some(reply) = dispatch.reply {
                            if let Err(e) = writer.send(&reply).await {
                                warn!(error = %e, "reply send failed");
                                break "send failed";
                            }
                        }
                        if let Some(alerts) = dispatch.alerts {
                            debug!(count = alerts.len(), "delivering alert batch");
                            channels.emit(SessionEvent::AlertsReceived(alerts.into()));
                        }
                    }
                    Some(Err(e @ p2000_api::Error::WebSocketClosed { .. })) => {
                        info!(error = %e, "feed closed the connection");
                        break "closed by server";
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket read failed");
                        break "transport error";
                    }
                    None => break "closed by server",
                },
                _ = ticker.tick() => {
                    if let Some(probe) = session.on_tick(Instant::now()) {
                        debug!("connection idle, sending ping");
                        if let Err(e) = writer.send(&probe).await {
                            warn!(error = %e, "ping send failed");
                            break "send failed";
                        }
                    }
                }
            }
        }
    };

    drop(ticker);
    session.on_close();
    channels.publish(session.state());
    channels.emit(SessionEvent::Disconnected);
    info!(reason, "session ended");
}
