//! WebSocket transport for the live feed.
//!
//! Opens the connection and splits it into a [`FrameWriter`] and a
//! [`FrameReader`] that speak text frames only. Session semantics (the
//! handshake, keepalive, state) live in `p2000-core`; this module never
//! reconnects on its own.
//!
//! # Example
//!
//! ```rust,ignore
//! use p2000_api::websocket::WebSocketConnection;
//! use p2000_api::Request;
//! use url::Url;
//!
//! let url = Url::parse("wss://www.livep2000.nl/LSM/websocket")?;
//! let (mut writer, mut reader) = WebSocketConnection::connect(&url, None).await?.split();
//!
//! writer.send(&Request::ping()).await?;
//! while let Some(text) = reader.next_text().await {
//!     println!("{}", text?);
//! }
//! ```

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::Error;
use crate::protocol::Request;

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ── Connection ───────────────────────────────────────────────────────

/// An open WebSocket connection, before it is split into halves.
pub struct WebSocketConnection {
    stream: Stream,
}

impl WebSocketConnection {
    /// Establish a connection.
    ///
    /// If `user_agent` is provided, it's sent as the `User-Agent` header on
    /// the upgrade request, matching the bootstrap request.
    pub async fn connect(url: &Url, user_agent: Option<&str>) -> Result<Self, Error> {
        tracing::info!(url = %url, "Connecting to WebSocket");

        let uri: tungstenite::http::Uri = url
            .as_str()
            .parse()
            .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

        let mut request = ClientRequestBuilder::new(uri);
        if let Some(agent) = user_agent {
            request = request.with_header("User-Agent", agent);
        }

        let (stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        tracing::info!("WebSocket connected");
        Ok(Self { stream })
    }

    /// Split into independently owned write and read halves.
    pub fn split(self) -> (FrameWriter, FrameReader) {
        let (sink, stream) = self.stream.split();
        (FrameWriter { sink }, FrameReader { stream })
    }
}

// ── Write half ───────────────────────────────────────────────────────

/// Sends encoded [`Request`]s, in call order.
pub struct FrameWriter {
    sink: SplitSink<Stream, tungstenite::Message>,
}

impl FrameWriter {
    pub async fn send(&mut self, request: &Request) -> Result<(), Error> {
        tracing::trace!(command = %request.command(), "sending frame");
        self.sink
            .send(tungstenite::Message::text(request.encode()))
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))
    }

    /// Send a close frame and flush. Errors are logged, not returned:
    /// the connection is going away either way.
    pub async fn close(&mut self) {
        if let Err(e) = self.sink.close().await {
            tracing::debug!(error = %e, "WebSocket close failed");
        }
    }
}

// ── Read half ────────────────────────────────────────────────────────

/// Yields inbound text frames until the connection ends.
pub struct FrameReader {
    stream: SplitStream<Stream>,
}

impl FrameReader {
    /// Wait for the next text frame.
    ///
    /// Returns `None` once the server closes normally or the stream ends,
    /// and `Some(Err(_))` on a transport error. A close frame with any
    /// other code, or a reset without a close handshake, yields
    /// [`Error::WebSocketClosed`]. Binary frames are read as UTF-8 text;
    /// ping/pong are answered by tungstenite.
    pub async fn next_text(&mut self) -> Option<Result<String, Error>> {
        loop {
            match self.stream.next().await? {
                Ok(tungstenite::Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(tungstenite::Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Discarding non-UTF-8 binary frame");
                    }
                },
                Ok(tungstenite::Message::Close(Some(cf))) if cf.code != CloseCode::Normal => {
                    tracing::info!(
                        code = %cf.code,
                        reason = %cf.reason,
                        "WebSocket close frame received"
                    );
                    return Some(Err(Error::WebSocketClosed {
                        code: cf.code.into(),
                        reason: cf.reason.as_str().to_owned(),
                    }));
                }
                Ok(tungstenite::Message::Close(_)) => {
                    tracing::info!("WebSocket closed normally");
                    return None;
                }
                Ok(tungstenite::Message::Ping(_)) => {
                    tracing::trace!("WebSocket ping");
                }
                Ok(_) => {
                    // Pong, raw Frame -- ignore
                }
                Err(
                    tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed,
                ) => return None,
                Err(tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake)) => {
                    return Some(Err(Error::WebSocketClosed {
                        code: CloseCode::Abnormal.into(),
                        reason: "reset without closing handshake".into(),
                    }));
                }
                Err(e) => return Some(Err(Error::WebSocketConnect(e.to_string()))),
            }
        }
    }
}
