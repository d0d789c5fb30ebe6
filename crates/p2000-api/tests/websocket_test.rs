// Integration tests for the WebSocket transport against a local server.
#![allow(clippy::unwrap_used)]

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use url::Url;

use p2000_api::{Error, Request, WebSocketConnection};

// ── Helpers ─────────────────────────────────────────────────────────

/// Accept one connection, send `frames`, then close with `close`.
async fn serve(frames: Vec<Message>, close: Option<CloseFrame>) -> (Url, JoinHandle<Option<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let first = match ws.next().await {
            Some(Ok(Message::Text(text))) => Some(text.as_str().to_owned()),
            _ => None,
        };
        for frame in frames {
            ws.send(frame).await.unwrap();
        }
        ws.close(close).await.unwrap();
        // Drain until the client acknowledges the close.
        while let Some(Ok(_)) = ws.next().await {}
        first
    });
    (Url::parse(&format!("ws://{addr}/LSM/websocket")).unwrap(), handle)
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_text_and_binary_frames_are_read() {
    let (url, server) = serve(
        vec![
            Message::text(r#"{"COM":7}"#),
            Message::binary(br#"{"COM":29}"#.to_vec()),
        ],
        None,
    )
    .await;

    let (mut writer, mut reader) = WebSocketConnection::connect(&url, Some("p2000-test"))
        .await
        .unwrap()
        .split();
    writer.send(&Request::ping()).await.unwrap();

    assert_eq!(reader.next_text().await.unwrap().unwrap(), r#"{"COM":7}"#);
    assert_eq!(reader.next_text().await.unwrap().unwrap(), r#"{"COM":29}"#);
    assert!(reader.next_text().await.is_none(), "close without payload ends the stream");
    drop((writer, reader));

    assert_eq!(server.await.unwrap().as_deref(), Some(r#"{"COM":38}"#));
}

#[tokio::test]
async fn test_normal_close_ends_the_stream() {
    let (url, server) = serve(
        Vec::new(),
        Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "bye".into(),
        }),
    )
    .await;

    let (mut writer, mut reader) = WebSocketConnection::connect(&url, None).await.unwrap().split();
    writer.send(&Request::ping()).await.unwrap();

    assert!(reader.next_text().await.is_none());
    drop((writer, reader));
    server.await.unwrap();
}

#[tokio::test]
async fn test_abnormal_close_reports_code_and_reason() {
    let (url, server) = serve(
        Vec::new(),
        Some(CloseFrame {
            code: CloseCode::Error,
            reason: "maintenance".into(),
        }),
    )
    .await;

    let (mut writer, mut reader) = WebSocketConnection::connect(&url, None).await.unwrap().split();
    writer.send(&Request::ping()).await.unwrap();

    let err = reader.next_text().await.unwrap().unwrap_err();
    match err {
        Error::WebSocketClosed { code, reason } => {
            assert_eq!(code, 1011);
            assert_eq!(reason, "maintenance");
        }
        other => panic!("expected WebSocketClosed, got {other:?}"),
    }
    drop((writer, reader));
    server.await.unwrap();
}

#[tokio::test]
async fn test_refused_connection_is_a_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("ws://{addr}/LSM/websocket")).unwrap();
    let err = WebSocketConnection::connect(&url, None).await.err().unwrap();
    assert!(matches!(err, Error::WebSocketConnect(_)), "got {err:?}");
    assert!(err.is_network());
}
