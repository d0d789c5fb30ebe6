// p2000-api: Wire-level client for the LiveP2000 dispatch feed (token bootstrap + WebSocket protocol)

pub mod error;
pub mod protocol;
pub mod token;
pub mod transport;
pub mod websocket;

pub use error::Error;
pub use protocol::{Command, Frame, RawAlert, RawCapcode, Request};
pub use token::fetch_token;
pub use transport::TransportConfig;
pub use websocket::{FrameReader, FrameWriter, WebSocketConnection};
