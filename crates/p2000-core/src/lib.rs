// p2000-core: Session management and alert decoding between p2000-api and consumers (CLI).

pub mod classify;
pub mod client;
pub mod config;
pub mod convert;
pub mod error;
pub mod keepalive;
pub mod markup;
pub mod model;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::{Client, SessionEvent};
pub use config::ClientConfig;
pub use error::{CoreError, DecodeError};
pub use keepalive::KeepaliveMonitor;
pub use session::ConnectionState;

// Re-export model types at the crate root for ergonomics.
pub use model::{Alert, Capcode, ServiceType};
