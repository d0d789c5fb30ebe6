// ── Domain model ──
//
// Typed alert records produced by the decoder. Consumers (CLI, library
// users) depend on these, never on the raw wire shapes in `p2000_api`.

pub mod alert;

pub use alert::{Alert, Capcode, ServiceType};
