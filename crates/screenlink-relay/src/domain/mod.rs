//! Domain layer for screenlink-relay.
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, `TcpStream`, or `WebSocket` types
//! - Environment variable or CLI reading (that is done in `main.rs`)

pub mod config;

pub use config::{ConfigError, RelayConfig};
