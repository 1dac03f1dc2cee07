//! screenlink-relay library crate.
//!
//! The relay brokers session setup between *hosts* (sharing a screen) and
//! *viewers* (watching it), and forwards viewer input back to hosts.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Browser endpoints (JSON text frames + 8-byte binary pointer frames)
//!         ↕
//! [screenlink-relay]
//!   ├── domain/           RelayConfig and its TOML file form
//!   ├── application/      registry, peer resolver, router, input pipeline,
//!   │                     lifecycle hub, actuator trait
//!   └── infrastructure/
//!         ├── ws_server/  WebSocket accept loop (tokio-tungstenite)
//!         └── actuator/   no-op and recording actuators
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O beyond reading its own config file.
//! - `application` depends on `domain` and `screenlink-core`; it talks to
//!   sockets only through bounded outbound queues.
//! - `infrastructure` owns the sockets and the concrete actuators.

/// Domain layer: configuration types.
pub mod domain;

/// Application layer: registry, routing and the input pipeline.
pub mod application;

/// Infrastructure layer: WebSocket server and actuator adapters.
pub mod infrastructure;
