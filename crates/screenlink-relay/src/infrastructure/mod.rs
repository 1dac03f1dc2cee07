//! Infrastructure layer for screenlink-relay.
//!
//! # Responsibilities
//!
//! - Binding the TCP listener and performing the WebSocket upgrade
//! - One reader and one writer task per connection
//! - The graceful shutdown sequence
//! - Concrete [`InputActuator`](crate::application::InputActuator)
//!   implementations
//!
//! # What does NOT belong here?
//!
//! - Routing decisions or registry state (that is the application layer)

pub mod actuator;
pub mod ws_server;

pub use actuator::{ActuatorCall, NoopActuator, RecordingActuator};
pub use ws_server::{run_server, serve};
