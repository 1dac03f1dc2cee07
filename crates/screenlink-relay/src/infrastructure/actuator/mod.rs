//! Actuator adapters.
//!
//! Real OS injection lives outside this crate.  The relay ships with:
//!
//! - [`NoopActuator`]: reports itself unavailable, so viewer input is only
//!   relayed to hosts.  This is what the binary runs with.
//! - [`RecordingActuator`]: remembers every call, for tests and dry runs.

pub mod noop;
pub mod recording;

pub use noop::NoopActuator;
pub use recording::{ActuatorCall, RecordingActuator};
