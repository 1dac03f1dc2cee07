//! Application layer for screenlink-relay.
//!
//! The application layer knows *what* happens to each inbound frame: who is
//! registered as what, who a signal goes to, and how viewer input turns into
//! host notices and actuator calls.
//!
//! # What does NOT belong here?
//!
//! - Binding sockets or WebSocket framing (that is infrastructure)
//! - Concrete actuator implementations (also infrastructure)

pub mod actuator;
pub mod lifecycle;
pub mod outbound;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod router;

pub use actuator::{Actuation, ActuatorError, InputActuator};
pub use lifecycle::{RelayError, RelayHub};
pub use outbound::Outbound;
pub use pipeline::{Admission, ControlState, Dispatch, PendingInput, PipelineSettings};
pub use registry::{Registry, RegistryError, Summary};
pub use resolver::{resolve, RouteMiss};
pub use router::{relay_control, route_signal};
