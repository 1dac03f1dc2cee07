//! Pure building blocks of the viewer input pipeline.
//!
//! # Sub-modules
//!
//! - [`event`]: priority classes for control actions
//! - [`pending`]: per-class bounded queues with a coalescing pointer slot
//! - [`motion`]: the pointer rate and distance filter
//! - [`held`]: tracking of held modifiers, keys and buttons
//!
//! Nothing here does I/O or touches a clock; callers pass `Instant`s in.

pub mod event;
pub mod held;
pub mod motion;
pub mod pending;

pub use event::EventClass;
pub use held::{HeldInputs, Released};
pub use motion::{MotionFilter, MotionVerdict};
pub use pending::{PendingEvents, PushOutcome};
