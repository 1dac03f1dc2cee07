//! The input actuator boundary.
//!
//! The actuator is whatever injects input into the host machine's OS.  It is
//! an external capability: the relay calls it through [`InputActuator`] and
//! carries on relay-only when it is absent.

use screenlink_core::protocol::PointerButton;
use thiserror::Error;

/// Error type for actuator calls.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActuatorError {
    /// No injection capability in this process.
    #[error("input actuator unavailable")]
    Unavailable,

    /// The platform refused the event.
    #[error("actuator rejected event: {0}")]
    Rejected(String),
}

/// Platform-agnostic input injection.
///
/// Coordinates are absolute device pixels on the surface reported by
/// [`surface_size`](Self::surface_size).
#[cfg_attr(test, mockall::automock)]
pub trait InputActuator: Send + Sync {
    /// Whether calls can have any effect.
    fn is_available(&self) -> bool;

    /// Pixel size of the controlled surface, if known.
    fn surface_size(&self) -> Option<(u32, u32)>;

    /// Moves the cursor to an absolute position.
    fn move_to(&self, x: i32, y: i32) -> Result<(), ActuatorError>;

    /// Presses or releases a mouse button at the current cursor position.
    fn button_toggle(&self, button: PointerButton, down: bool) -> Result<(), ActuatorError>;

    /// Scrolls by a pixel amount.
    fn scroll(&self, dx: i32, dy: i32) -> Result<(), ActuatorError>;

    /// Presses or releases a key by actuator key name (see
    /// [`screenlink_core::keymap`]).
    fn key_toggle(&self, key: &str, down: bool) -> Result<(), ActuatorError>;
}

/// One call the pipeline wants made on the actuator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actuation {
    MoveTo { x: i32, y: i32 },
    Button { button: PointerButton, down: bool },
    Scroll { dx: i32, dy: i32 },
    Key { key: String, down: bool },
}

impl Actuation {
    /// Performs this actuation.
    ///
    /// # Errors
    ///
    /// Returns whatever the actuator returns.
    pub fn apply(&self, actuator: &dyn InputActuator) -> Result<(), ActuatorError> {
        match self {
            Actuation::MoveTo { x, y } => actuator.move_to(*x, *y),
            Actuation::Button { button, down } => actuator.button_toggle(*button, *down),
            Actuation::Scroll { dx, dy } => actuator.scroll(*dx, *dy),
            Actuation::Key { key, down } => actuator.key_toggle(key, *down),
        }
    }
}
