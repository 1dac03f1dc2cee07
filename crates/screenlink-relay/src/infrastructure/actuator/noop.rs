//! An actuator that injects nothing.

use screenlink_core::protocol::PointerButton;

use crate::application::actuator::{ActuatorError, InputActuator};

/// Stand-in used when no injection capability is present.
#[derive(Debug, Clone, Copy)]
pub struct NoopActuator {
    surface: (u32, u32),
}

impl NoopActuator {
    /// `surface` is still reported so pixel conversion stays consistent with
    /// what hosts see.
    pub fn new(surface: (u32, u32)) -> Self {
        Self { surface }
    }
}

impl InputActuator for NoopActuator {
    fn is_available(&self) -> bool {
        false
    }

    fn surface_size(&self) -> Option<(u32, u32)> {
        Some(self.surface)
    }

    fn move_to(&self, _x: i32, _y: i32) -> Result<(), ActuatorError> {
        Err(ActuatorError::Unavailable)
    }

    fn button_toggle(&self, _button: PointerButton, _down: bool) -> Result<(), ActuatorError> {
        Err(ActuatorError::Unavailable)
    }

    fn scroll(&self, _dx: i32, _dy: i32) -> Result<(), ActuatorError> {
        Err(ActuatorError::Unavailable)
    }

    fn key_toggle(&self, _key: &str, _down: bool) -> Result<(), ActuatorError> {
        Err(ActuatorError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_is_unavailable_but_knows_its_surface() {
        let noop = NoopActuator::new((800, 600));
        assert!(!noop.is_available());
        assert_eq!(noop.surface_size(), Some((800, 600)));
        assert_eq!(noop.scroll(0, 1), Err(ActuatorError::Unavailable));
    }
}
