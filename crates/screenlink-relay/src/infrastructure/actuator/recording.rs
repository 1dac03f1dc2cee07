//! An actuator that records calls instead of injecting them.
//!
//! Used by integration tests to observe what the pipeline actuates, and by
//! `--dry-run` to log it.

use std::sync::{Mutex, PoisonError};

use screenlink_core::protocol::PointerButton;
use tracing::debug;

use crate::application::actuator::{ActuatorError, InputActuator};

/// One recorded actuator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActuatorCall {
    Move(i32, i32),
    Button(PointerButton, bool),
    Scroll(i32, i32),
    Key(String, bool),
}

/// Records every call in order.
#[derive(Debug)]
pub struct RecordingActuator {
    pub calls: Mutex<Vec<ActuatorCall>>,
    /// When `true`, every call is recorded and then rejected.
    pub should_fail: bool,
    surface: (u32, u32),
}

impl RecordingActuator {
    pub fn new(surface: (u32, u32)) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            should_fail: false,
            surface,
        }
    }

    /// An actuator that records every call and then rejects it.
    pub fn failing(surface: (u32, u32)) -> Self {
        Self {
            should_fail: true,
            ..Self::new(surface)
        }
    }

    /// Copy of everything recorded so far.
    pub fn calls(&self) -> Vec<ActuatorCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Key calls only, as `(key, down)`.
    pub fn key_calls(&self) -> Vec<(String, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ActuatorCall::Key(key, down) => Some((key, down)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ActuatorCall) -> Result<(), ActuatorError> {
        debug!(?call, "actuate");
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        if self.should_fail {
            return Err(ActuatorError::Rejected("recording actuator set to fail".into()));
        }
        Ok(())
    }
}

impl InputActuator for RecordingActuator {
    fn is_available(&self) -> bool {
        true
    }

    fn surface_size(&self) -> Option<(u32, u32)> {
        Some(self.surface)
    }

    fn move_to(&self, x: i32, y: i32) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::Move(x, y))
    }

    fn button_toggle(&self, button: PointerButton, down: bool) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::Button(button, down))
    }

    fn scroll(&self, dx: i32, dy: i32) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::Scroll(dx, dy))
    }

    fn key_toggle(&self, key: &str, down: bool) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::Key(key.to_string(), down))
    }
}
