//! Priority classes for viewer input.

use crate::protocol::messages::ControlAction;

/// Drain priority of an input event.  Lower ranks drain first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventClass {
    PointerMove = 0,
    Wheel = 1,
    Button = 2,
    Keyboard = 3,
}

impl EventClass {
    /// Every class in drain order.
    pub const ALL: [EventClass; 4] = [
        EventClass::PointerMove,
        EventClass::Wheel,
        EventClass::Button,
        EventClass::Keyboard,
    ];

    /// Numeric rank; `0` drains first.
    pub fn rank(self) -> usize {
        self as usize
    }
}

impl ControlAction {
    /// Returns the drain class of this action.
    ///
    /// `blur` has no class: it bypasses the queues and releases held input
    /// immediately.
    pub fn class(&self) -> Option<EventClass> {
        match self {
            ControlAction::MouseMove(_) => Some(EventClass::PointerMove),
            ControlAction::Wheel(_) => Some(EventClass::Wheel),
            ControlAction::MouseDown(_)
            | ControlAction::MouseUp(_)
            | ControlAction::Click(_)
            | ControlAction::RightClick(_) => Some(EventClass::Button),
            ControlAction::KeyDown(_) | ControlAction::KeyUp(_) => Some(EventClass::Keyboard),
            ControlAction::Blur => None,
        }
    }
}
