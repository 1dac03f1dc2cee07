//! Held-input tracking for stuck-key prevention.
//!
//! Every toggle the pipeline actuates passes through [`HeldInputs`] first.
//! A toggle that would not change state (a second `shift` down, a release
//! of a button that is not held) is reported as redundant so the caller can
//! skip it.  When the viewer goes away or loses focus,
//! [`HeldInputs::release_all`] returns exactly what still needs a release.

use std::collections::BTreeSet;

use crate::keymap::{Modifier, ModifierSet};
use crate::protocol::messages::PointerButton;

/// Everything that was still held when [`HeldInputs::release_all`] ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Released {
    pub modifiers: Vec<Modifier>,
    pub keys: Vec<String>,
    pub buttons: Vec<PointerButton>,
}

impl Released {
    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty() && self.keys.is_empty() && self.buttons.is_empty()
    }
}

/// Modifiers, non-modifier keys and mouse buttons currently held down on
/// behalf of one endpoint.
#[derive(Debug, Clone, Default)]
pub struct HeldInputs {
    modifiers: BTreeSet<Modifier>,
    keys: BTreeSet<String>,
    buttons: BTreeSet<PointerButton>,
}

impl HeldInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `modifier` held.  Returns `false` if it already was.
    pub fn modifier_down(&mut self, modifier: Modifier) -> bool {
        self.modifiers.insert(modifier)
    }

    /// Marks `modifier` released.  Returns `false` if it was not held.
    pub fn modifier_up(&mut self, modifier: Modifier) -> bool {
        self.modifiers.remove(&modifier)
    }

    /// Marks a non-modifier key held.  Returns `false` for an auto-repeat.
    pub fn key_down(&mut self, name: &str) -> bool {
        self.keys.insert(name.to_string())
    }

    /// Marks a non-modifier key released.  Returns `false` if it was not
    /// held.
    pub fn key_up(&mut self, name: &str) -> bool {
        self.keys.remove(name)
    }

    pub fn button_down(&mut self, button: PointerButton) -> bool {
        self.buttons.insert(button)
    }

    pub fn button_up(&mut self, button: PointerButton) -> bool {
        self.buttons.remove(&button)
    }

    pub fn is_modifier_held(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    pub fn is_button_held(&self, button: PointerButton) -> bool {
        self.buttons.contains(&button)
    }

    /// Brings the held modifiers in line with the flags reported on a
    /// keyboard event.
    ///
    /// Returns the toggles needed, as `(modifier, down)`, in
    /// [`Modifier::ALL`] order.  Modifiers pressed or released while the
    /// viewer's page had no focus are reconciled this way.
    pub fn sync_modifiers(&mut self, reported: ModifierSet) -> Vec<(Modifier, bool)> {
        let mut toggles = Vec::new();
        for modifier in Modifier::ALL {
            let want = reported.contains(modifier);
            if want != self.modifiers.contains(&modifier) {
                if want {
                    self.modifiers.insert(modifier);
                } else {
                    self.modifiers.remove(&modifier);
                }
                toggles.push((modifier, want));
            }
        }
        toggles
    }

    /// Clears all state and returns what was held.
    ///
    /// Modifiers are listed last so that releasing in order never produces
    /// a stray chord (e.g. `ctrl` lifted before `c`).
    pub fn release_all(&mut self) -> Released {
        Released {
            keys: std::mem::take(&mut self.keys).into_iter().collect(),
            buttons: std::mem::take(&mut self.buttons).into_iter().collect(),
            modifiers: std::mem::take(&mut self.modifiers).into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty() && self.keys.is_empty() && self.buttons.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
