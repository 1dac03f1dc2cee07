//! Key name translation from DOM keyboard events to actuator key names.
//!
//! Viewers report keys the way a browser `KeyboardEvent` does: a layout
//! dependent `key` (`"a"`, `"A"`, `"Enter"`) and a physical `code`
//! (`"KeyA"`, `"Enter"`, `"ShiftLeft"`).  Actuators want one lowercase name
//! per physical key (`"a"`, `"enter"`, `"shift"`).
//!
//! # Key code translation
//!
//! `code` is tried first because it does not change with Shift or the
//! keyboard layout.  When `code` is empty or unknown, `key` is used.  Keys
//! neither can name are still relayed to hosts but never actuated.

use std::fmt;

use crate::protocol::messages::KeyStroke;

/// A modifier key, without left/right distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Shift,
    Control,
    Alt,
    Meta,
}

impl Modifier {
    /// All modifiers, in release order.
    pub const ALL: [Modifier; 4] = [Modifier::Shift, Modifier::Control, Modifier::Alt, Modifier::Meta];

    /// The actuator key name for this modifier.
    pub fn actuator_key(self) -> &'static str {
        match self {
            Modifier::Shift => "shift",
            Modifier::Control => "control",
            Modifier::Alt => "alt",
            Modifier::Meta => "command",
        }
    }

    /// The DOM `KeyboardEvent.key` value for this modifier.
    pub fn dom_key(self) -> &'static str {
        match self {
            Modifier::Shift => "Shift",
            Modifier::Control => "Control",
            Modifier::Alt => "Alt",
            Modifier::Meta => "Meta",
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.actuator_key())
    }
}

/// The modifier flags carried on every keyboard event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierSet {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
    pub meta: bool,
}

impl ModifierSet {
    /// Reads `shiftKey` / `ctrlKey` / `altKey` / `metaKey` off a stroke.
    pub fn from_stroke(stroke: &KeyStroke) -> Self {
        Self {
            shift: stroke.shift_key,
            control: stroke.ctrl_key,
            alt: stroke.alt_key,
            meta: stroke.meta_key,
        }
    }

    pub fn contains(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Shift => self.shift,
            Modifier::Control => self.control,
            Modifier::Alt => self.alt,
            Modifier::Meta => self.meta,
        }
    }
}

/// Returns the modifier a keyboard event refers to, if it is one.
pub fn modifier_for(key: &str, code: &str) -> Option<Modifier> {
    match code {
        "ShiftLeft" | "ShiftRight" => return Some(Modifier::Shift),
        "ControlLeft" | "ControlRight" => return Some(Modifier::Control),
        "AltLeft" | "AltRight" => return Some(Modifier::Alt),
        "MetaLeft" | "MetaRight" | "OSLeft" | "OSRight" => return Some(Modifier::Meta),
        _ => {}
    }
    match key {
        "Shift" => Some(Modifier::Shift),
        "Control" => Some(Modifier::Control),
        "Alt" | "AltGraph" => Some(Modifier::Alt),
        "Meta" | "OS" => Some(Modifier::Meta),
        _ => None,
    }
}

/// Translates a DOM `key`/`code` pair to an actuator key name.
///
/// Returns `None` if neither value names a key the actuator knows.
///
/// # Examples
///
/// ```rust
/// use screenlink_core::keymap::actuator_key;
///
/// assert_eq!(actuator_key("A", "KeyA").as_deref(), Some("a"));
/// assert_eq!(actuator_key("Enter", "NumpadEnter").as_deref(), Some("enter"));
/// assert_eq!(actuator_key("Unidentified", ""), None);
/// ```
pub fn actuator_key(key: &str, code: &str) -> Option<String> {
    if let Some(modifier) = modifier_for(key, code) {
        return Some(modifier.actuator_key().to_string());
    }
    from_code(code).or_else(|| from_key(key))
}

fn from_code(code: &str) -> Option<String> {
    if let Some(letter) = code.strip_prefix("Key") {
        return single_char(letter, |c| c.is_ascii_alphabetic()).map(|c| c.to_ascii_lowercase().to_string());
    }
    if let Some(digit) = code.strip_prefix("Digit") {
        return single_char(digit, |c| c.is_ascii_digit()).map(String::from);
    }
    if let Some(digit) = code.strip_prefix("Numpad") {
        if let Some(d) = single_char(digit, |c| c.is_ascii_digit()) {
            return Some(format!("numpad_{d}"));
        }
    }
    if let Some(n) = function_key(code) {
        return Some(n);
    }

    let name = match code {
        "Enter" | "NumpadEnter" => "enter",
        "Backspace" => "backspace",
        "Tab" => "tab",
        "Escape" => "escape",
        "Space" => "space",
        "ArrowUp" => "up",
        "ArrowDown" => "down",
        "ArrowLeft" => "left",
        "ArrowRight" => "right",
        "Delete" => "delete",
        "Home" => "home",
        "End" => "end",
        "PageUp" => "pageup",
        "PageDown" => "pagedown",
        "Insert" => "insert",
        "CapsLock" => "capslock",
        "Minus" => "-",
        "Equal" => "=",
        "BracketLeft" => "[",
        "BracketRight" => "]",
        "Backslash" => "\\",
        "Semicolon" => ";",
        "Quote" => "'",
        "Comma" => ",",
        "Period" => ".",
        "Slash" => "/",
        "Backquote" => "`",
        _ => return None,
    };
    Some(name.to_string())
}

fn from_key(key: &str) -> Option<String> {
    if let Some(n) = function_key(key) {
        return Some(n);
    }

    let name = match key {
        "Enter" => "enter",
        "Backspace" => "backspace",
        "Tab" => "tab",
        "Escape" | "Esc" => "escape",
        " " | "Spacebar" => "space",
        "ArrowUp" | "Up" => "up",
        "ArrowDown" | "Down" => "down",
        "ArrowLeft" | "Left" => "left",
        "ArrowRight" | "Right" => "right",
        "Delete" | "Del" => "delete",
        "Home" => "home",
        "End" => "end",
        "PageUp" => "pageup",
        "PageDown" => "pagedown",
        "Insert" => "insert",
        "CapsLock" => "capslock",
        other => {
            let mut chars = other.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) if !c.is_control() => Some(c.to_lowercase().collect()),
                _ => None,
            };
        }
    };
    Some(name.to_string())
}

/// `F1`..`F12` → `f1`..`f12`.
fn function_key(s: &str) -> Option<String> {
    let n: u8 = s.strip_prefix('F')?.parse().ok()?;
    (1..=12).contains(&n).then(|| format!("f{n}"))
}

fn single_char(s: &str, accept: impl Fn(char) -> bool) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if accept(c) => Some(c),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
