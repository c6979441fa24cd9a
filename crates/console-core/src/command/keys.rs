//! Key codes, modifier sets and binding triggers.
//!
//! Keys are identified by their USB HID Usage ID (keyboard page 0x07), which
//! is what most engines and OS layers can translate to cheaply.  Each key also
//! has a short lowercase name used on the command line (`bind ctrl+f1 ...`).
//!
//! # Trigger syntax
//!
//! A trigger is zero or more modifier names followed by a key name, joined by
//! `+`: `f5`, `ctrl+s`, `cmd+shift+up`.  Modifier names are `ctrl`, `shift`,
//! `alt` and `cmd` (or `command`).  Parsing is case-insensitive; the canonical
//! display form is `cmd+ctrl+alt+shift+key`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// HID Usage ID of a keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u16)]
pub enum KeyCode {
    // Letters (HID 0x04–0x1D)
    A = 0x04,
    B = 0x05,
    C = 0x06,
    D = 0x07,
    E = 0x08,
    F = 0x09,
    G = 0x0A,
    H = 0x0B,
    I = 0x0C,
    J = 0x0D,
    K = 0x0E,
    L = 0x0F,
    M = 0x10,
    N = 0x11,
    O = 0x12,
    P = 0x13,
    Q = 0x14,
    R = 0x15,
    S = 0x16,
    T = 0x17,
    U = 0x18,
    V = 0x19,
    W = 0x1A,
    X = 0x1B,
    Y = 0x1C,
    Z = 0x1D,

    // Digits (HID 0x1E–0x27)
    Digit1 = 0x1E,
    Digit2 = 0x1F,
    Digit3 = 0x20,
    Digit4 = 0x21,
    Digit5 = 0x22,
    Digit6 = 0x23,
    Digit7 = 0x24,
    Digit8 = 0x25,
    Digit9 = 0x26,
    Digit0 = 0x27,

    // Control and punctuation (HID 0x28–0x38)
    Return = 0x28,
    Escape = 0x29,
    Backspace = 0x2A,
    Tab = 0x2B,
    Space = 0x2C,
    Minus = 0x2D,
    Equals = 0x2E,
    LeftBracket = 0x2F,
    RightBracket = 0x30,
    Backslash = 0x31,
    Semicolon = 0x33,
    Quote = 0x34,
    BackQuote = 0x35,
    Comma = 0x36,
    Period = 0x37,
    Slash = 0x38,

    // Function keys
    F1 = 0x3A,
    F2 = 0x3B,
    F3 = 0x3C,
    F4 = 0x3D,
    F5 = 0x3E,
    F6 = 0x3F,
    F7 = 0x40,
    F8 = 0x41,
    F9 = 0x42,
    F10 = 0x43,
    F11 = 0x44,
    F12 = 0x45,
    F13 = 0x68,
    F14 = 0x69,
    F15 = 0x6A,

    // Navigation cluster (HID 0x48–0x52)
    Pause = 0x48,
    Insert = 0x49,
    Home = 0x4A,
    PageUp = 0x4B,
    Delete = 0x4C,
    End = 0x4D,
    PageDown = 0x4E,
    Right = 0x4F,
    Left = 0x50,
    Down = 0x51,
    Up = 0x52,

    // Keypad (HID 0x54–0x67)
    KeypadDivide = 0x54,
    KeypadMultiply = 0x55,
    KeypadMinus = 0x56,
    KeypadPlus = 0x57,
    KeypadEnter = 0x58,
    Keypad1 = 0x59,
    Keypad2 = 0x5A,
    Keypad3 = 0x5B,
    Keypad4 = 0x5C,
    Keypad5 = 0x5D,
    Keypad6 = 0x5E,
    Keypad7 = 0x5F,
    Keypad8 = 0x60,
    Keypad9 = 0x61,
    Keypad0 = 0x62,
    KeypadPeriod = 0x63,
    KeypadEquals = 0x67,
}

/// Command-line names, one entry per key.
const KEY_NAMES: &[(KeyCode, &str)] = &[
    (KeyCode::A, "a"),
    (KeyCode::B, "b"),
    (KeyCode::C, "c"),
    (KeyCode::D, "d"),
    (KeyCode::E, "e"),
    (KeyCode::F, "f"),
    (KeyCode::G, "g"),
    (KeyCode::H, "h"),
    (KeyCode::I, "i"),
    (KeyCode::J, "j"),
    (KeyCode::K, "k"),
    (KeyCode::L, "l"),
    (KeyCode::M, "m"),
    (KeyCode::N, "n"),
    (KeyCode::O, "o"),
    (KeyCode::P, "p"),
    (KeyCode::Q, "q"),
    (KeyCode::R, "r"),
    (KeyCode::S, "s"),
    (KeyCode::T, "t"),
    (KeyCode::U, "u"),
    (KeyCode::V, "v"),
    (KeyCode::W, "w"),
    (KeyCode::X, "x"),
    (KeyCode::Y, "y"),
    (KeyCode::Z, "z"),
    (KeyCode::Digit0, "0"),
    (KeyCode::Digit1, "1"),
    (KeyCode::Digit2, "2"),
    (KeyCode::Digit3, "3"),
    (KeyCode::Digit4, "4"),
    (KeyCode::Digit5, "5"),
    (KeyCode::Digit6, "6"),
    (KeyCode::Digit7, "7"),
    (KeyCode::Digit8, "8"),
    (KeyCode::Digit9, "9"),
    (KeyCode::Return, "return"),
    (KeyCode::Escape, "escape"),
    (KeyCode::Backspace, "backspace"),
    (KeyCode::Tab, "tab"),
    (KeyCode::Space, "space"),
    (KeyCode::Minus, "minus"),
    (KeyCode::Equals, "equals"),
    (KeyCode::LeftBracket, "leftbracket"),
    (KeyCode::RightBracket, "rightbracket"),
    (KeyCode::Backslash, "backslash"),
    (KeyCode::Semicolon, "semicolon"),
    (KeyCode::Quote, "quote"),
    (KeyCode::BackQuote, "backquote"),
    (KeyCode::Comma, "comma"),
    (KeyCode::Period, "period"),
    (KeyCode::Slash, "slash"),
    (KeyCode::F1, "f1"),
    (KeyCode::F2, "f2"),
    (KeyCode::F3, "f3"),
    (KeyCode::F4, "f4"),
    (KeyCode::F5, "f5"),
    (KeyCode::F6, "f6"),
    (KeyCode::F7, "f7"),
    (KeyCode::F8, "f8"),
    (KeyCode::F9, "f9"),
    (KeyCode::F10, "f10"),
    (KeyCode::F11, "f11"),
    (KeyCode::F12, "f12"),
    (KeyCode::F13, "f13"),
    (KeyCode::F14, "f14"),
    (KeyCode::F15, "f15"),
    (KeyCode::Pause, "pause"),
    (KeyCode::Insert, "insert"),
    (KeyCode::Home, "home"),
    (KeyCode::PageUp, "pageup"),
    (KeyCode::Delete, "delete"),
    (KeyCode::End, "end"),
    (KeyCode::PageDown, "pagedown"),
    (KeyCode::Right, "right"),
    (KeyCode::Left, "left"),
    (KeyCode::Down, "down"),
    (KeyCode::Up, "up"),
    (KeyCode::KeypadDivide, "keypaddivide"),
    (KeyCode::KeypadMultiply, "keypadmultiply"),
    (KeyCode::KeypadMinus, "keypadminus"),
    (KeyCode::KeypadPlus, "keypadplus"),
    (KeyCode::KeypadEnter, "keypadenter"),
    (KeyCode::Keypad0, "num0"),
    (KeyCode::Keypad1, "num1"),
    (KeyCode::Keypad2, "num2"),
    (KeyCode::Keypad3, "num3"),
    (KeyCode::Keypad4, "num4"),
    (KeyCode::Keypad5, "num5"),
    (KeyCode::Keypad6, "num6"),
    (KeyCode::Keypad7, "num7"),
    (KeyCode::Keypad8, "num8"),
    (KeyCode::Keypad9, "num9"),
    (KeyCode::KeypadPeriod, "keypadperiod"),
    (KeyCode::KeypadEquals, "keypadequals"),
];

impl KeyCode {
    /// Converts a raw HID Usage ID; `None` for ids without a variant.
    pub fn from_u16(value: u16) -> Option<Self> {
        KEY_NAMES
            .iter()
            .map(|(k, _)| *k)
            .find(|k| *k as u16 == value)
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Command-line name of the key.
    pub fn name(self) -> &'static str {
        KEY_NAMES
            .iter()
            .find(|(k, _)| *k == self)
            .map(|(_, n)| *n)
            .unwrap_or("unknown")
    }

    /// Looks a key up by its command-line name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        KEY_NAMES
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(k, _)| *k)
    }

    /// All key names, in table order.
    pub fn names() -> impl Iterator<Item = &'static str> {
        KEY_NAMES.iter().map(|(_, n)| *n)
    }
}

/// Bitset of held modifier keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Modifiers(pub u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const SHIFT: Modifiers = Modifiers(1 << 0);
    pub const CONTROL: Modifiers = Modifiers(1 << 1);
    pub const ALT: Modifiers = Modifiers(1 << 2);
    pub const COMMAND: Modifiers = Modifiers(1 << 3);

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Modifiers {
    fn bitor_assign(&mut self, rhs: Modifiers) {
        self.0 |= rhs.0;
    }
}

/// Error returned when a trigger string cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TriggerParseError {
    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),
    #[error("unknown key '{0}'")]
    UnknownKey(String),
}

/// A key plus the exact modifier set that must be held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Trigger {
    pub key: KeyCode,
    pub modifiers: Modifiers,
}

impl Trigger {
    pub fn new(key: KeyCode, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn key(key: KeyCode) -> Self {
        Self::new(key, Modifiers::NONE)
    }
}

impl FromStr for Trigger {
    type Err = TriggerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('+').collect();
        let (key_name, modifier_names) = parts
            .split_last()
            .ok_or_else(|| TriggerParseError::UnknownKey(s.to_string()))?;

        let mut modifiers = Modifiers::NONE;
        for name in modifier_names {
            modifiers |= match name.to_ascii_lowercase().as_str() {
                "ctrl" => Modifiers::CONTROL,
                "shift" => Modifiers::SHIFT,
                "alt" => Modifiers::ALT,
                "cmd" | "command" => Modifiers::COMMAND,
                _ => return Err(TriggerParseError::UnknownModifier(name.to_string())),
            };
        }

        let key = KeyCode::from_name(key_name)
            .ok_or_else(|| TriggerParseError::UnknownKey(key_name.to_string()))?;
        Ok(Trigger { key, modifiers })
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(Modifiers::COMMAND) {
            f.write_str("cmd+")?;
        }
        if self.modifiers.contains(Modifiers::CONTROL) {
            f.write_str("ctrl+")?;
        }
        if self.modifiers.contains(Modifiers::ALT) {
            f.write_str("alt+")?;
        }
        if self.modifiers.contains(Modifiers::SHIFT) {
            f.write_str("shift+")?;
        }
        f.write_str(self.key.name())
    }
}
