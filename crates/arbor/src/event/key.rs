//! Keyboard input as delivered by every console backend.
use std::ops::Add;

/// Modifier key state.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Mods {
    /// Shift is active.
    pub shift: bool,
    /// Control is active.
    pub ctrl: bool,
    /// Alt is active.
    pub alt: bool,
}

impl Mods {
    /// True when no modifier is held.
    pub fn is_empty(&self) -> bool {
        !(self.shift || self.ctrl || self.alt)
    }
}

impl Add<KeyCode> for Mods {
    type Output = Key;

    fn add(self, key: KeyCode) -> Self::Output {
        Key { mods: self, key }
    }
}

impl Add<char> for Mods {
    type Output = Key;

    fn add(self, other: char) -> Self::Output {
        Key {
            mods: self,
            key: other.into(),
        }
    }
}

impl Add<Self> for Mods {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self {
            shift: self.shift || other.shift,
            ctrl: self.ctrl || other.ctrl,
            alt: self.alt || other.alt,
        }
    }
}

/// No modifiers pressed.
#[allow(non_upper_case_globals)]
pub const Empty: Mods = Mods {
    shift: false,
    ctrl: false,
    alt: false,
};

/// Shift-only modifier state.
#[allow(non_upper_case_globals)]
pub const Shift: Mods = Mods {
    shift: true,
    ctrl: false,
    alt: false,
};

/// Control-only modifier state.
#[allow(non_upper_case_globals)]
pub const Ctrl: Mods = Mods {
    shift: false,
    ctrl: true,
    alt: false,
};

/// Alt-only modifier state.
#[allow(non_upper_case_globals)]
pub const Alt: Mods = Mods {
    shift: false,
    ctrl: false,
    alt: true,
};

/// Logical key codes. Backends map their native codes onto this set.
#[derive(Debug, PartialOrd, PartialEq, Hash, Eq, Clone, Copy)]
pub enum KeyCode {
    /// Backspace key.
    Backspace,
    /// Enter/return key.
    Enter,
    /// Left arrow key.
    Left,
    /// Right arrow key.
    Right,
    /// Up arrow key.
    Up,
    /// Down arrow key.
    Down,
    /// Home key.
    Home,
    /// End key.
    End,
    /// Page up key.
    PageUp,
    /// Page down key.
    PageDown,
    /// Tab key.
    Tab,
    /// Shift + Tab key.
    BackTab,
    /// Delete key.
    Delete,
    /// Insert key.
    Insert,
    /// Escape key.
    Esc,
    /// Null key code.
    Null,
    /// Function key; `F(1)` is F1.
    F(u8),
    /// A character.
    Char(char),
}

impl From<char> for KeyCode {
    fn from(c: char) -> Self {
        Self::Char(c)
    }
}

/// A keystroke along with modifiers.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Key {
    /// Modifier state.
    pub mods: Mods,
    /// Key code.
    pub key: KeyCode,
}

impl Key {
    /// Fold a shifted ASCII letter into its uppercase form and drop shift from
    /// other characters, so that bindings can be written as plain characters.
    /// Non-character keys keep their modifiers.
    pub fn normalize(&self) -> Self {
        match self.key {
            KeyCode::Char(c) if self.mods.shift && c != ' ' => Self {
                mods: Mods {
                    shift: false,
                    ..self.mods
                },
                key: KeyCode::Char(c.to_ascii_uppercase()),
            },
            _ => *self,
        }
    }

    /// Translate a raw control byte (`0x01..=0x1a`) into `Ctrl + letter`.
    pub fn from_control_byte(b: u8) -> Option<Self> {
        match b {
            0x09 => Some(KeyCode::Tab.into()),
            0x0a | 0x0d => Some(KeyCode::Enter.into()),
            0x01..=0x1a => Some(Ctrl + char::from(b'a' + b - 1)),
            0x1b => Some(KeyCode::Esc.into()),
            0x7f => Some(KeyCode::Backspace.into()),
            _ => None,
        }
    }
}

impl PartialEq<KeyCode> for Key {
    fn eq(&self, c: &KeyCode) -> bool {
        self.mods.is_empty() && *c == self.key
    }
}

impl PartialEq<char> for Key {
    fn eq(&self, c: &char) -> bool {
        *self == KeyCode::Char(*c)
    }
}

impl From<char> for Key {
    fn from(c: char) -> Self {
        Self {
            mods: Empty,
            key: KeyCode::Char(c),
        }
    }
}

impl From<KeyCode> for Key {
    fn from(c: KeyCode) -> Self {
        Self {
            mods: Empty,
            key: c,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{error::Result, event::key::*};

    #[test]
    fn normalize() -> Result<()> {
        assert_eq!((Shift + 'A').normalize(), 'A');
        assert_eq!((Shift + 'a').normalize(), 'A');
        assert_eq!((Shift + ' ').normalize(), Shift + ' ');
        assert_eq!((Shift + KeyCode::Enter).normalize(), Shift + KeyCode::Enter);
        assert_eq!((Shift + Alt + 'a').normalize(), Alt + 'A');
        Ok(())
    }

    #[test]
    fn control_bytes() -> Result<()> {
        assert_eq!(Key::from_control_byte(0x11), Some(Ctrl + 'q'));
        assert_eq!(Key::from_control_byte(0x09), Some(KeyCode::Tab.into()));
        assert_eq!(Key::from_control_byte(0x0d), Some(KeyCode::Enter.into()));
        assert_eq!(Key::from_control_byte(b'x'), None);
        Ok(())
    }
}
