use geom::Point;

use crate::event::key;

/// Mouse button codes.
#[derive(Debug, PartialOrd, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Button {
    /// Left mouse button.
    Left,
    /// Right mouse button.
    Right,
    /// Middle mouse button.
    Middle,
    /// No button (for move/scroll).
    None,
}

/// Mouse action kinds.
#[derive(Debug, PartialOrd, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Action {
    /// Button press.
    Down,
    /// Button release.
    Up,
    /// Mouse drag with button held.
    Drag,
    /// Mouse moved without button.
    Moved,
    /// Scroll wheel down.
    ScrollDown,
    /// Scroll wheel up.
    ScrollUp,
}

impl Action {
    /// Is this a button-driven action?
    pub fn is_button(&self) -> bool {
        matches!(self, Self::Down | Self::Up | Self::Drag)
    }
}

/// A mouse event. `location` is in screen coordinates when produced by a
/// backend, and is rewritten to target-local coordinates during dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    /// Mouse action type.
    pub action: Action,
    /// Mouse button.
    pub button: Button,
    /// Keyboard modifiers.
    pub modifiers: key::Mods,
    /// Event location.
    pub location: Point,
}

impl MouseEvent {
    /// A left-button press at a screen location.
    pub fn click(x: i32, y: i32) -> Self {
        Self {
            action: Action::Down,
            button: Button::Left,
            modifiers: key::Empty,
            location: Point::new(x, y),
        }
    }

    /// The same event relocated.
    pub fn with_location(&self, location: Point) -> Self {
        Self { location, ..*self }
    }
}
