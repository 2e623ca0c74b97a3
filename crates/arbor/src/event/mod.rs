//! Input events produced by console backends.

/// Keyboard events.
pub mod key;
/// Mouse events.
pub mod mouse;

use geom::Size;

pub use key::{Key, KeyCode, Mods};
pub use mouse::MouseEvent;

/// An input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A keystroke.
    Key(key::Key),
    /// A mouse action.
    Mouse(mouse::MouseEvent),
    /// The terminal changed size.
    Resize(Size),
    /// The terminal gained focus.
    FocusGained,
    /// The terminal lost focus.
    FocusLost,
    /// Bracketed paste.
    Paste(String),
}
