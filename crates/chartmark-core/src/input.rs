//! Semantic input events for pointer and keyboard.
//!
//! Hosts translate their native events (DOM, a replay script, tests) into
//! these before handing them to the engine. Positions are chart-surface
//! pixels; times are milliseconds on any monotonic clock.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Map a DOM `MouseEvent.button` value.
    pub fn from_dom(button: i16) -> Self {
        match button {
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::Left,
        }
    }
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer event with position and timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PointerEvent {
    Down {
        position: Point,
        #[serde(default)]
        button: MouseButton,
        time_ms: f64,
    },
    Move {
        position: Point,
        time_ms: f64,
    },
    Up {
        position: Point,
        #[serde(default)]
        button: MouseButton,
        time_ms: f64,
    },
    /// Fires after a down/up pair without significant movement.
    Click {
        position: Point,
        time_ms: f64,
    },
    /// Right-click / long-press.
    ContextMenu {
        position: Point,
        time_ms: f64,
    },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match *self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Move { position, .. }
            | PointerEvent::Up { position, .. }
            | PointerEvent::Click { position, .. }
            | PointerEvent::ContextMenu { position, .. } => position,
        }
    }

    pub fn time_ms(&self) -> f64 {
        match *self {
            PointerEvent::Down { time_ms, .. }
            | PointerEvent::Move { time_ms, .. }
            | PointerEvent::Up { time_ms, .. }
            | PointerEvent::Click { time_ms, .. }
            | PointerEvent::ContextMenu { time_ms, .. } => time_ms,
        }
    }
}

/// Keys the engine reacts to. Everything else is carried as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Escape,
    Delete,
    Backspace,
    /// A printable key, lowercased.
    Char(char),
    Other(String),
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value.
    pub fn from_dom(key: &str) -> Self {
        match key {
            "Escape" | "Esc" => Key::Escape,
            "Delete" | "Del" => Key::Delete,
            "Backspace" => Key::Backspace,
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c.to_ascii_lowercase()),
                    _ => Key::Other(key.to_string()),
                }
            }
        }
    }

    /// Display name, as used in shortcut listings.
    pub fn label(&self) -> String {
        match self {
            Key::Escape => "Escape".to_string(),
            Key::Delete => "Delete".to_string(),
            Key::Backspace => "Backspace".to_string(),
            Key::Char(c) => c.to_ascii_uppercase().to_string(),
            Key::Other(name) => name.clone(),
        }
    }
}

/// Undo/redo request decoded from a key chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKey {
    Undo,
    Redo,
}

/// A key press with its modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: Key,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    pub fn from_dom(key: &str, modifiers: Modifiers) -> Self {
        Self::new(Key::from_dom(key), modifiers)
    }

    /// Ctrl+Z undoes; Ctrl+Shift+Z and Ctrl+Y redo.
    pub fn history(&self) -> Option<HistoryKey> {
        if !self.modifiers.command() {
            return None;
        }
        match self.key {
            Key::Char('z') if self.modifiers.shift => Some(HistoryKey::Redo),
            Key::Char('z') => Some(HistoryKey::Undo),
            Key::Char('y') => Some(HistoryKey::Redo),
            _ => None,
        }
    }

    /// Delete or Backspace without modifiers.
    pub fn is_delete(&self) -> bool {
        matches!(self.key, Key::Delete | Key::Backspace) && !self.modifiers.command()
    }

    pub fn is_escape(&self) -> bool {
        self.key == Key::Escape
    }
}

/// Anything the engine consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputEvent {
    Pointer(PointerEvent),
    Key(KeyEvent),
}

impl From<PointerEvent> for InputEvent {
    fn from(e: PointerEvent) -> Self {
        InputEvent::Pointer(e)
    }
}

impl From<KeyEvent> for InputEvent {
    fn from(e: KeyEvent) -> Self {
        InputEvent::Key(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctrl(shift: bool) -> Modifiers {
        Modifiers {
            ctrl: true,
            shift,
            ..Modifiers::NONE
        }
    }

    #[test]
    fn test_dom_key_mapping() {
        assert_eq!(Key::from_dom("Escape"), Key::Escape);
        assert_eq!(Key::from_dom("Backspace"), Key::Backspace);
        assert_eq!(Key::from_dom("Z"), Key::Char('z'));
        assert_eq!(Key::from_dom("ArrowUp"), Key::Other("ArrowUp".to_string()));
    }

    #[test]
    fn test_history_chords() {
        assert_eq!(KeyEvent::from_dom("z", ctrl(false)).history(), Some(HistoryKey::Undo));
        assert_eq!(KeyEvent::from_dom("Z", ctrl(true)).history(), Some(HistoryKey::Redo));
        assert_eq!(KeyEvent::from_dom("y", ctrl(false)).history(), Some(HistoryKey::Redo));
        assert_eq!(KeyEvent::from_dom("z", Modifiers::NONE).history(), None);
        let cmd = Modifiers {
            meta: true,
            ..Modifiers::NONE
        };
        assert_eq!(KeyEvent::from_dom("z", cmd).history(), Some(HistoryKey::Undo));
    }

    #[test]
    fn test_delete_keys() {
        assert!(KeyEvent::plain(Key::Delete).is_delete());
        assert!(KeyEvent::plain(Key::Backspace).is_delete());
        assert!(!KeyEvent::plain(Key::Escape).is_delete());
    }

    #[test]
    fn test_pointer_event_json() {
        let json = r#"{"type":"down","position":{"x":10.0,"y":20.0},"time_ms":5.0}"#;
        let event: PointerEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.position(), Point::new(10.0, 20.0));
        assert!(matches!(event, PointerEvent::Down { button: MouseButton::Left, .. }));

        let json = r#"{"type":"contextmenu","position":{"x":1.0,"y":2.0},"time_ms":0.0}"#;
        let menu: PointerEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(menu, PointerEvent::ContextMenu { .. }));
    }

    #[test]
    fn test_input_event_untagged() {
        let key: InputEvent = serde_json::from_str(r#"{"key":"escape"}"#).unwrap();
        assert_eq!(key, InputEvent::Key(KeyEvent::plain(Key::Escape)));
        let json = r#"{"type":"click","position":{"x":1.0,"y":2.0},"time_ms":3.0}"#;
        let ptr: InputEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(ptr, InputEvent::Pointer(PointerEvent::Click { .. })));
    }
}
