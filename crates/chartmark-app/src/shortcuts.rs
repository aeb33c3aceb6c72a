//! Keyboard shortcut registry and documentation.

use chartmark_core::{Key, KeyEvent, ShapeKind};

/// What a shortcut does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    Cancel,
    Delete,
    Undo,
    Redo,
    Tool(ShapeKind),
}

/// A keyboard shortcut definition.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub action: ShortcutAction,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(
        key: &'static str,
        ctrl: bool,
        shift: bool,
        action: ShortcutAction,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            ctrl,
            shift,
            alt: false,
            action,
            description,
        }
    }

    const fn alt(key: &'static str, action: ShortcutAction, description: &'static str) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
            alt: true,
            action,
            description,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+Z").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.shift {
            parts.push("Shift");
        }
        if self.alt {
            parts.push("Alt");
        }
        parts.push(self.key);
        parts.join("+")
    }

    /// Whether a key press triggers this shortcut. Cmd counts as Ctrl.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        let m = event.modifiers;
        event.key.label() == self.key
            && m.command() == self.ctrl
            && m.shift == self.shift
            && m.alt == self.alt
    }
}

/// Registry of all keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    /// Get all registered shortcuts.
    pub fn all() -> Vec<Shortcut> {
        use ShortcutAction::*;
        vec![
            Shortcut::new(
                "Escape",
                false,
                false,
                Cancel,
                "Cancel drawing or drag, then clear selection",
            ),
            Shortcut::new("Delete", false, false, Delete, "Delete selected shape"),
            Shortcut::new("Backspace", false, false, Delete, "Delete selected shape"),
            Shortcut::new("Z", true, false, Undo, "Undo"),
            Shortcut::new("Z", true, true, Redo, "Redo"),
            Shortcut::new("Y", true, false, Redo, "Redo"),
            Shortcut::alt("T", Tool(ShapeKind::Trendline), "Trendline tool"),
            Shortcut::alt("H", Tool(ShapeKind::Horizontal), "Horizontal line tool"),
            Shortcut::alt("V", Tool(ShapeKind::Vertical), "Vertical line tool"),
            Shortcut::alt("F", Tool(ShapeKind::Fibonacci), "Fibonacci retracement tool"),
        ]
    }

    /// The shortcut a key press triggers, if any.
    pub fn lookup(event: &KeyEvent) -> Option<Shortcut> {
        Self::all().into_iter().find(|s| s.matches(event))
    }

    /// Drawing tool selected by a key press. The engine handles the rest.
    pub fn tool_for(event: &KeyEvent) -> Option<ShapeKind> {
        match Self::lookup(event)?.action {
            ShortcutAction::Tool(kind) => Some(kind),
            _ => None,
        }
    }

    /// Print all shortcuts to console.
    pub fn print_all() {
        println!("\n=== Keyboard Shortcuts ===");
        for shortcut in Self::all() {
            println!("  {:20} {}", shortcut.format(), shortcut.description);
        }
        println!();
    }
}

/// Whether the key is one the engine itself reacts to.
pub fn is_engine_key(event: &KeyEvent) -> bool {
    matches!(event.key, Key::Escape) || event.is_delete() || event.history().is_some()
}
