//! Key bindings.
//!
//! A [`Keymap`] maps key chords such as `Shift+ArrowDown` to editor
//! [`Command`]s. Each session owns its keymap; overrides come from the
//! session configuration.

use crate::errors::EditorError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Escape,
    Tab,
    Enter,
    Backspace,
    Char(char),
}

impl Key {
    fn parse(name: &str) -> Option<Self> {
        let key = match name {
            "ArrowUp" | "Up" => Key::ArrowUp,
            "ArrowDown" | "Down" => Key::ArrowDown,
            "ArrowLeft" | "Left" => Key::ArrowLeft,
            "ArrowRight" | "Right" => Key::ArrowRight,
            "Escape" | "Esc" => Key::Escape,
            "Tab" => Key::Tab,
            "Enter" => Key::Enter,
            "Backspace" => Key::Backspace,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c.to_ascii_lowercase()),
                    _ => return None,
                }
            }
        };
        Some(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{c}"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyChord {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }

    pub fn shift(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                shift: true,
                ..Modifiers::default()
            },
        }
    }

    pub fn ctrl(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::default()
            },
        }
    }

    /// Parse `Shift+ArrowUp`, `Ctrl+.`, `Escape`, ...
    pub fn parse(chord: &str) -> Result<Self, EditorError> {
        let invalid = || EditorError::KeyChord(chord.to_string());
        // `Ctrl++` ends in the key itself.
        let (mods, key) = match chord.strip_suffix("++") {
            Some(rest) => (rest, "+"),
            None => chord.rsplit_once('+').unwrap_or(("", chord)),
        };

        let mut modifiers = Modifiers::default();
        for part in mods.split('+').filter(|part| !part.is_empty()) {
            match part.to_ascii_lowercase().as_str() {
                "shift" => modifiers.shift = true,
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" | "option" => modifiers.alt = true,
                "meta" | "cmd" | "super" => modifiers.meta = true,
                _ => return Err(invalid()),
            }
        }

        let key = Key::parse(key.trim()).ok_or_else(invalid)?;
        Ok(Self { key, modifiers })
    }
}

impl FromStr for KeyChord {
    type Err = EditorError;

    fn from_str(chord: &str) -> Result<Self, Self::Err> {
        Self::parse(chord)
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Modifiers {
            shift,
            ctrl,
            alt,
            meta,
        } = self.modifiers;
        for (held, name) in [(ctrl, "Ctrl"), (alt, "Alt"), (meta, "Meta"), (shift, "Shift")] {
            if held {
                write!(f, "{name}+")?;
            }
        }
        write!(f, "{}", self.key)
    }
}

/// Editor commands a key can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    ExtendSelectionUp,
    ExtendSelectionDown,
    MoveUp,
    MoveDown,
    CollapseSelection,
    Indent,
    Outdent,
    ToggleFold,
    ToggleCheck,
    ZoomIn,
    ZoomOut,
}

#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: HashMap<KeyChord, Command>,
}

impl Keymap {
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Default bindings plus `overrides` (chord text → command)
    pub fn with_overrides(overrides: &HashMap<String, Command>) -> Result<Self, EditorError> {
        let mut keymap = Self::default();
        for (chord, command) in overrides {
            keymap.bind(KeyChord::parse(chord)?, *command);
        }
        Ok(keymap)
    }

    pub fn bind(&mut self, chord: KeyChord, command: Command) {
        self.bindings.insert(chord, command);
    }

    pub fn unbind(&mut self, chord: &KeyChord) {
        self.bindings.remove(chord);
    }

    pub fn lookup(&self, chord: &KeyChord) -> Option<Command> {
        self.bindings.get(chord).copied()
    }

    /// Bindings sorted by their chord text
    pub fn bindings(&self) -> Vec<(KeyChord, Command)> {
        let mut bindings: Vec<(KeyChord, Command)> =
            self.bindings.iter().map(|(chord, command)| (*chord, *command)).collect();
        bindings.sort_by_key(|(chord, _)| chord.to_string());
        bindings
    }
}

impl Default for Keymap {
    fn default() -> Self {
        let mut keymap = Self::empty();
        keymap.bind(KeyChord::shift(Key::ArrowUp), Command::ExtendSelectionUp);
        keymap.bind(KeyChord::shift(Key::ArrowDown), Command::ExtendSelectionDown);
        keymap.bind(KeyChord::plain(Key::ArrowUp), Command::MoveUp);
        keymap.bind(KeyChord::plain(Key::ArrowDown), Command::MoveDown);
        keymap.bind(KeyChord::plain(Key::Escape), Command::CollapseSelection);
        keymap.bind(KeyChord::plain(Key::Tab), Command::Indent);
        keymap.bind(KeyChord::shift(Key::Tab), Command::Outdent);
        keymap.bind(KeyChord::ctrl(Key::Char('.')), Command::ToggleFold);
        keymap.bind(KeyChord::ctrl(Key::Enter), Command::ToggleCheck);
        keymap.bind(KeyChord::ctrl(Key::Char(']')), Command::ZoomIn);
        keymap.bind(KeyChord::ctrl(Key::Char('[')), Command::ZoomOut);
        keymap
    }
}
