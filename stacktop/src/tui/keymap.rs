//! Key bindings.
//!
//! A static table from key to [`Command`]. Key handling never looks at raw
//! key codes past this point.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Everything a key can ask the dashboard to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    ToggleFull,
    ToggleTable,
    ToggleGraph,
    Save,
    PlayPause,
    PrevThread,
    NextThread,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    Home,
    End,
    ThresholdUp,
    ThresholdDown,
    Help,
}

pub struct KeyMap {
    bindings: &'static [(KeyCode, Command)],
}

const DEFAULT_BINDINGS: &[(KeyCode, Command)] = &[
    (KeyCode::Char('q'), Command::Quit),
    (KeyCode::Char('Q'), Command::Quit),
    (KeyCode::Char('f'), Command::ToggleFull),
    (KeyCode::Char('t'), Command::ToggleTable),
    (KeyCode::Char('g'), Command::ToggleGraph),
    (KeyCode::Char('s'), Command::Save),
    (KeyCode::Char('p'), Command::PlayPause),
    (KeyCode::Char(' '), Command::PlayPause),
    (KeyCode::Left, Command::PrevThread),
    (KeyCode::Right, Command::NextThread),
    (KeyCode::Up, Command::ScrollUp),
    (KeyCode::Down, Command::ScrollDown),
    (KeyCode::PageUp, Command::PageUp),
    (KeyCode::PageDown, Command::PageDown),
    (KeyCode::Home, Command::Home),
    (KeyCode::End, Command::End),
    (KeyCode::Char('+'), Command::ThresholdUp),
    (KeyCode::Char('='), Command::ThresholdUp),
    (KeyCode::Char('-'), Command::ThresholdDown),
    (KeyCode::Char('?'), Command::Help),
];

impl Default for KeyMap {
    fn default() -> Self {
        Self { bindings: DEFAULT_BINDINGS }
    }
}

impl KeyMap {
    /// Command bound to `key`, if any.
    ///
    /// Ctrl-C always quits: raw mode swallows the signal.
    #[must_use]
    pub fn lookup(&self, key: KeyEvent) -> Option<Command> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return matches!(key.code, KeyCode::Char('c')).then_some(Command::Quit);
        }
        self.bindings.iter().find(|(code, _)| *code == key.code).map(|(_, cmd)| *cmd)
    }

    /// Keys bound to `command`, for the help overlay.
    pub fn keys_for(&self, command: Command) -> impl Iterator<Item = KeyCode> + '_ {
        self.bindings.iter().filter(move |(_, cmd)| *cmd == command).map(|(code, _)| *code)
    }
}

/// Short display name of a key.
#[must_use]
pub fn key_label(code: KeyCode) -> String {
    match code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Left => "←".to_string(),
        KeyCode::Right => "→".to_string(),
        KeyCode::Up => "↑".to_string(),
        KeyCode::Down => "↓".to_string(),
        KeyCode::PageUp => "PgUp".to_string(),
        KeyCode::PageDown => "PgDn".to_string(),
        other => format!("{other:?}"),
    }
}
