//! Key events to browser actions.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Enter,
    Parent,
    Quit,
    Refresh,
    Delete,
    Confirm,
    Cancel,
}

/// Which keys are live depends on what the browser is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Browse,
    /// A delete is waiting for y/n.
    Confirm,
    /// A delete is running; only quitting is possible.
    Busy,
}

/// Map one terminal event to an action. Unrecognized input maps to `None`.
pub fn map_event(mode: InputMode, event: &Event) -> Option<Action> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => map_key(mode, key),
        _ => None,
    }
}

fn map_key(mode: InputMode, key: &KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }

    match mode {
        InputMode::Browse => match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Action::Up),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::Down),
            KeyCode::Enter => Some(Action::Enter),
            KeyCode::Char('.') | KeyCode::Backspace => Some(Action::Parent),
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('r') => Some(Action::Refresh),
            KeyCode::Char('d') => Some(Action::Delete),
            _ => None,
        },
        InputMode::Confirm => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(Action::Confirm),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(Action::Cancel),
            KeyCode::Char('q') => Some(Action::Quit),
            _ => None,
        },
        InputMode::Busy => match key.code {
            KeyCode::Char('q') => Some(Action::Quit),
            _ => None,
        },
    }
}
