//! Types and enums used across the UI

use crate::input::InputMode;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Browse,
    ConfirmDelete(PathBuf),
    Deleting(PathBuf),
}

impl Mode {
    pub fn input_mode(&self) -> InputMode {
        match self {
            Mode::Browse => InputMode::Browse,
            Mode::ConfirmDelete(_) => InputMode::Confirm,
            Mode::Deleting(_) => InputMode::Busy,
        }
    }
}

pub const THROBBER: [char; 8] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧'];

pub const KEY_LEGEND: &str = "↑↓: Navigate | Enter: Open | .: Parent | r: Refresh | d: Delete | q: Quit";
