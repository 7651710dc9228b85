//! Errors raised while measuring, listing or removing filesystem entries.
//!
//! None of these abort the browser. They are rendered as inline labels (a
//! size column that reads `Error: ...`) or as a synthetic listing row.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SizeError {
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The external size-summarizing program could not be started.
    #[error("'{0}' not found")]
    ToolUnavailable(String),

    #[error("{0}")]
    Unknown(String),
}

impl SizeError {
    /// Classify an I/O error raised while touching `path`.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Unknown(err.to_string()),
        }
    }

    /// Short inline form shown in the size column.
    pub fn label(&self) -> String {
        match self {
            Self::NotADirectory(_) => "Error: Not a directory".to_string(),
            Self::PermissionDenied(_) => "Error: Permission denied".to_string(),
            Self::NotFound(_) => "Error: Not found".to_string(),
            Self::ToolUnavailable(tool) => format!("Error: '{}' not found", tool),
            Self::Unknown(message) => format!("Error: {}", message),
        }
    }
}
