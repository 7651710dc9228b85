//! Reduce a directory subtree to a byte count.

use crate::error::SizeError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

pub trait DirectorySizer: Send + Sync {
    /// Total size in bytes of the regular files below `path`.
    fn measure(&self, path: &Path) -> Result<u64, SizeError>;
}

/// Which [`DirectorySizer`] the browser uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SizerKind {
    /// Walk the tree in-process
    #[default]
    Walk,
    /// Ask the system `du` utility
    Du,
}

impl SizerKind {
    pub fn build(self, du_program: &str) -> Arc<dyn DirectorySizer> {
        match self {
            SizerKind::Walk => Arc::new(WalkSizer),
            SizerKind::Du => Arc::new(DuSizer::new(du_program)),
        }
    }
}

/// Recursive walk summing regular-file lengths.
///
/// Children that cannot be read are skipped; only a missing or unreadable
/// root fails the measurement. Symlinks are not followed.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkSizer;

impl DirectorySizer for WalkSizer {
    fn measure(&self, path: &Path) -> Result<u64, SizeError> {
        measure_tree(path)
    }
}

pub fn measure_tree(path: &Path) -> Result<u64, SizeError> {
    check_root(path)?;

    let mut total = 0u64;
    let mut skipped = 0usize;

    for entry in WalkDir::new(path).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                skipped += 1;
                debug!(root = %path.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        match entry.metadata() {
            Ok(metadata) => total += metadata.len(),
            Err(err) => {
                skipped += 1;
                debug!(path = %entry.path().display(), error = %err, "skipping file without metadata");
            }
        }
    }

    if skipped > 0 {
        debug!(root = %path.display(), skipped, "measured with unreadable entries");
    }

    Ok(total)
}

/// Delegates to `du -sk` and converts the reported KiB to bytes.
#[derive(Debug, Clone)]
pub struct DuSizer {
    program: String,
}

impl DuSizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl DirectorySizer for DuSizer {
    fn measure(&self, path: &Path) -> Result<u64, SizeError> {
        check_root(path)?;

        let output = Command::new(&self.program)
            .arg("-sk")
            .arg(path)
            .output()
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => SizeError::ToolUnavailable(self.program.clone()),
                _ => SizeError::Unknown(err.to_string()),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let kib = stdout
            .split_whitespace()
            .next()
            .and_then(|token| token.parse::<u64>().ok());

        match kib {
            Some(kib) => {
                // du still prints a total when parts of the tree are unreadable
                if !output.status.success() {
                    debug!(path = %path.display(), status = %output.status, "du reported a partial total");
                }
                Ok(kib.saturating_mul(1024))
            }
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let reason = stderr
                    .lines()
                    .next()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{} exited with {}", self.program, output.status));
                warn!(path = %path.display(), %reason, "du produced no size");
                Err(SizeError::Unknown(reason))
            }
        }
    }
}

fn check_root(path: &Path) -> Result<(), SizeError> {
    let metadata = fs::metadata(path).map_err(|err| SizeError::from_io(path, err))?;
    if !metadata.is_dir() {
        return Err(SizeError::NotADirectory(path.to_path_buf()));
    }
    fs::read_dir(path).map_err(|err| SizeError::from_io(path, err))?;
    Ok(())
}
