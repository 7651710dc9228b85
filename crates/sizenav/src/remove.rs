//! Deleting entries from the browser.

use crate::error::SizeError;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Remove `path`, recursively when it is a directory.
///
/// Symlinks are removed themselves, never their targets.
pub fn remove_tree(path: &Path) -> Result<(), SizeError> {
    let metadata = fs::symlink_metadata(path).map_err(|err| SizeError::from_io(path, err))?;

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => {
            info!(path = %path.display(), "removed");
            Ok(())
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "remove failed");
            Err(SizeError::from_io(path, err))
        }
    }
}
