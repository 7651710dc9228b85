//! One directory's immediate children, each annotated with a size label.

use crate::cache::SizeCache;
use crate::error::SizeError;
use crate::format::format_size;
use crate::sizer::DirectorySizer;
use rayon::prelude::*;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Directories with more children than this measure them on the rayon pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Display form of the name; lossy for names that are not UTF-8.
    pub name: String,
    /// Name as stored on disk, used to build paths.
    pub file_name: OsString,
    pub size_label: String,
    pub is_dir: bool,
}

impl ListingEntry {
    /// Row standing in for a listing that could not be produced.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            name: message.into(),
            file_name: OsString::new(),
            size_label: String::new(),
            is_dir: false,
        }
    }

    /// Synthetic rows carry no size; every real entry has a size or error label.
    pub fn is_placeholder(&self) -> bool {
        self.size_label.is_empty()
    }
}

/// Anything that can produce a listing for a path.
pub trait ListSource: Send + Sync + 'static {
    fn list(&self, path: &Path) -> Vec<ListingEntry>;
}

pub struct ContentLister {
    cache: Arc<SizeCache>,
    sizer: Arc<dyn DirectorySizer>,
    parallel_threshold: usize,
}

impl ContentLister {
    pub fn new(cache: Arc<SizeCache>, sizer: Arc<dyn DirectorySizer>) -> Self {
        Self {
            cache,
            sizer,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn cache(&self) -> &Arc<SizeCache> {
        &self.cache
    }

    fn describe(&self, file_name: OsString, path: &Path) -> ListingEntry {
        let name = file_name.to_string_lossy().into_owned();
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) => {
                // Dangling symlinks and entries removed mid-listing end up here
                return ListingEntry {
                    name,
                    file_name,
                    size_label: SizeError::from_io(path, err).label(),
                    is_dir: false,
                };
            }
        };

        if metadata.is_dir() {
            let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
            let size_label = self.cache.get_or_compute(&key, || match self.sizer.measure(path) {
                Ok(bytes) => format_size(bytes),
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "directory size unavailable");
                    err.label()
                }
            });
            ListingEntry {
                name,
                file_name,
                size_label,
                is_dir: true,
            }
        } else {
            ListingEntry {
                name,
                file_name,
                size_label: format_size(metadata.len()),
                is_dir: false,
            }
        }
    }
}

impl ListSource for ContentLister {
    fn list(&self, path: &Path) -> Vec<ListingEntry> {
        if !path.is_dir() {
            return vec![ListingEntry::error(SizeError::NotADirectory(path.to_path_buf()).label())];
        }

        let read_dir = match fs::read_dir(path) {
            Ok(read_dir) => read_dir,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot list directory");
                return vec![ListingEntry::error(format!("Error listing: {}", err))];
            }
        };

        let children: Vec<(OsString, PathBuf)> = match read_dir
            .map(|entry| entry.map(|e| (e.file_name(), e.path())))
            .collect::<Result<_, _>>()
        {
            Ok(children) => children,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "directory iteration failed");
                return vec![ListingEntry::error(format!("Error listing: {}", err))];
            }
        };

        debug!(path = %path.display(), children = children.len(), "listing directory");

        if children.len() > self.parallel_threshold {
            children
                .into_par_iter()
                .map(|(name, child)| self.describe(name, &child))
                .collect()
        } else {
            children
                .into_iter()
                .map(|(name, child)| self.describe(name, &child))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizer::WalkSizer;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingSizer {
        calls: AtomicUsize,
    }

    impl DirectorySizer for CountingSizer {
        fn measure(&self, path: &Path) -> Result<u64, SizeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            WalkSizer.measure(path)
        }
    }

    fn create_fixture() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("small.txt"), vec![b'x'; 100]).unwrap();
        fs::write(root.join("medium.bin"), vec![0u8; 2048]).unwrap();
        fs::create_dir(root.join("empty")).unwrap();
        temp_dir
    }

    fn lister() -> ContentLister {
        ContentLister::new(Arc::new(SizeCache::new()), Arc::new(WalkSizer))
    }

    fn by_name(entries: Vec<ListingEntry>) -> HashMap<String, ListingEntry> {
        entries.into_iter().map(|e| (e.name.clone(), e)).collect()
    }

    #[test]
    fn test_lists_files_and_directories() {
        let fixture = create_fixture();
        let entries = lister().list(fixture.path());
        assert_eq!(entries.len(), 3);

        let entries = by_name(entries);
        assert_eq!(entries["small.txt"].size_label, "100.00 Bytes");
        assert!(!entries["small.txt"].is_dir);
        assert_eq!(entries["medium.bin"].size_label, "2.00 KB");
        assert_eq!(entries["empty"].size_label, "0 Bytes");
        assert!(entries["empty"].is_dir);
    }

    #[test]
    fn test_order_follows_directory_iteration() {
        let fixture = create_fixture();
        let expected: Vec<String> = fs::read_dir(fixture.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();

        let names: Vec<String> = lister()
            .list(fixture.path())
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_subdirectories_are_cached_files_are_not() {
        let fixture = create_fixture();
        let sizer = Arc::new(CountingSizer {
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(SizeCache::new());
        let lister = ContentLister::new(cache.clone(), sizer.clone());

        lister.list(fixture.path());
        lister.list(fixture.path());
        assert_eq!(sizer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);

        // Files are re-stated on every listing
        fs::write(fixture.path().join("small.txt"), vec![b'x'; 1024]).unwrap();
        let entries = by_name(lister.list(fixture.path()));
        assert_eq!(entries["small.txt"].size_label, "1.00 KB");
    }

    #[test]
    fn test_cached_labels_go_stale_until_cleared() {
        let fixture = create_fixture();
        let lister = lister();
        lister.list(fixture.path());

        fs::write(fixture.path().join("empty/new.bin"), vec![0u8; 2048]).unwrap();
        let entries = by_name(lister.list(fixture.path()));
        assert_eq!(entries["empty"].size_label, "0 Bytes");

        lister.cache().clear();
        let entries = by_name(lister.list(fixture.path()));
        assert_eq!(entries["empty"].size_label, "2.00 KB");
    }

    #[test]
    fn test_parallel_listing_matches_serial() {
        let temp_dir = TempDir::new().unwrap();
        for i in 0..40 {
            let dir = temp_dir.path().join(format!("dir_{:02}", i));
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join("payload"), vec![0u8; i * 10]).unwrap();
        }

        let serial = ContentLister::new(Arc::new(SizeCache::new()), Arc::new(WalkSizer))
            .with_parallel_threshold(usize::MAX)
            .list(temp_dir.path());
        let parallel = ContentLister::new(Arc::new(SizeCache::new()), Arc::new(WalkSizer))
            .with_parallel_threshold(0)
            .list(temp_dir.path());

        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_missing_path_yields_error_row() {
        let fixture = create_fixture();
        let entries = lister().list(&fixture.path().join("nope"));
        assert_eq!(entries, vec![ListingEntry::error("Error: Not a directory")]);
    }

    #[test]
    fn test_file_path_yields_error_row() {
        let fixture = create_fixture();
        let entries = lister().list(&fixture.path().join("small.txt"));
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].is_dir);
        assert!(entries[0].name.starts_with("Error"));
        assert_eq!(entries[0].size_label, "");
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_child_gets_error_label() {
        use std::os::unix::fs::PermissionsExt;

        let fixture = create_fixture();
        let locked = fixture.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("secret"), vec![0u8; 512]).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let enforced = fs::read_dir(&locked).is_err();
        let entries = by_name(lister().list(fixture.path()));

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(entries.len(), 4);
        assert!(entries["locked"].is_dir);
        if enforced {
            assert_eq!(entries["locked"].size_label, "Error: Permission denied");
        }
        assert_eq!(entries["medium.bin"].size_label, "2.00 KB");
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_row() {
        let fixture = create_fixture();
        std::os::unix::fs::symlink(
            fixture.path().join("does-not-exist"),
            fixture.path().join("dangling"),
        )
        .unwrap();

        let entries = by_name(lister().list(fixture.path()));
        assert_eq!(entries["dangling"].size_label, "Error: Not found");
        assert!(!entries["dangling"].is_dir);
    }
}
