//! Where the browser is, what it shows and which row is selected.
//!
//! Only the render thread mutates this state. Background loads report back
//! through [`NavigationState::apply`], which ignores any result that does not
//! belong to the most recent navigation.

use crate::lister::ListingEntry;
use crate::loader::LoadComplete;
use chrono::{DateTime, Local};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub const STATUS_LOADING: &str = "Loading...";
pub const STATUS_READY: &str = "Ready.";

const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(1);

/// A load the caller should hand to the background loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub generation: u64,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// Short-lived status line shown above the footer.
#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub kind: NoticeKind,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct NavigationState {
    pub current_path: PathBuf,
    pub entries: Vec<ListingEntry>,
    pub selected: usize,
    pub scroll_offset: usize,
    pub is_loading: bool,
    pub status_message: String,
    generation: u64,
    notice: Option<Notice>,
    notice_ttl: Duration,
}

impl NavigationState {
    pub fn new(current_path: PathBuf) -> Self {
        Self {
            current_path,
            entries: Vec::new(),
            selected: 0,
            scroll_offset: 0,
            is_loading: false,
            status_message: STATUS_READY.to_string(),
            generation: 0,
            notice: None,
            notice_ttl: DEFAULT_NOTICE_TTL,
        }
    }

    pub fn with_notice_ttl(mut self, ttl: Duration) -> Self {
        self.notice_ttl = ttl;
        self
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Make `path` the navigation target and mark it loading.
    pub fn begin_load(&mut self, path: PathBuf) -> LoadRequest {
        self.generation += 1;
        self.current_path = path;
        self.is_loading = true;
        self.status_message = STATUS_LOADING.to_string();

        info!(generation = self.generation, path = %self.current_path.display(), "navigating");
        LoadRequest {
            generation: self.generation,
            path: self.current_path.clone(),
        }
    }

    /// Install a finished listing if it is for the current target.
    ///
    /// Returns `false` (and changes nothing) for stale results.
    pub fn apply(&mut self, done: LoadComplete) -> bool {
        if done.generation != self.generation || done.path != self.current_path {
            debug!(
                stale_generation = done.generation,
                current_generation = self.generation,
                path = %done.path.display(),
                "discarding stale load"
            );
            return false;
        }

        self.entries = done.entries;
        self.selected = 0;
        self.scroll_offset = 0;
        self.is_loading = false;
        self.status_message = STATUS_READY.to_string();
        true
    }

    pub fn selected_entry(&self) -> Option<&ListingEntry> {
        self.entries.get(self.selected)
    }

    pub fn move_up(&mut self) {
        if !self.is_loading && self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn move_down(&mut self) {
        if !self.is_loading && self.selected + 1 < self.entries.len() {
            self.selected += 1;
        }
    }

    /// Open the selected directory, or report the selected file's size.
    pub fn enter(&mut self) -> Option<LoadRequest> {
        if self.is_loading {
            return None;
        }
        let entry = self.selected_entry()?.clone();
        if entry.is_placeholder() {
            return None;
        }

        let path = self.current_path.join(&entry.file_name);
        if entry.is_dir {
            if path.is_dir() {
                return Some(self.begin_load(path));
            }
            self.notify(
                format!("Error: '{}' is not a directory.", entry.name),
                NoticeKind::Error,
            );
            return None;
        }

        let mut text = format!("Size of '{}': {}", entry.name, entry.size_label);
        if let Some(modified) = modified_at(&path) {
            text.push_str(&format!(" | modified {}", modified));
        }
        self.notify(text, NoticeKind::Info);
        None
    }

    /// Move to the parent directory. No-op at the filesystem root.
    pub fn parent(&mut self) -> Option<LoadRequest> {
        if self.is_loading {
            return None;
        }
        let parent = self.current_path.parent()?.to_path_buf();
        if parent == self.current_path {
            return None;
        }
        Some(self.begin_load(parent))
    }

    /// Load the current directory again.
    pub fn reload(&mut self) -> Option<LoadRequest> {
        if self.is_loading {
            return None;
        }
        Some(self.begin_load(self.current_path.clone()))
    }

    /// Path of the selected entry when it can be deleted.
    pub fn delete_target(&self) -> Option<PathBuf> {
        if self.is_loading {
            return None;
        }
        let entry = self.selected_entry()?;
        if entry.is_placeholder() {
            return None;
        }
        Some(self.current_path.join(&entry.file_name))
    }

    /// Keep the selection inside a window of `visible_rows` rows.
    pub fn adjust_scroll(&mut self, visible_rows: usize) {
        if visible_rows == 0 {
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        }
        if self.selected >= self.scroll_offset + visible_rows {
            self.scroll_offset = self.selected + 1 - visible_rows;
        }
    }

    /// Indices of the entries that fit in the viewport.
    pub fn visible_range(&self, visible_rows: usize) -> Range<usize> {
        let start = self.scroll_offset.min(self.entries.len());
        let end = (self.scroll_offset + visible_rows).min(self.entries.len());
        start..end
    }

    pub fn notify(&mut self, text: impl Into<String>, kind: NoticeKind) {
        self.notice = Some(Notice {
            text: text.into(),
            kind,
            expires_at: Instant::now() + self.notice_ttl,
        });
    }

    /// The current notice, unless it has expired.
    pub fn notice(&self) -> Option<&Notice> {
        self.notice
            .as_ref()
            .filter(|notice| Instant::now() < notice.expires_at)
    }
}

fn modified_at(path: &Path) -> Option<String> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Local>::from(modified).format("%Y-%m-%d %H:%M").to_string())
}
