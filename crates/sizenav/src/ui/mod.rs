mod types;

pub use types::Mode;

use anyhow::{Context, Result};
use crossterm::{
    cursor, event, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::future::Future;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::SizeCache;
use crate::disk::{disk_usage_for, DiskUsage};
use crate::error::SizeError;
use crate::input::{self, Action};
use crate::lister::{ContentLister, ListSource};
use crate::loader::BackgroundLoader;
use crate::nav::{LoadRequest, NavigationState, NoticeKind};
use crate::remove::remove_tree;
use crate::settings::Settings;
use types::{KEY_LEGEND, THROBBER};

pub struct App {
    nav: NavigationState,
    loader: BackgroundLoader,
    cache: Arc<SizeCache>,
    mode: Mode,
    poll_interval: Duration,
    /// Active deletion task
    delete_task: Option<JoinHandle<Result<(), SizeError>>>,
    /// Throbber frame for loading animation
    throbber_frame: usize,
    /// Partition holding the current directory, refreshed per listing
    disk_usage: Option<DiskUsage>,
}

impl App {
    pub fn new(settings: &Settings, start: PathBuf) -> Self {
        let cache = Arc::new(SizeCache::new());
        let sizer = settings.browser.sizer.build(&settings.browser.du_program);
        let lister = ContentLister::new(cache.clone(), sizer)
            .with_parallel_threshold(settings.browser.parallel_threshold);

        Self::with_source(settings, start, cache, Arc::new(lister))
    }

    pub fn with_source(
        settings: &Settings,
        start: PathBuf,
        cache: Arc<SizeCache>,
        source: Arc<dyn ListSource>,
    ) -> Self {
        Self {
            nav: NavigationState::new(start).with_notice_ttl(settings.notice_ttl()),
            loader: BackgroundLoader::new(source),
            cache,
            mode: Mode::Browse,
            poll_interval: settings.poll_interval(),
            delete_task: None,
            throbber_frame: 0,
            disk_usage: None,
        }
    }

    pub fn nav(&self) -> &NavigationState {
        &self.nav
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Begin loading the start directory. Needs a tokio runtime.
    pub fn start(&mut self) {
        let request = self.nav.begin_load(self.nav.current_path.clone());
        self.request(request);
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;

        self.start();

        let result = self.run_event_loop(&mut terminal).await;

        restore_terminal(&mut terminal)?;

        result
    }

    async fn run_event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> Result<()> {
        loop {
            self.tick().await;

            terminal.draw(|f| self.render(f))?;

            if event::poll(self.poll_interval)? {
                let event = event::read()?;
                if let Some(action) = input::map_event(self.mode.input_mode(), &event) {
                    if !self.handle_action(action) {
                        info!("quit requested");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Fold finished background work into the browser state.
    pub async fn tick(&mut self) {
        for done in self.loader.drain() {
            let path = done.path.clone();
            let count = done.entries.len();
            if self.nav.apply(done) {
                info!(path = %path.display(), entries = count, "listing ready");
                self.disk_usage = disk_usage_for(&path);
            }
        }

        // Handle active deletion task
        if let Some(delete_task) = &self.delete_task {
            if delete_task.is_finished() {
                if let Some(delete_task) = self.delete_task.take() {
                    let target = match std::mem::replace(&mut self.mode, Mode::Browse) {
                        Mode::Deleting(target) => target,
                        _ => PathBuf::new(),
                    };
                    let name = display_name(&target);

                    // Even a partial removal changes the sizes above the target
                    self.cache.invalidate(&target);
                    self.cache.invalidate(&cache_key(&target));

                    match delete_task.await {
                        Ok(Ok(())) => {
                            self.nav
                                .notify(format!("Deleted '{}'", name), NoticeKind::Info);
                        }
                        Ok(Err(e)) => {
                            self.nav.notify(
                                format!("Cannot delete '{}': {}", name, e.label()),
                                NoticeKind::Error,
                            );
                        }
                        Err(e) => {
                            warn!(error = %e, "delete task failed");
                            self.nav
                                .notify(format!("Delete task error: {}", e), NoticeKind::Error);
                        }
                    }

                    if let Some(request) = self.nav.reload() {
                        self.request(request);
                    }
                }
            }
        }

        if self.nav.is_loading || self.delete_task.is_some() {
            self.throbber_frame = (self.throbber_frame + 1) % THROBBER.len();
        }
    }

    /// Apply one action. Returns `false` when the browser should exit.
    pub fn handle_action(&mut self, action: Action) -> bool {
        if action == Action::Quit {
            return false;
        }

        match self.mode.clone() {
            Mode::Browse => match action {
                Action::Up => self.nav.move_up(),
                Action::Down => self.nav.move_down(),
                Action::Enter => {
                    if let Some(request) = self.nav.enter() {
                        self.request(request);
                    }
                }
                Action::Parent => {
                    if let Some(request) = self.nav.parent() {
                        self.request(request);
                    }
                }
                Action::Refresh => {
                    if !self.nav.is_loading {
                        self.cache.clear();
                        if let Some(request) = self.nav.reload() {
                            self.request(request);
                        }
                    }
                }
                Action::Delete => {
                    if let Some(target) = self.nav.delete_target() {
                        self.mode = Mode::ConfirmDelete(target);
                    }
                }
                _ => {}
            },
            Mode::ConfirmDelete(target) => match action {
                Action::Confirm => self.start_delete(target),
                Action::Cancel => {
                    self.mode = Mode::Browse;
                    self.nav.notify("Delete cancelled", NoticeKind::Info);
                }
                _ => {}
            },
            Mode::Deleting(_) => {}
        }

        true
    }

    fn request(&self, request: LoadRequest) {
        self.loader.request(request.generation, request.path);
    }

    fn start_delete(&mut self, target: PathBuf) {
        info!(path = %target.display(), "deleting");
        self.mode = Mode::Deleting(target.clone());
        self.delete_task = Some(tokio::task::spawn_blocking(move || remove_tree(&target)));
    }

    fn throbber(&self) -> char {
        THROBBER[self.throbber_frame % THROBBER.len()]
    }

    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Header
                Constraint::Min(0),    // Listing
                Constraint::Length(1), // Notice / prompt
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        self.render_listing(f, chunks[1]);
        self.render_notice(f, chunks[2]);
        self.render_status_bar(f, chunks[3]);
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let header = Line::from(vec![
            Span::styled(
                "Current Directory: ",
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                self.nav.current_path.display().to_string(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
        ]);
        f.render_widget(Paragraph::new(header), area);
    }

    fn render_listing(&mut self, f: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP | Borders::BOTTOM);
        let rows = block.inner(area).height as usize;

        if self.nav.is_loading {
            let lines = vec![
                Line::from(""),
                Line::from(vec![Span::styled(
                    format!("{} {}", self.throbber(), self.nav.status_message),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )]),
                Line::from(""),
                Line::from(vec![Span::styled(
                    "Measuring directory sizes...",
                    Style::default().fg(Color::Gray),
                )]),
            ];
            let paragraph = Paragraph::new(lines)
                .alignment(Alignment::Center)
                .block(block)
                .wrap(Wrap { trim: true });
            f.render_widget(paragraph, area);
            return;
        }

        if self.nav.entries.is_empty() {
            let paragraph = Paragraph::new(Line::from(Span::styled(
                "(empty directory)",
                Style::default().fg(Color::Gray),
            )))
            .block(block);
            f.render_widget(paragraph, area);
            return;
        }

        self.nav.adjust_scroll(rows);
        let range = self.nav.visible_range(rows);
        let width = area.width as usize;

        let items: Vec<ListItem> = self.nav.entries[range.clone()]
            .iter()
            .map(|entry| {
                let text = if entry.is_placeholder() {
                    entry.name.clone()
                } else {
                    let prefix = if entry.is_dir { "[DIR]" } else { "[FILE]" };
                    format!("{} {} ({})", prefix, entry.name, entry.size_label)
                };
                let style = if entry.is_placeholder() || entry.size_label.starts_with("Error") {
                    Style::default().fg(Color::Red)
                } else if entry.is_dir {
                    Style::default().fg(Color::Blue)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(Span::styled(truncate(&text, width), style)))
            })
            .collect();

        let mut state = ListState::default();
        if !items.is_empty() {
            state.select(Some(self.nav.selected.saturating_sub(range.start)));
        }

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        f.render_stateful_widget(list, area, &mut state);
    }

    fn render_notice(&self, f: &mut Frame, area: Rect) {
        let line = match &self.mode {
            Mode::ConfirmDelete(target) => Line::from(Span::styled(
                format!("Delete '{}' permanently? (y/n)", display_name(target)),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Mode::Deleting(target) => Line::from(Span::styled(
                format!("{} Deleting '{}'...", self.throbber(), display_name(target)),
                Style::default().fg(Color::Yellow),
            )),
            Mode::Browse => match self.nav.notice() {
                Some(notice) => {
                    let color = match notice.kind {
                        NoticeKind::Info => Color::Cyan,
                        NoticeKind::Error => Color::Red,
                    };
                    Line::from(Span::styled(notice.text.clone(), Style::default().fg(color)))
                }
                None => match &self.disk_usage {
                    Some(usage) => Line::from(Span::styled(
                        usage.summary(),
                        Style::default().fg(Color::Gray),
                    )),
                    None => Line::from(""),
                },
            },
        };

        f.render_widget(Paragraph::new(line), area);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let status_line = if self.nav.is_loading {
            Line::from(vec![Span::styled(
                format!("{} {}", self.throbber(), self.nav.status_message),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::SLOW_BLINK),
            )])
        } else {
            Line::from(vec![
                Span::styled(&self.nav.status_message, Style::default().fg(Color::Yellow)),
                Span::raw(" | "),
                Span::styled(KEY_LEGEND, Style::default().fg(Color::Gray)),
            ])
        };

        f.render_widget(Paragraph::new(vec![status_line]), area);
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;

    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen, cursor::Hide) {
        let _ = disable_raw_mode();
        return Err(e).context("Failed to prepare the terminal");
    }

    match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(terminal) => Ok(terminal),
        Err(e) => {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
            Err(e).context("Failed to start the terminal UI")
        }
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;
    terminal.show_cursor()?;
    Ok(())
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Drive `future` on a fresh multi-thread runtime. Listings still running when
/// it resolves are detached instead of joined, so quitting mid-load exits at once.
pub fn block_on_detached<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let output = runtime.block_on(future);
    runtime.shutdown_background();

    Ok(output)
}

/// Key the lister would have stored for `path`, resolved through its parent
/// since `path` itself may be gone.
fn cache_key(path: &std::path::Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => std::fs::canonicalize(parent)
            .map(|parent| parent.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

/// Cut `text` to `width` columns, marking the cut with `...`.
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width <= 3 {
        return ".".repeat(width);
    }
    let mut cut: String = text.chars().take(width - 3).collect();
    cut.push_str("...");
    cut
}
