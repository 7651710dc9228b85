use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use sizenav::logging;
use sizenav::settings::{expand_path, Settings};
use sizenav::sizer::SizerKind;
use sizenav::ui::{self, App};

#[derive(Parser)]
#[command(name = "sizenav")]
#[command(about = "Browse a directory tree with sizes measured in the background", long_about = None)]
struct Cli {
    /// Directory to start in (defaults to the current directory)
    path: Option<PathBuf>,

    /// How directory sizes are measured
    #[arg(long, value_enum)]
    sizer: Option<SizerKind>,

    /// Program used by the `du` sizer
    #[arg(long)]
    du_program: Option<String>,

    /// Input poll timeout in milliseconds
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Path to settings file
    #[arg(short = 'c', long)]
    config: Option<String>,

    /// Directory for log files
    #[arg(long)]
    log_dir: Option<String>,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(sizer) = self.sizer {
            settings.browser.sizer = sizer;
        }
        if let Some(program) = &self.du_program {
            settings.browser.du_program = program.clone();
        }
        if let Some(poll_ms) = self.poll_ms {
            settings.browser.poll_interval_ms = poll_ms;
        }
        if let Some(log_dir) = &self.log_dir {
            settings.logging.directory = Some(expand_path(log_dir));
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(config) => Settings::load(expand_path(config)).context("Failed to load settings")?,
        None => Settings::default(),
    };
    cli.apply(&mut settings);

    let log_dir = settings
        .logging
        .directory
        .as_deref()
        .map(|dir| expand_path(&dir.to_string_lossy()))
        .unwrap_or_else(logging::default_log_dir);
    if let Err(e) = logging::init(&log_dir, &settings.logging.level) {
        eprintln!("warning: logging disabled: {:#}", e);
    }

    let start = match cli.path {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };
    let start = std::fs::canonicalize(&start).unwrap_or(start);

    info!(path = %start.display(), sizer = ?settings.browser.sizer, "starting browser");

    let mut app = App::new(&settings, start);
    ui::block_on_detached(app.run())?
}
