mod app;
mod cache;
mod config;
mod error;
mod event;
mod explorer;
mod fs;
mod git;
mod handler;
mod session;
mod switch;
mod tui;
mod ui;
mod view;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::config::{AppConfig, GitConfig, TreeConfig, WatcherConfig};
use crate::event::{Event, EventHandler};
use crate::tui::{install_panic_hook, Tui};

/// A live, git-aware directory tree browser for the terminal.
#[derive(Parser, Debug)]
#[command(name = "arbor", version, about)]
struct Cli {
    /// Root path to display (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Explicit config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show hidden files
    #[arg(long)]
    show_hidden: bool,

    /// Disable filesystem watcher (auto-refresh)
    #[arg(long)]
    no_watcher: bool,

    /// Disable the git status overlay
    #[arg(long)]
    no_git: bool,

    /// Maximum tree depth
    #[arg(long)]
    max_depth: Option<usize>,
}

impl Cli {
    fn overrides(&self) -> AppConfig {
        AppConfig {
            tree: TreeConfig {
                show_hidden: self.show_hidden.then_some(true),
                max_depth: self.max_depth,
                ..Default::default()
            },
            watcher: WatcherConfig {
                enabled: self.no_watcher.then_some(false),
                ..Default::default()
            },
            git: GitConfig {
                show_status: self.no_git.then_some(false),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Log to a file under the user state dir; a TUI cannot log to the
/// terminal it draws on. `ARBOR_LOG` controls the filter.
fn init_tracing() {
    let Some(dir) = dirs::state_dir().or_else(dirs::cache_dir) else {
        return;
    };
    let log_dir = dir.join("arbor");
    if std::fs::create_dir_all(&log_dir).is_err() {
        return;
    }
    let Ok(file) = std::fs::File::create(log_dir.join("arbor.log")) else {
        return;
    };
    let filter = EnvFilter::try_from_env("ARBOR_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()))?;

    let start_path = if cli.path == PathBuf::from(".") {
        config
            .general
            .default_path
            .clone()
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.path.clone())
    } else {
        cli.path.clone()
    };
    let root = start_path.canonicalize().map_err(|_| {
        error::AppError::InvalidPath(format!("{} does not exist", start_path.display()))
    })?;

    install_panic_hook();

    let mut tui = Tui::new()?;
    let mut events = EventHandler::new(Duration::from_millis(16));
    let mut app = App::new(&root, &config, events.sender());
    app.init().await;

    loop {
        app.pump_notifications();
        tui.terminal_mut().draw(|frame| {
            ui::render(&mut app, frame);
        })?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key(&mut app, key).await,
            Event::Tick => app.on_tick(),
            Event::Resize(_, _) => {}
            Event::FsBatch(batch) => app.handle_fs_batch(batch).await,
            Event::WatcherFailed(message) => app.handle_watcher_failure(message),
            Event::SwitchResolved(outcome) => app.handle_switch_resolved(outcome).await,
        }

        if app.should_quit {
            break;
        }
    }

    app.shutdown().await;
    tui.restore()?;
    Ok(())
}
