use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::event::Event;
use crate::explorer::{Explorer, Notification, NotifyLevel};
use crate::fs::watcher::{ChangeEvent, TreeWatcher, WatcherCallbacks};
use crate::git::status::{GitCli, GitStatusProvider};
use crate::git::worktree::{self, Worktree};
use crate::session::{JsonSessionStore, SessionStore};
use crate::switch::SwitchOutcome;

/// How long a notification stays on the status bar.
const STATUS_TTL: Duration = Duration::from_secs(4);
/// Cache sweep cadence, in event-loop ticks (~16ms each).
const CLEANUP_EVERY_TICKS: u64 = 300;

/// Main application state: the tree engine plus TUI-side bookkeeping.
pub struct App {
    pub explorer: Explorer<GitCli, JsonSessionStore>,
    pub should_quit: bool,
    pub status_message: Option<(Notification, Instant)>,
    pub viewport_height: usize,
    watcher: Option<TreeWatcher>,
    watcher_enabled: bool,
    debounce: Duration,
    max_wait: Duration,
    event_tx: mpsc::UnboundedSender<Event>,
    tick_count: u64,
}

impl App {
    pub fn new(root: &Path, config: &AppConfig, event_tx: mpsc::UnboundedSender<Event>) -> Self {
        let explorer = Explorer::new(
            root,
            config.builder_config(),
            config.show_git_status(),
            Arc::new(GitCli),
            JsonSessionStore::new(),
        );
        Self {
            explorer,
            should_quit: false,
            status_message: None,
            viewport_height: 0,
            watcher: None,
            watcher_enabled: config.watcher_enabled(),
            debounce: Duration::from_millis(config.refresh_debounce_ms()),
            max_wait: Duration::from_millis(config.max_wait_ms()),
            event_tx,
            tick_count: 0,
        }
    }

    /// Startup: restore the persisted session for the initial root,
    /// build the first snapshot, start the watcher.
    pub async fn init(&mut self) {
        let id = self.explorer.active_worktree_id().to_string();
        let coordinator = self.explorer.coordinator();
        if let Some(record) = coordinator.store().load(&id).await {
            self.explorer.restore_session(&record);
        }
        self.explorer.refresh(false).await;
        if self.watcher_enabled {
            self.start_watcher();
        }
    }

    /// (Re)start the watcher for the current root.
    fn start_watcher(&mut self) {
        let mut watcher = TreeWatcher::new(self.explorer.root(), self.debounce, self.max_wait);
        let batch_tx = self.event_tx.clone();
        let error_tx = self.event_tx.clone();
        let callbacks = WatcherCallbacks {
            on_batch: Box::new(move |batch| {
                let _ = batch_tx.send(Event::FsBatch(batch));
            }),
            on_event: None,
            on_error: Box::new(move |error| {
                let _ = error_tx.send(Event::WatcherFailed(error.to_string()));
            }),
        };
        match watcher.start(callbacks) {
            Ok(()) => self.watcher = Some(watcher),
            Err(e) => {
                warn!(error = %e, "watcher unavailable");
                self.explorer.notify(
                    NotifyLevel::Warning,
                    format!("Watcher unavailable: {e}"),
                );
                self.watcher = None;
            }
        }
    }

    async fn restart_watcher(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop().await;
        }
        if self.watcher_enabled {
            self.start_watcher();
        }
    }

    pub fn watcher_active(&self) -> bool {
        self.watcher.as_ref().map(|w| w.is_watching()).unwrap_or(false)
    }

    /// A watcher batch: invalidate the touched listings plus the git
    /// overlay, then rebuild through the one pipeline.
    pub async fn handle_fs_batch(&mut self, batch: Vec<ChangeEvent>) {
        let paths: Vec<String> = batch.into_iter().map(|e| e.path).collect();
        self.explorer.invalidate_changed_dirs(&paths);
        self.explorer.invalidate_git_cache();
        self.explorer.refresh(false).await;
    }

    /// OS-level watch failure: live auto-refresh is off for the session;
    /// manual refresh remains available.
    pub fn handle_watcher_failure(&mut self, message: String) {
        warn!(error = %message, "watcher stopped");
        self.watcher = None;
        self.explorer.notify(
            NotifyLevel::Warning,
            "Live refresh disabled (watcher error); press r to refresh".to_string(),
        );
    }

    /// Kick off a switch to the next worktree of the repository.
    /// The I/O half runs in the background and resolves via the event
    /// channel, so a newer request can supersede it.
    pub fn cycle_worktree(&mut self) {
        if !GitCli.is_repo(self.explorer.root()) {
            self.explorer
                .notify(NotifyLevel::Info, "Not a git repository".to_string());
            return;
        }
        let worktrees = match worktree::list_worktrees(self.explorer.root(), self.explorer.root()) {
            Ok(list) => list,
            Err(e) => {
                self.explorer
                    .notify(NotifyLevel::Error, format!("Cannot list worktrees: {e}"));
                return;
            }
        };
        if worktrees.len() < 2 {
            self.explorer
                .notify(NotifyLevel::Info, "No other worktrees".to_string());
            return;
        }
        let current = worktrees.iter().position(|w| w.is_current).unwrap_or(0);
        let target = worktrees[(current + 1) % worktrees.len()].clone();
        self.switch_to(target);
    }

    pub fn switch_to(&mut self, target: Worktree) {
        let request = self.explorer.prepare_switch(target);
        let coordinator = self.explorer.coordinator();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let outcome = coordinator.run(request).await;
            let _ = tx.send(Event::SwitchResolved(outcome));
        });
    }

    pub async fn handle_switch_resolved(&mut self, outcome: SwitchOutcome) {
        let old_root = self.explorer.root().to_path_buf();
        self.explorer.apply_switch(outcome).await;
        if self.explorer.root() != old_root {
            self.restart_watcher().await;
        }
    }

    /// Periodic tick: expire the status message and sweep the caches.
    pub fn on_tick(&mut self) {
        self.tick_count += 1;
        if self.tick_count % CLEANUP_EVERY_TICKS == 0 {
            self.explorer.cleanup_caches();
        }
        if let Some((_, shown_at)) = &self.status_message {
            if shown_at.elapsed() > STATUS_TTL {
                self.status_message = None;
            }
        }
    }

    /// Move engine notifications onto the status bar (latest wins) and
    /// into the log.
    pub fn pump_notifications(&mut self) {
        for notification in self.explorer.take_notifications() {
            info!(level = ?notification.level, "{}", notification.message);
            self.status_message = Some((notification, Instant::now()));
        }
    }

    pub fn dismiss_status(&mut self) {
        self.status_message = None;
    }

    /// Persist the active session; called on quit.
    pub async fn save_session(&mut self) {
        let id = self.explorer.active_worktree_id().to_string();
        let record = self.explorer.session_record();
        let coordinator = self.explorer.coordinator();
        if let Err(e) = coordinator.store().save(&id, &record).await {
            warn!(worktree = %id, error = %e, "failed to persist session on quit");
        }
    }

    pub async fn shutdown(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop().await;
        }
        self.save_session().await;
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}
