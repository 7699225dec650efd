use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{AppError, Result};

/// Default batch window; resets on every new raw event.
pub const DEFAULT_BATCH_WINDOW_MS: u64 = 50;
/// Hard ceiling from the first pending event, guaranteeing a flush
/// under continuous churn.
pub const DEFAULT_MAX_WAIT_MS: u64 = 1000;

/// Kind of filesystem change, collapsed from raw OS event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Add,
    Modify,
    Remove,
}

/// One change, root-relative and POSIX-normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: String,
    pub timestamp: SystemTime,
}

/// Sinks for watcher output. `on_batch` receives each deduplicated
/// flush; `on_event` is the legacy per-event hook, invoked for every
/// event of a batch before `on_batch`.
pub struct WatcherCallbacks {
    pub on_batch: Box<dyn FnMut(Vec<ChangeEvent>) + Send>,
    pub on_event: Option<Box<dyn FnMut(&ChangeEvent) + Send>>,
    pub on_error: Box<dyn FnMut(AppError) + Send>,
}

enum BridgeMsg {
    Event(notify::Event),
    Error(notify::Error),
}

struct WatchHandle {
    watcher: RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

/// Recursive watcher over one root path.
///
/// Raw notify events are bridged into a tokio channel and batched:
/// the window resets on every event, `max_wait` bounds the total delay,
/// and each flush delivers one deduplicated set. An OS-level watch
/// error is reported through `on_error` and forces the stopped state;
/// the caller must call `start` again explicitly.
pub struct TreeWatcher {
    root: PathBuf,
    batch_window: Duration,
    max_wait: Duration,
    watching: Arc<AtomicBool>,
    handle: Option<WatchHandle>,
}

impl TreeWatcher {
    pub fn new(root: &Path, batch_window: Duration, max_wait: Duration) -> Self {
        Self {
            root: root.to_path_buf(),
            batch_window,
            max_wait,
            watching: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watching.load(Ordering::SeqCst)
    }

    /// Begin watching. A no-op while already watching; after an error
    /// or `stop`, restarts from scratch.
    pub fn start(&mut self, callbacks: WatcherCallbacks) -> Result<()> {
        if self.is_watching() {
            return Ok(());
        }
        if let Some(stale) = self.handle.take() {
            stale.task.abort();
            drop(stale.watcher);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let bridge_tx = tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                let _ = match res {
                    Ok(event) => bridge_tx.send(BridgeMsg::Event(event)),
                    Err(error) => bridge_tx.send(BridgeMsg::Error(error)),
                };
            },
            NotifyConfig::default(),
        )?;
        watcher.watch(&self.root, RecursiveMode::Recursive)?;

        self.watching.store(true, Ordering::SeqCst);
        let task = tokio::spawn(run_batch_loop(
            rx,
            self.root.clone(),
            self.batch_window,
            self.max_wait,
            callbacks,
            self.watching.clone(),
        ));
        self.handle = Some(WatchHandle { watcher, task });
        Ok(())
    }

    /// Stop watching: cancels pending timers, drops the queue without
    /// flushing, and releases the OS watch handle. Idempotent.
    pub async fn stop(&mut self) {
        self.watching.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            drop(handle.watcher);
            handle.task.abort();
            let _ = handle.task.await;
        }
    }
}

async fn run_batch_loop(
    mut rx: mpsc::UnboundedReceiver<BridgeMsg>,
    root: PathBuf,
    batch_window: Duration,
    max_wait: Duration,
    mut callbacks: WatcherCallbacks,
    watching: Arc<AtomicBool>,
) {
    let mut pending: Vec<ChangeEvent> = Vec::new();
    let mut first_at = Instant::now();
    let mut last_at = first_at;

    loop {
        let msg = if pending.is_empty() {
            rx.recv().await
        } else {
            let deadline = flush_deadline(first_at, last_at, batch_window, max_wait);
            tokio::select! {
                msg = rx.recv() => msg,
                _ = tokio::time::sleep_until(deadline) => {
                    flush(&mut pending, &mut callbacks);
                    continue;
                }
            }
        };

        match msg {
            // Channel closed by stop(): drop the queue without flushing.
            None => break,
            Some(BridgeMsg::Event(event)) => {
                let mapped = convert_event(&root, &event);
                if mapped.is_empty() {
                    continue;
                }
                let now = Instant::now();
                if pending.is_empty() {
                    first_at = now;
                }
                last_at = now;
                pending.extend(mapped);
            }
            Some(BridgeMsg::Error(error)) => {
                debug!(error = %error, "watch backend failed, stopping");
                watching.store(false, Ordering::SeqCst);
                (callbacks.on_error)(AppError::Watcher(error.to_string()));
                break;
            }
        }
    }
}

fn flush(pending: &mut Vec<ChangeEvent>, callbacks: &mut WatcherCallbacks) {
    let batch = dedup_events(std::mem::take(pending));
    if batch.is_empty() {
        return;
    }
    if let Some(per_event) = callbacks.on_event.as_mut() {
        for event in &batch {
            per_event(event);
        }
    }
    (callbacks.on_batch)(batch);
}

/// Trailing-edge debounce with a progress guarantee: flush when the
/// window since the last event elapses, or `max_wait` since the first.
fn flush_deadline(
    first_at: Instant,
    last_at: Instant,
    batch_window: Duration,
    max_wait: Duration,
) -> Instant {
    (last_at + batch_window).min(first_at + max_wait)
}

/// Deduplicate by `(path, kind)`, keeping only the most recent event
/// per key. Arrival order of the kept events is preserved.
pub fn dedup_events(events: Vec<ChangeEvent>) -> Vec<ChangeEvent> {
    let mut seen: HashSet<(String, ChangeKind)> = HashSet::new();
    let mut kept: Vec<ChangeEvent> = Vec::new();
    for event in events.into_iter().rev() {
        if seen.insert((event.path.clone(), event.kind)) {
            kept.push(event);
        }
    }
    kept.reverse();
    kept
}

fn map_kind(kind: &notify::EventKind) -> Option<ChangeKind> {
    use notify::EventKind;
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Add),
        EventKind::Remove(_) => Some(ChangeKind::Remove),
        EventKind::Modify(_) => Some(ChangeKind::Modify),
        EventKind::Access(_) => None,
        EventKind::Any | EventKind::Other => Some(ChangeKind::Modify),
    }
}

fn convert_event(root: &Path, event: &notify::Event) -> Vec<ChangeEvent> {
    let Some(kind) = map_kind(&event.kind) else {
        return Vec::new();
    };
    let timestamp = SystemTime::now();
    event
        .paths
        .iter()
        .map(|path| ChangeEvent {
            kind,
            path: relative_posix(root, path),
            timestamp,
        })
        .collect()
}

/// Root-relative path with separators normalized to `/`.
fn relative_posix(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
