use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::fs::watcher::ChangeEvent;
use crate::switch::SwitchOutcome;

/// Application events.
pub enum Event {
    /// A key press event.
    Key(KeyEvent),
    /// A periodic tick for rendering and cache sweeps.
    Tick,
    /// Terminal resize event.
    Resize(u16, u16),
    /// A deduplicated batch of filesystem changes from the watcher.
    FsBatch(Vec<ChangeEvent>),
    /// The watcher hit an OS-level error and stopped.
    WatcherFailed(String),
    /// The I/O half of a worktree switch resolved.
    SwitchResolved(SwitchOutcome),
}

/// Async event handler that polls crossterm events and forwards them via
/// a channel. Background tasks (watcher, switch I/O) share the sender.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    tx: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    /// Create a new EventHandler with the given tick rate.
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        tokio::spawn(async move {
            loop {
                if event::poll(tick_rate).unwrap_or(false) {
                    match event::read() {
                        Ok(CrosstermEvent::Key(key)) => {
                            if event_tx.send(Event::Key(key)).is_err() {
                                break;
                            }
                        }
                        Ok(CrosstermEvent::Resize(w, h)) => {
                            if event_tx.send(Event::Resize(w, h)).is_err() {
                                break;
                            }
                        }
                        _ => {}
                    }
                } else if event_tx.send(Event::Tick).is_err() {
                    break;
                }
            }
        });

        Self { rx, tx }
    }

    /// Get a sender clone for background tasks to inject events.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Receive the next event (blocks until available).
    pub async fn next(&mut self) -> Result<Event> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| crate::error::AppError::Terminal("Event channel closed".into()))
    }
}
