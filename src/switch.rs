use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use crate::git::worktree::Worktree;
use crate::session::{SessionRecord, SessionStore};

/// A switch in flight. The token is recorded synchronously when the
/// switch is requested, before any await, so later requests supersede
/// earlier ones no matter how their I/O interleaves.
#[derive(Debug)]
pub struct SwitchRequest {
    pub token: u64,
    pub current_id: String,
    pub snapshot: SessionRecord,
    pub target: Worktree,
}

/// Terminal outcome of a switch. `Abandoned` is silent: no state
/// mutation, no notification.
#[derive(Debug)]
pub enum SwitchOutcome {
    Applied {
        token: u64,
        target: Worktree,
        record: SessionRecord,
    },
    Abandoned,
}

/// Orchestrates worktree transitions: persist the outgoing session,
/// load the incoming one, and let only the latest-intent request apply.
pub struct SwitchCoordinator<S> {
    store: S,
    intent: AtomicU64,
}

impl<S: SessionStore> SwitchCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            intent: AtomicU64::new(0),
        }
    }

    /// Record the latest-intent token for a new switch. Must be called
    /// synchronously at request time; the snapshot captures the state
    /// as of the switch's start.
    pub fn begin(&self, current_id: &str, snapshot: SessionRecord, target: Worktree) -> SwitchRequest {
        let token = self.intent.fetch_add(1, Ordering::SeqCst) + 1;
        SwitchRequest {
            token,
            current_id: current_id.to_string(),
            snapshot,
            target,
        }
    }

    /// Is this token still the newest switch request?
    pub fn is_latest(&self, token: u64) -> bool {
        self.intent.load(Ordering::SeqCst) == token
    }

    /// Run the I/O half of a switch.
    ///
    /// Persisting the outgoing record is best-effort; a missing or
    /// corrupt target record falls back to defaults. If a newer switch
    /// was requested meanwhile, the result is discarded silently.
    pub async fn run(&self, request: SwitchRequest) -> SwitchOutcome {
        if let Err(e) = self
            .store
            .save(&request.current_id, &request.snapshot)
            .await
        {
            warn!(worktree = %request.current_id, error = %e, "failed to persist session on switch-out");
        }

        let record = self
            .store
            .load(&request.target.id)
            .await
            .unwrap_or_default();

        if !self.is_latest(request.token) {
            return SwitchOutcome::Abandoned;
        }
        SwitchOutcome::Applied {
            token: request.token,
            target: request.target,
            record,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
