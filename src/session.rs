use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppError, Result};

/// Per-worktree UI state, persisted on every switch-out and on quit,
/// restored on switch-in.
///
/// `expanded_folders` may reference paths absent from the latest
/// snapshot; they are pruned opportunistically, not guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub selected_path: Option<String>,
    pub expanded_folders: Vec<String>,
    pub git_only_mode: bool,
    pub last_copy_profile: String,
    pub timestamp: u64,
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self {
            selected_path: None,
            expanded_folders: Vec::new(),
            git_only_mode: false,
            last_copy_profile: "default".to_string(),
            timestamp: 0,
        }
    }
}

impl SessionRecord {
    pub fn stamped(mut self) -> Self {
        self.timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self
    }
}

/// Persistence backend for session records, keyed by worktree id.
/// Both operations are best-effort: failures are logged by callers,
/// never surfaced as UI errors.
#[allow(async_fn_in_trait)]
pub trait SessionStore {
    async fn load(&self, worktree_id: &str) -> Option<SessionRecord>;
    async fn save(&self, worktree_id: &str, record: &SessionRecord) -> Result<()>;
}

/// One JSON file per worktree id under the user data directory.
pub struct JsonSessionStore {
    dir: PathBuf,
}

impl JsonSessionStore {
    pub fn new() -> Self {
        let dir = dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("arbor")
            .join("sessions");
        Self { dir }
    }

    #[cfg(test)]
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn record_path(&self, worktree_id: &str) -> PathBuf {
        self.dir.join(session_file_name(worktree_id))
    }
}

impl Default for JsonSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for JsonSessionStore {
    async fn load(&self, worktree_id: &str) -> Option<SessionRecord> {
        let path = self.record_path(worktree_id);
        let content = tokio::fs::read_to_string(&path).await.ok()?;
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "corrupt session record, using defaults");
                None
            }
        }
    }

    async fn save(&self, worktree_id: &str, record: &SessionRecord) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| AppError::Session(e.to_string()))?;
        tokio::fs::write(self.record_path(worktree_id), json).await?;
        Ok(())
    }
}

/// Readable, collision-safe file name for a worktree id: the id with
/// path separators flattened, plus a short hash to disambiguate.
fn session_file_name(worktree_id: &str) -> String {
    let safe: String = worktree_id
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    let tail: String = safe.chars().rev().take(40).collect::<Vec<_>>().into_iter().rev().collect();
    format!("{}-{:08x}.json", tail.trim_start_matches('_'), fnv1a(worktree_id))
}

fn fnv1a(input: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in input.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}
