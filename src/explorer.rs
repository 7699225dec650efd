use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::fs::dir_cache::DirListingCache;
use crate::fs::tree::{self, TreeBuilderConfig, TreeNode};
use crate::git::status::{GitStatus, GitStatusProvider};
use crate::git::status_cache::GitStatusCache;
use crate::git::worktree::{worktree_id, Worktree};
use crate::session::{SessionRecord, SessionStore};
use crate::switch::{SwitchCoordinator, SwitchOutcome, SwitchRequest};
use crate::view::virtualizer::{self, FlatRow, ViewportWindow};

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Short-lived, dismissable message for the UI layer.
#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotifyLevel,
    pub message: String,
}

/// Application root of the live file-tree engine.
///
/// Owns the caches, the built forest and its flat projection, the
/// expansion/selection/scroll state, and the worktree-switch
/// coordinator. All refresh triggers (manual, watcher batch, git
/// refresh) funnel into the single `refresh` pipeline.
pub struct Explorer<P, S> {
    config: TreeBuilderConfig,
    show_git_status: bool,
    provider: Arc<P>,
    dir_cache: DirListingCache,
    git_cache: GitStatusCache,
    coordinator: Arc<SwitchCoordinator<S>>,

    root: PathBuf,
    active_id: String,
    raw_tree: Vec<TreeNode>,
    tree: Vec<TreeNode>,
    rows: Vec<FlatRow>,
    expanded: HashSet<PathBuf>,
    selected: Option<PathBuf>,
    scroll_offset: usize,
    git_only_mode: bool,
    last_copy_profile: String,
    loading: bool,
    git_available: bool,
    git_overlay: HashMap<PathBuf, GitStatus>,
    rebuild_epoch: u64,
    notifications: VecDeque<Notification>,
}

impl<P, S> Explorer<P, S>
where
    P: GitStatusProvider + 'static,
    S: SessionStore,
{
    pub fn new(
        root: &Path,
        config: TreeBuilderConfig,
        show_git_status: bool,
        provider: Arc<P>,
        store: S,
    ) -> Self {
        Self {
            config,
            show_git_status,
            provider,
            dir_cache: DirListingCache::default(),
            git_cache: GitStatusCache::default(),
            coordinator: Arc::new(SwitchCoordinator::new(store)),
            root: root.to_path_buf(),
            active_id: worktree_id(root),
            raw_tree: Vec::new(),
            tree: Vec::new(),
            rows: Vec::new(),
            expanded: HashSet::new(),
            selected: None,
            scroll_offset: 0,
            git_only_mode: false,
            last_copy_profile: "default".to_string(),
            loading: false,
            git_available: true,
            git_overlay: HashMap::new(),
            rebuild_epoch: 0,
            notifications: VecDeque::new(),
        }
    }

    // ── Snapshot (read-only) ────────────────────────────────────────────

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn active_worktree_id(&self) -> &str {
        &self.active_id
    }

    /// Display forest: git-only filtered when that mode is on.
    #[allow(dead_code)]
    pub fn tree(&self) -> &[TreeNode] {
        &self.tree
    }

    /// Unfiltered forest.
    #[allow(dead_code)]
    pub fn raw_tree(&self) -> &[TreeNode] {
        &self.raw_tree
    }

    pub fn rows(&self) -> &[FlatRow] {
        &self.rows
    }

    pub fn expanded_folders(&self) -> &HashSet<PathBuf> {
        &self.expanded
    }

    pub fn selected_path(&self) -> Option<&Path> {
        self.selected.as_deref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn git_only_mode(&self) -> bool {
        self.git_only_mode
    }

    pub fn git_available(&self) -> bool {
        self.git_available
    }

    /// Git status of a path per the latest overlay, for rendering.
    pub fn status_of(&self, path: &Path) -> Option<GitStatus> {
        self.git_overlay.get(path).copied()
    }

    #[allow(dead_code)]
    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn config(&self) -> &TreeBuilderConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut TreeBuilderConfig {
        &mut self.config
    }

    pub fn window(&self, viewport_height: usize) -> ViewportWindow<'_> {
        virtualizer::window(&self.rows, self.scroll_offset, viewport_height)
    }

    // ── Notifications ───────────────────────────────────────────────────

    pub fn notify(&mut self, level: NotifyLevel, message: String) {
        self.notifications.push_back(Notification { level, message });
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    // ── Rebuild pipeline ────────────────────────────────────────────────

    /// Rebuild the forest and reconcile view state. Every refresh
    /// trigger lands here; a continuation whose epoch was superseded
    /// discards its own result.
    pub async fn refresh(&mut self, force_refresh: bool) {
        self.rebuild_epoch += 1;
        let epoch = self.rebuild_epoch;
        self.loading = true;

        let mut forest = tree::build(&mut self.dir_cache, &self.root, &self.config, force_refresh);

        let git_result = if self.show_git_status && self.git_available {
            Some(
                self.git_cache
                    .get_or_fetch(&self.provider, &self.root, force_refresh)
                    .await,
            )
        } else {
            None
        };

        // Superseded by a newer rebuild: the newer one owns the state
        // and the loading flag now.
        if epoch != self.rebuild_epoch {
            return;
        }

        match git_result {
            Some(Ok(statuses)) => {
                tree::overlay_git_status(&mut forest, &statuses);
                self.git_overlay = statuses;
            }
            Some(Err(e)) => {
                warn!(root = %self.root.display(), error = %e, "git status unavailable");
                self.git_available = false;
                self.git_overlay.clear();
                self.notify(NotifyLevel::Warning, "git status unavailable".to_string());
            }
            None => {}
        }

        self.install_forest(forest);
        self.loading = false;
    }

    /// Re-enable the git overlay after a degrade, for an explicit
    /// git-status refresh trigger.
    pub async fn refresh_git_status(&mut self) {
        self.git_available = true;
        self.invalidate_git_cache();
        self.refresh(false).await;
    }

    /// Drop the cached status map for the active root so the next
    /// refresh queries git again.
    pub fn invalidate_git_cache(&mut self) {
        let root = self.root.clone();
        self.git_cache.invalidate(&root);
    }

    fn install_forest(&mut self, forest: Vec<TreeNode>) {
        let anchor = virtualizer::capture_anchor(&self.rows, self.scroll_offset);
        self.raw_tree = forest;
        self.tree = if self.git_only_mode {
            tree::git_only_filter(&self.raw_tree)
        } else {
            self.raw_tree.clone()
        };
        self.rows = virtualizer::flatten(&self.tree, &self.expanded);
        self.scroll_offset =
            virtualizer::restore_anchor(&self.rows, anchor.as_deref(), self.scroll_offset);
        self.selected = virtualizer::repair_selection(self.selected.as_deref(), &self.tree);
    }

    fn reflatten(&mut self) {
        self.rows = virtualizer::flatten(&self.tree, &self.expanded);
    }

    /// Invalidate the listing cache for the directories touched by a
    /// watcher batch (each event path's parent), ahead of a refresh.
    pub fn invalidate_changed_dirs(&mut self, relative_paths: &[String]) {
        for rel in relative_paths {
            let abs = self.root.join(rel);
            let parent = abs.parent().unwrap_or(&self.root).to_path_buf();
            self.dir_cache.invalidate(&parent);
            self.dir_cache.invalidate(&abs);
        }
    }

    /// Periodic tick: sweep expired cache entries.
    pub fn cleanup_caches(&mut self) {
        self.dir_cache.cleanup();
        self.git_cache.cleanup();
    }

    // ── Navigation intents ──────────────────────────────────────────────

    /// Set the selection; a path not in the current display forest is
    /// ignored so the selection invariant holds.
    pub fn select(&mut self, path: Option<PathBuf>) {
        match path {
            None => self.selected = None,
            Some(p) => {
                if forest_contains(&self.tree, &p) {
                    self.selected = Some(p);
                }
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn expand(&mut self, path: &Path) {
        self.expanded.insert(path.to_path_buf());
        self.reflatten();
    }

    pub fn collapse(&mut self, path: &Path) {
        self.expanded.remove(path);
        self.reflatten();
    }

    pub fn toggle_expand(&mut self, path: &Path) {
        if self.expanded.contains(path) {
            self.collapse(path);
        } else {
            self.expand(path);
        }
    }

    pub fn toggle_git_only(&mut self) {
        self.git_only_mode = !self.git_only_mode;
        self.tree = if self.git_only_mode {
            tree::git_only_filter(&self.raw_tree)
        } else {
            self.raw_tree.clone()
        };
        self.reflatten();
        self.selected = virtualizer::repair_selection(self.selected.as_deref(), &self.tree);
    }

    fn selected_row_index(&self) -> Option<usize> {
        let selected = self.selected.as_deref()?;
        self.rows.iter().position(|row| row.path == selected)
    }

    pub fn select_next(&mut self, viewport_height: usize) {
        let next = match self.selected_row_index() {
            Some(i) if i + 1 < self.rows.len() => i + 1,
            Some(i) => i,
            None => 0,
        };
        self.select_row(next, viewport_height);
    }

    pub fn select_previous(&mut self, viewport_height: usize) {
        let prev = self.selected_row_index().map(|i| i.saturating_sub(1)).unwrap_or(0);
        self.select_row(prev, viewport_height);
    }

    pub fn select_first(&mut self, viewport_height: usize) {
        self.select_row(0, viewport_height);
    }

    pub fn select_last(&mut self, viewport_height: usize) {
        if !self.rows.is_empty() {
            self.select_row(self.rows.len() - 1, viewport_height);
        }
    }

    fn select_row(&mut self, index: usize, viewport_height: usize) {
        if let Some(row) = self.rows.get(index) {
            self.selected = Some(row.path.clone());
            self.ensure_visible(index, viewport_height);
        }
    }

    /// Keep the selection inside the viewport. Selection movement is
    /// explicit scroll input, so clamping here is allowed.
    fn ensure_visible(&mut self, index: usize, viewport_height: usize) {
        if viewport_height == 0 {
            return;
        }
        if index < self.scroll_offset {
            self.scroll_offset = index;
        } else if index >= self.scroll_offset + viewport_height {
            self.scroll_offset = index + 1 - viewport_height;
        } else if self.scroll_offset > self.rows.len() {
            // Explicit input after a structural shrink: clamp now.
            self.scroll_offset =
                virtualizer::clamp_scroll(self.scroll_offset, self.rows.len(), viewport_height);
        }
    }

    /// Explicit scroll by a signed row delta; clamps into range.
    pub fn scroll_by(&mut self, delta: isize, viewport_height: usize) {
        let raw = self.scroll_offset.saturating_add_signed(delta);
        self.scroll_offset = virtualizer::clamp_scroll(raw, self.rows.len(), viewport_height);
    }

    // ── Session state ───────────────────────────────────────────────────

    /// Current state as a persistable record. Stale expanded paths are
    /// pruned opportunistically once a forest exists.
    pub fn session_record(&self) -> SessionRecord {
        let mut expanded: Vec<String> = self
            .expanded
            .iter()
            .filter(|p| self.raw_tree.is_empty() || forest_contains(&self.raw_tree, p))
            .map(|p| p.to_string_lossy().to_string())
            .collect();
        expanded.sort();
        SessionRecord {
            selected_path: self
                .selected
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            expanded_folders: expanded,
            git_only_mode: self.git_only_mode,
            last_copy_profile: self.last_copy_profile.clone(),
            timestamp: 0,
        }
        .stamped()
    }

    /// Apply a restored record to the current root (startup path).
    pub fn restore_session(&mut self, record: &SessionRecord) {
        self.expanded = record.expanded_folders.iter().map(PathBuf::from).collect();
        self.selected = record.selected_path.as_ref().map(PathBuf::from);
        self.git_only_mode = record.git_only_mode;
        self.last_copy_profile = record.last_copy_profile.clone();
    }

    // ── Worktree switching ──────────────────────────────────────────────

    pub fn coordinator(&self) -> Arc<SwitchCoordinator<S>> {
        Arc::clone(&self.coordinator)
    }

    /// Record the switch intent synchronously, capturing the outgoing
    /// session as of this instant.
    pub fn prepare_switch(&self, target: Worktree) -> SwitchRequest {
        self.coordinator
            .begin(&self.active_id, self.session_record(), target)
    }

    /// Apply a resolved switch. Superseded outcomes are silent no-ops;
    /// the winning one swaps the active root, restores the target's
    /// session, clears root-scoped caches, and rebuilds.
    pub async fn apply_switch(&mut self, outcome: SwitchOutcome) {
        let SwitchOutcome::Applied {
            token,
            target,
            record,
        } = outcome
        else {
            return;
        };
        // A newer switch may have begun after this one resolved.
        if !self.coordinator.is_latest(token) {
            return;
        }

        let old_root = self.root.clone();
        self.git_cache.invalidate(&old_root);
        self.dir_cache.clear();

        self.root = target.path.clone();
        self.active_id = target.id.clone();
        self.expanded = record.expanded_folders.iter().map(PathBuf::from).collect();
        self.selected = record.selected_path.as_ref().map(PathBuf::from);
        self.git_only_mode = record.git_only_mode;
        self.last_copy_profile = record.last_copy_profile.clone();
        self.scroll_offset = 0;
        self.git_available = true;
        self.git_overlay.clear();
        self.raw_tree.clear();
        self.tree.clear();
        self.rows.clear();

        self.notify(
            NotifyLevel::Success,
            format!("Switched to worktree {}", target.name),
        );
        self.refresh(true).await;
    }
}

fn forest_contains(forest: &[TreeNode], path: &Path) -> bool {
    forest
        .iter()
        .any(|node| node.path == path || forest_contains(&node.children, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use crate::git::status::GitStatus;
    use std::collections::HashMap;
    use std::fs::{self, File};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Provider for repos without git: every fetch is a typed failure.
    struct NoGit;

    impl GitStatusProvider for NoGit {
        fn fetch_status(&self, _cwd: &Path) -> Result<HashMap<PathBuf, GitStatus>> {
            Err(AppError::Git("not a git repository".into()))
        }

        fn is_repo(&self, _path: &Path) -> bool {
            false
        }
    }

    /// Provider returning a fixed status map.
    struct FixedGit {
        statuses: Mutex<HashMap<PathBuf, GitStatus>>,
    }

    impl GitStatusProvider for FixedGit {
        fn fetch_status(&self, _cwd: &Path) -> Result<HashMap<PathBuf, GitStatus>> {
            Ok(self.statuses.lock().unwrap().clone())
        }

        fn is_repo(&self, _path: &Path) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct MemStore {
        saved: Mutex<HashMap<String, SessionRecord>>,
    }

    impl SessionStore for MemStore {
        async fn load(&self, worktree_id: &str) -> Option<SessionRecord> {
            self.saved.lock().unwrap().get(worktree_id).cloned()
        }

        async fn save(&self, worktree_id: &str, record: &SessionRecord) -> Result<()> {
            self.saved
                .lock()
                .unwrap()
                .insert(worktree_id.to_string(), record.clone());
            Ok(())
        }
    }

    fn setup_root() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        File::create(dir.path().join("src").join("a.rs")).unwrap();
        File::create(dir.path().join("src").join("b.rs")).unwrap();
        File::create(dir.path().join("readme.md")).unwrap();
        dir
    }

    fn explorer(dir: &TempDir) -> Explorer<NoGit, MemStore> {
        Explorer::new(
            dir.path(),
            TreeBuilderConfig::default(),
            false,
            Arc::new(NoGit),
            MemStore::default(),
        )
    }

    fn row_names<P: GitStatusProvider + 'static, S: SessionStore>(
        e: &Explorer<P, S>,
    ) -> Vec<String> {
        e.rows().iter().map(|r| r.name.clone()).collect()
    }

    #[tokio::test]
    async fn refresh_builds_rows_and_resets_loading() {
        let dir = setup_root();
        let mut e = explorer(&dir);
        e.refresh(false).await;
        assert!(!e.loading());
        assert_eq!(row_names(&e), vec!["src", "readme.md"]);
    }

    #[tokio::test]
    async fn expand_and_collapse_update_rows() {
        let dir = setup_root();
        let mut e = explorer(&dir);
        e.refresh(false).await;

        let src = dir.path().join("src");
        e.expand(&src);
        assert_eq!(row_names(&e), vec!["src", "a.rs", "b.rs", "readme.md"]);

        e.collapse(&src);
        assert_eq!(row_names(&e), vec!["src", "readme.md"]);

        e.toggle_expand(&src);
        assert_eq!(e.rows().len(), 4);
        e.toggle_expand(&src);
        assert_eq!(e.rows().len(), 2);
    }

    #[tokio::test]
    async fn select_accepts_present_paths_only() {
        let dir = setup_root();
        let mut e = explorer(&dir);
        e.refresh(false).await;

        e.select(Some(dir.path().join("readme.md")));
        assert_eq!(e.selected_path(), Some(dir.path().join("readme.md").as_path()));

        e.select(Some(dir.path().join("ghost.md")));
        assert_eq!(e.selected_path(), Some(dir.path().join("readme.md").as_path()));

        e.clear_selection();
        assert_eq!(e.selected_path(), None);
    }

    #[tokio::test]
    async fn deleting_selected_leaf_reassigns_to_parent() {
        let dir = setup_root();
        let mut e = explorer(&dir);
        e.refresh(false).await;
        e.expand(&dir.path().join("src"));
        e.select(Some(dir.path().join("src").join("a.rs")));

        fs::remove_file(dir.path().join("src").join("a.rs")).unwrap();
        e.refresh(true).await;

        assert_eq!(e.selected_path(), Some(dir.path().join("src").as_path()));
    }

    #[tokio::test]
    async fn deleting_unrelated_node_keeps_selection() {
        let dir = setup_root();
        let mut e = explorer(&dir);
        e.refresh(false).await;
        e.select(Some(dir.path().join("readme.md")));

        fs::remove_file(dir.path().join("src").join("b.rs")).unwrap();
        e.refresh(true).await;

        assert_eq!(e.selected_path(), Some(dir.path().join("readme.md").as_path()));
    }

    #[tokio::test]
    async fn no_selection_is_never_auto_assigned() {
        let dir = setup_root();
        let mut e = explorer(&dir);
        e.refresh(false).await;
        assert_eq!(e.selected_path(), None);
        e.refresh(true).await;
        assert_eq!(e.selected_path(), None);
    }

    #[tokio::test]
    async fn row_navigation_moves_selection() {
        let dir = setup_root();
        let mut e = explorer(&dir);
        e.refresh(false).await;

        e.select_next(10); // no selection: takes the first row
        assert_eq!(e.selected_path(), Some(dir.path().join("src").as_path()));
        e.select_next(10);
        assert_eq!(e.selected_path(), Some(dir.path().join("readme.md").as_path()));
        e.select_next(10); // clamped at the end
        assert_eq!(e.selected_path(), Some(dir.path().join("readme.md").as_path()));
        e.select_previous(10);
        assert_eq!(e.selected_path(), Some(dir.path().join("src").as_path()));
        e.select_last(10);
        assert_eq!(e.selected_path(), Some(dir.path().join("readme.md").as_path()));
        e.select_first(10);
        assert_eq!(e.selected_path(), Some(dir.path().join("src").as_path()));
    }

    #[tokio::test]
    async fn git_degrade_retains_tree_and_notifies() {
        let dir = setup_root();
        let mut e: Explorer<NoGit, MemStore> = Explorer::new(
            dir.path(),
            TreeBuilderConfig::default(),
            true,
            Arc::new(NoGit),
            MemStore::default(),
        );
        e.refresh(false).await;
        assert!(!e.git_available());
        assert!(!e.rows().is_empty());
        let notes = e.take_notifications();
        assert!(notes
            .iter()
            .any(|n| n.level == NotifyLevel::Warning && n.message.contains("git status")));
        assert!(!e.loading());
    }

    #[tokio::test]
    async fn git_overlay_and_git_only_mode() {
        let dir = setup_root();
        let mut statuses = HashMap::new();
        statuses.insert(dir.path().join("src").join("a.rs"), GitStatus::Modified);
        let provider = Arc::new(FixedGit {
            statuses: Mutex::new(statuses),
        });
        let mut e = Explorer::new(
            dir.path(),
            TreeBuilderConfig::default(),
            true,
            provider,
            MemStore::default(),
        );
        e.refresh(false).await;

        // raw tree keeps everything; git-only narrows to changed paths
        // plus their ancestors.
        assert_eq!(e.raw_tree().len(), 2);
        e.toggle_git_only();
        assert!(e.git_only_mode());
        assert_eq!(e.tree().len(), 1);
        assert_eq!(e.tree()[0].name, "src");

        e.toggle_git_only();
        assert_eq!(e.tree().len(), 2);
    }

    #[tokio::test]
    async fn session_record_prunes_stale_expanded_paths() {
        let dir = setup_root();
        let mut e = explorer(&dir);
        e.refresh(false).await;
        e.expand(&dir.path().join("src"));
        e.expand(&dir.path().join("ghost-dir"));

        let record = e.session_record();
        assert_eq!(
            record.expanded_folders,
            vec![dir.path().join("src").to_string_lossy().to_string()]
        );
    }

    #[tokio::test]
    async fn switch_applies_target_session_and_persists_outgoing() {
        let dir_a = setup_root();
        let dir_b = TempDir::new().unwrap();
        fs::create_dir(dir_b.path().join("lib")).unwrap();

        let mut e = explorer(&dir_a);
        e.refresh(false).await;
        e.expand(&dir_a.path().join("src"));
        e.select(Some(dir_a.path().join("readme.md")));

        let target = Worktree {
            id: worktree_id(dir_b.path()),
            path: dir_b.path().to_path_buf(),
            name: "feature".to_string(),
            branch: Some("feature".to_string()),
            is_current: false,
        };
        let outgoing_id = e.active_worktree_id().to_string();

        let request = e.prepare_switch(target.clone());
        let coordinator = e.coordinator();
        let outcome = coordinator.run(request).await;
        e.apply_switch(outcome).await;

        assert_eq!(e.root(), dir_b.path());
        assert_eq!(e.active_worktree_id(), target.id);
        assert_eq!(row_names(&e), vec!["lib"]);
        assert!(e
            .take_notifications()
            .iter()
            .any(|n| n.level == NotifyLevel::Success));

        let saved = coordinator.store().saved.lock().unwrap().clone();
        let outgoing = saved.get(&outgoing_id).expect("outgoing session persisted");
        assert_eq!(
            outgoing.selected_path.as_deref(),
            Some(dir_a.path().join("readme.md").to_str().unwrap())
        );
    }

    #[tokio::test]
    async fn superseded_switch_is_a_silent_noop() {
        let dir_a = setup_root();
        let dir_b = TempDir::new().unwrap();
        let dir_c = TempDir::new().unwrap();
        File::create(dir_c.path().join("only.txt")).unwrap();

        let mut e = explorer(&dir_a);
        e.refresh(false).await;

        let make_target = |d: &TempDir, name: &str| Worktree {
            id: worktree_id(d.path()),
            path: d.path().to_path_buf(),
            name: name.to_string(),
            branch: None,
            is_current: false,
        };

        // A then B requested before A resolves.
        let request_a = e.prepare_switch(make_target(&dir_b, "b"));
        let request_b = e.prepare_switch(make_target(&dir_c, "c"));
        let coordinator = e.coordinator();
        let outcome_a = coordinator.run(request_a).await;
        let outcome_b = coordinator.run(request_b).await;

        e.apply_switch(outcome_a).await;
        assert_eq!(e.root(), dir_a.path(), "superseded switch must not apply");
        assert!(e.take_notifications().is_empty());

        e.apply_switch(outcome_b).await;
        assert_eq!(e.root(), dir_c.path());
        assert_eq!(row_names(&e), vec!["only.txt"]);
    }

    #[tokio::test]
    async fn switching_back_restores_persisted_session() {
        let dir_a = setup_root();
        let dir_b = TempDir::new().unwrap();

        let mut e = explorer(&dir_a);
        e.refresh(false).await;
        e.expand(&dir_a.path().join("src"));
        e.select(Some(dir_a.path().join("src").join("a.rs")));

        let id_a = e.active_worktree_id().to_string();
        let target_b = Worktree {
            id: worktree_id(dir_b.path()),
            path: dir_b.path().to_path_buf(),
            name: "b".to_string(),
            branch: None,
            is_current: false,
        };
        let back_to_a = Worktree {
            id: id_a.clone(),
            path: dir_a.path().to_path_buf(),
            name: "a".to_string(),
            branch: None,
            is_current: false,
        };

        let coordinator = e.coordinator();
        let outcome = coordinator.run(e.prepare_switch(target_b)).await;
        e.apply_switch(outcome).await;
        assert_eq!(e.selected_path(), None);

        let outcome = coordinator.run(e.prepare_switch(back_to_a)).await;
        e.apply_switch(outcome).await;

        assert_eq!(e.root(), dir_a.path());
        assert!(e.expanded_folders().contains(&dir_a.path().join("src")));
        assert_eq!(
            e.selected_path(),
            Some(dir_a.path().join("src").join("a.rs").as_path())
        );
    }

    #[tokio::test]
    async fn rebuild_is_idempotent_on_unchanged_tree() {
        let dir = setup_root();
        let mut e = explorer(&dir);
        e.refresh(false).await;
        let first = e.raw_tree().to_vec();
        e.refresh(false).await;
        assert_eq!(e.raw_tree(), first.as_slice());
    }
}
