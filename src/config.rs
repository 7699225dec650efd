//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--show-hidden`, `--max-depth`, etc.)
//! 2. `$ARBOR_CONFIG` environment variable (path to config file)
//! 3. Project-local `.arbor.toml` in the current working directory
//! 4. Global `~/.config/arbor/config.toml`
//! 5. Built-in defaults

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::fs::tree::{SortBy, SortDirection, TreeBuilderConfig};
use crate::fs::watcher::{DEFAULT_BATCH_WINDOW_MS, DEFAULT_MAX_WAIT_MS};

// ── Section configs ──────────────────────────────────────────────────────────

/// Tree construction and display settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TreeConfig {
    /// Show dotfiles.
    pub show_hidden: Option<bool>,
    /// Apply root `.gitignore` patterns.
    pub respect_gitignore: Option<bool>,
    /// Extra ignore globs (`*`, `?`, trailing `/` for directories).
    pub custom_ignore: Option<Vec<String>>,
    /// Recursion limit; nodes at the limit keep empty children.
    pub max_depth: Option<usize>,
    /// Sort order: "name", "size", "modified", "type".
    pub sort_by: Option<String>,
    /// "asc" or "desc".
    pub sort_direction: Option<String>,
    /// Stat size/mtime per entry for display.
    pub show_metadata: Option<bool>,
}

/// Filesystem watcher settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WatcherConfig {
    /// Enable the watcher for auto-refresh.
    pub enabled: Option<bool>,
    /// Batch window in milliseconds; resets on every event.
    pub refresh_debounce_ms: Option<u64>,
    /// Hard flush ceiling in milliseconds under continuous churn.
    pub max_wait_ms: Option<u64>,
}

/// Git overlay settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GitConfig {
    /// Overlay version-control status on the tree.
    pub show_status: Option<bool>,
}

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Starting directory (overridden by the CLI positional arg).
    pub default_path: Option<String>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different
/// sources can be merged together (CLI overrides file, file overrides
/// defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub tree: TreeConfig,
    pub watcher: WatcherConfig,
    pub git: GitConfig,
}

// ── Default constants ────────────────────────────────────────────────────────

/// Default recursion limit.
pub const DEFAULT_MAX_DEPTH: usize = 32;

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path — that is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("ARBOR_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".arbor.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("arbor").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning printed to stderr).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            eprintln!(
                "Warning: failed to parse config file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self` — `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                default_path: other
                    .general
                    .default_path
                    .clone()
                    .or(self.general.default_path),
            },
            tree: TreeConfig {
                show_hidden: other.tree.show_hidden.or(self.tree.show_hidden),
                respect_gitignore: other
                    .tree
                    .respect_gitignore
                    .or(self.tree.respect_gitignore),
                custom_ignore: other
                    .tree
                    .custom_ignore
                    .clone()
                    .or(self.tree.custom_ignore),
                max_depth: other.tree.max_depth.or(self.tree.max_depth),
                sort_by: other.tree.sort_by.clone().or(self.tree.sort_by),
                sort_direction: other
                    .tree
                    .sort_direction
                    .clone()
                    .or(self.tree.sort_direction),
                show_metadata: other.tree.show_metadata.or(self.tree.show_metadata),
            },
            watcher: WatcherConfig {
                enabled: other.watcher.enabled.or(self.watcher.enabled),
                refresh_debounce_ms: other
                    .watcher
                    .refresh_debounce_ms
                    .or(self.watcher.refresh_debounce_ms),
                max_wait_ms: other.watcher.max_wait_ms.or(self.watcher.max_wait_ms),
            },
            git: GitConfig {
                show_status: other.git.show_status.or(self.git.show_status),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// Candidate files are best-effort; an explicit `--config` file that
    /// is missing or malformed is a fatal startup error.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> Result<AppConfig> {
        let mut config = AppConfig::default();

        // Walk candidates in reverse so the highest-priority overwrites.
        let paths = candidate_paths();
        for path in paths.iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            let content = std::fs::read_to_string(cli_path).map_err(|e| {
                AppError::Config(format!("cannot read {}: {e}", cli_path.display()))
            })?;
            let file_cfg: AppConfig = toml::from_str(&content).map_err(|e| {
                AppError::Config(format!("cannot parse {}: {e}", cli_path.display()))
            })?;
            config = config.merge(&file_cfg);
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        Ok(config)
    }

    // ── Convenience getters with built-in defaults ──────────────────────

    pub fn show_hidden(&self) -> bool {
        self.tree.show_hidden.unwrap_or(false)
    }

    pub fn respect_gitignore(&self) -> bool {
        self.tree.respect_gitignore.unwrap_or(true)
    }

    pub fn custom_ignore(&self) -> Vec<String> {
        self.tree.custom_ignore.clone().unwrap_or_default()
    }

    pub fn max_depth(&self) -> usize {
        self.tree.max_depth.unwrap_or(DEFAULT_MAX_DEPTH)
    }

    pub fn sort_by(&self) -> &str {
        self.tree.sort_by.as_deref().unwrap_or("name")
    }

    pub fn sort_direction(&self) -> &str {
        self.tree.sort_direction.as_deref().unwrap_or("asc")
    }

    pub fn show_metadata(&self) -> bool {
        self.tree.show_metadata.unwrap_or(false)
    }

    pub fn watcher_enabled(&self) -> bool {
        self.watcher.enabled.unwrap_or(true)
    }

    pub fn refresh_debounce_ms(&self) -> u64 {
        self.watcher
            .refresh_debounce_ms
            .unwrap_or(DEFAULT_BATCH_WINDOW_MS)
    }

    pub fn max_wait_ms(&self) -> u64 {
        self.watcher.max_wait_ms.unwrap_or(DEFAULT_MAX_WAIT_MS)
    }

    pub fn show_git_status(&self) -> bool {
        self.git.show_status.unwrap_or(true)
    }

    /// Resolve into the tree builder's settings.
    pub fn builder_config(&self) -> TreeBuilderConfig {
        TreeBuilderConfig {
            show_hidden: self.show_hidden(),
            respect_gitignore: self.respect_gitignore(),
            custom_ignore: self.custom_ignore(),
            max_depth: self.max_depth(),
            sort_by: SortBy::parse(self.sort_by()),
            sort_direction: SortDirection::parse(self.sort_direction()),
            collect_metadata: self.show_metadata(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();
        assert!(!cfg.show_hidden());
        assert!(cfg.respect_gitignore());
        assert!(cfg.custom_ignore().is_empty());
        assert_eq!(cfg.max_depth(), DEFAULT_MAX_DEPTH);
        assert_eq!(cfg.sort_by(), "name");
        assert_eq!(cfg.sort_direction(), "asc");
        assert!(!cfg.show_metadata());
        assert!(cfg.watcher_enabled());
        assert_eq!(cfg.refresh_debounce_ms(), 50);
        assert_eq!(cfg.max_wait_ms(), 1000);
        assert!(cfg.show_git_status());
    }

    #[test]
    fn toml_parsing_full() {
        let toml = r#"
[general]
default_path = "/work/project"

[tree]
show_hidden = true
respect_gitignore = false
custom_ignore = ["*.log", "tmp/"]
max_depth = 8
sort_by = "modified"
sort_direction = "desc"
show_metadata = true

[watcher]
enabled = false
refresh_debounce_ms = 120
max_wait_ms = 2000

[git]
show_status = false
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert_eq!(cfg.general.default_path.as_deref(), Some("/work/project"));
        assert!(cfg.show_hidden());
        assert!(!cfg.respect_gitignore());
        assert_eq!(cfg.custom_ignore(), vec!["*.log", "tmp/"]);
        assert_eq!(cfg.max_depth(), 8);
        assert_eq!(cfg.sort_by(), "modified");
        assert_eq!(cfg.sort_direction(), "desc");
        assert!(cfg.show_metadata());
        assert!(!cfg.watcher_enabled());
        assert_eq!(cfg.refresh_debounce_ms(), 120);
        assert_eq!(cfg.max_wait_ms(), 2000);
        assert!(!cfg.show_git_status());
    }

    #[test]
    fn toml_parsing_partial_keeps_defaults() {
        let toml = r#"
[tree]
show_hidden = true
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert!(cfg.show_hidden());
        assert!(cfg.respect_gitignore());
        assert_eq!(cfg.refresh_debounce_ms(), 50);
    }

    #[test]
    fn merge_overrides_only_set_values() {
        let base: AppConfig = toml::from_str(
            r#"
[tree]
show_hidden = false
max_depth = 16

[watcher]
refresh_debounce_ms = 75
"#,
        )
        .unwrap();
        let over: AppConfig = toml::from_str(
            r#"
[tree]
show_hidden = true
"#,
        )
        .unwrap();

        let merged = base.merge(&over);
        assert!(merged.show_hidden()); // overridden
        assert_eq!(merged.max_depth(), 16); // from base
        assert_eq!(merged.refresh_debounce_ms(), 75); // from base
    }

    #[test]
    fn merge_none_does_not_clear_some() {
        let base: AppConfig = toml::from_str(
            r#"
[git]
show_status = false
"#,
        )
        .unwrap();
        let merged = base.merge(&AppConfig::default());
        assert!(!merged.show_git_status());
    }

    #[test]
    fn explicit_config_path_failure_is_fatal() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/arbor.toml")), None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn explicit_malformed_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is { not valid toml").unwrap();
        let result = AppConfig::load(Some(&path), None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn cli_overrides_have_highest_priority() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[tree]
max_depth = 4
show_hidden = true
"#,
        )
        .unwrap();

        let overrides = AppConfig {
            tree: TreeConfig {
                max_depth: Some(12),
                ..Default::default()
            },
            ..Default::default()
        };
        let cfg = AppConfig::load(Some(&path), Some(&overrides)).unwrap();
        assert_eq!(cfg.max_depth(), 12);
        assert!(cfg.show_hidden());
    }

    #[test]
    fn builder_config_resolution() {
        let cfg: AppConfig = toml::from_str(
            r#"
[tree]
sort_by = "size"
sort_direction = "desc"
custom_ignore = ["*.bak"]
"#,
        )
        .unwrap();
        let builder = cfg.builder_config();
        assert_eq!(builder.sort_by, SortBy::Size);
        assert_eq!(builder.sort_direction, SortDirection::Desc);
        assert_eq!(builder.custom_ignore, vec!["*.bak"]);
        assert_eq!(builder.max_depth, DEFAULT_MAX_DEPTH);
    }
}
