use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::warn;

use crate::fs::dir_cache::DirListingCache;
use crate::fs::filter::{is_noise_name, load_gitignore, PatternSet};
use crate::git::status::GitStatus;

/// Type of filesystem node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    File,
    Directory,
}

/// A node in the built forest.
///
/// Immutable once produced: a rebuild allocates an entirely new forest.
/// Children are owned exclusively by the parent; files always carry an
/// empty vec, and an empty vec on a directory means "no matching
/// children" or "depth limit reached".
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub name: String,
    pub path: PathBuf,
    pub node_type: NodeType,
    pub depth: usize,
    pub size: Option<u64>,
    pub modified_at: Option<SystemTime>,
    pub git_status: Option<GitStatus>,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn is_dir(&self) -> bool {
        self.node_type == NodeType::Directory
    }
}

/// Sort criteria for sibling ordering within a type group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Name,
    Size,
    Modified,
    Type,
}

impl SortBy {
    /// Parse from a config string, defaulting to name order.
    pub fn parse(s: &str) -> Self {
        match s {
            "size" => SortBy::Size,
            "modified" => SortBy::Modified,
            "type" => SortBy::Type,
            _ => SortBy::Name,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortBy::Name => "Name",
            SortBy::Size => "Size",
            SortBy::Modified => "Modified",
            SortBy::Type => "Type",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            SortBy::Name => SortBy::Size,
            SortBy::Size => SortBy::Modified,
            SortBy::Modified => SortBy::Type,
            SortBy::Type => SortBy::Name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Self {
        match s {
            "desc" => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Resolved build-time settings for one scan.
#[derive(Debug, Clone)]
pub struct TreeBuilderConfig {
    pub show_hidden: bool,
    pub respect_gitignore: bool,
    pub custom_ignore: Vec<String>,
    pub max_depth: usize,
    pub sort_by: SortBy,
    pub sort_direction: SortDirection,
    /// Stat size/mtime per surviving entry. Off by default to bound
    /// syscall volume when the display doesn't need them.
    pub collect_metadata: bool,
}

impl Default for TreeBuilderConfig {
    fn default() -> Self {
        Self {
            show_hidden: false,
            respect_gitignore: true,
            custom_ignore: Vec::new(),
            max_depth: 32,
            sort_by: SortBy::Name,
            sort_direction: SortDirection::Asc,
            collect_metadata: false,
        }
    }
}

/// Build a sorted, filtered forest of `root`'s children.
///
/// A root that is not a directory yields an empty forest, not an error.
/// Root `.gitignore` patterns are loaded once per build when enabled.
/// Unreadable subtrees degrade to an empty children list.
pub fn build(
    cache: &mut DirListingCache,
    root: &Path,
    config: &TreeBuilderConfig,
    force_refresh: bool,
) -> Vec<TreeNode> {
    if !root.is_dir() {
        return Vec::new();
    }
    let gitignore = if config.respect_gitignore {
        load_gitignore(root)
    } else {
        PatternSet::empty()
    };
    let custom = PatternSet::compile(&config.custom_ignore);
    scan_dir(cache, root, root, 0, config, &gitignore, &custom, force_refresh)
}

#[allow(clippy::too_many_arguments)]
fn scan_dir(
    cache: &mut DirListingCache,
    root: &Path,
    dir: &Path,
    depth: usize,
    config: &TreeBuilderConfig,
    gitignore: &PatternSet,
    custom: &PatternSet,
    force_refresh: bool,
) -> Vec<TreeNode> {
    let entries = match cache.get_or_read(dir, force_refresh) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "unreadable directory, skipping subtree");
            return Vec::new();
        }
    };

    let mut nodes = Vec::new();
    for entry in entries {
        let rel = relative_slash_path(root, &entry.path);
        if is_excluded(&entry.name, &rel, entry.is_dir, config, gitignore, custom) {
            continue;
        }

        let (size, modified_at) = if config.collect_metadata {
            match std::fs::symlink_metadata(&entry.path) {
                Ok(meta) => (Some(meta.len()), meta.modified().ok()),
                Err(_) => (None, None),
            }
        } else {
            (None, None)
        };

        let children = if entry.is_dir && depth < config.max_depth {
            scan_dir(
                cache,
                root,
                &entry.path,
                depth + 1,
                config,
                gitignore,
                custom,
                force_refresh,
            )
        } else {
            Vec::new()
        };

        nodes.push(TreeNode {
            name: entry.name,
            path: entry.path,
            node_type: if entry.is_dir {
                NodeType::Directory
            } else {
                NodeType::File
            },
            depth,
            size,
            modified_at,
            git_status: None,
            children,
        });
    }

    sort_siblings(&mut nodes, config.sort_by, config.sort_direction);
    nodes
}

/// Exclusion rules in fixed priority order: noise names always win,
/// then dotfiles, then gitignore, then user globs.
fn is_excluded(
    name: &str,
    rel_path: &str,
    is_dir: bool,
    config: &TreeBuilderConfig,
    gitignore: &PatternSet,
    custom: &PatternSet,
) -> bool {
    if is_noise_name(name) {
        return true;
    }
    if !config.show_hidden && name.starts_with('.') {
        return true;
    }
    if gitignore.matches(name, rel_path, is_dir) {
        return true;
    }
    custom.matches(name, rel_path, is_dir)
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Sort one level: directories before files, then the configured
/// comparator within each group, reversed for descending order.
fn sort_siblings(nodes: &mut [TreeNode], sort_by: SortBy, direction: SortDirection) {
    nodes.sort_by(|a, b| {
        let group = b.is_dir().cmp(&a.is_dir());
        if group != Ordering::Equal {
            return group;
        }
        let within = match sort_by {
            SortBy::Name => natural_cmp(&a.name, &b.name),
            SortBy::Size => a
                .size
                .unwrap_or(0)
                .cmp(&b.size.unwrap_or(0))
                .then_with(|| natural_cmp(&a.name, &b.name)),
            SortBy::Modified => a
                .modified_at
                .cmp(&b.modified_at)
                .then_with(|| natural_cmp(&a.name, &b.name)),
            SortBy::Type => extension_of(&a.name)
                .cmp(extension_of(&b.name))
                .then_with(|| natural_cmp(&a.name, &b.name)),
        };
        match direction {
            SortDirection::Asc => within,
            SortDirection::Desc => within.reverse(),
        }
    });
}

fn extension_of(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext,
        _ => "",
    }
}

/// Case-insensitive, numeric-aware name comparison: digit runs compare
/// as numbers, so `file2` sorts before `file10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();
    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return a.cmp(b), // stable tiebreak for case-only differences
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ac), Some(bc)) => {
                if ac.is_ascii_digit() && bc.is_ascii_digit() {
                    let an = take_digits(&mut ai);
                    let bn = take_digits(&mut bi);
                    let cmp = compare_digit_runs(&an, &bn);
                    if cmp != Ordering::Equal {
                        return cmp;
                    }
                } else {
                    let af = ac.to_lowercase().next().unwrap_or(ac);
                    let bf = bc.to_lowercase().next().unwrap_or(bc);
                    if af != bf {
                        return af.cmp(&bf);
                    }
                    ai.next();
                    bi.next();
                }
            }
        }
    }
}

fn take_digits(iter: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = iter.peek() {
        if c.is_ascii_digit() {
            digits.push(*c);
            iter.next();
        } else {
            break;
        }
    }
    digits
}

/// Compare digit runs numerically without overflow: strip leading
/// zeros, compare lengths, then lexically.
fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Separate overlay pass: annotate every node whose path is a key in
/// the latest status map. Paths absent from the map stay clean (None).
pub fn overlay_git_status(forest: &mut [TreeNode], statuses: &HashMap<PathBuf, GitStatus>) {
    for node in forest {
        node.git_status = statuses.get(&node.path).copied();
        overlay_git_status(&mut node.children, statuses);
    }
}

/// Project the forest down to nodes carrying a git status, keeping
/// ancestor directories of any surviving descendant.
pub fn git_only_filter(forest: &[TreeNode]) -> Vec<TreeNode> {
    forest
        .iter()
        .filter_map(|node| {
            let children = git_only_filter(&node.children);
            if node.git_status.is_some() || !children.is_empty() {
                let mut kept = node.clone();
                kept.children = children;
                Some(kept)
            } else {
                None
            }
        })
        .collect()
}
