use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{AppError, Result};

/// One working directory attached to a repository.
///
/// `id` is the normalized absolute path and is the sole key used for
/// session persistence and cache scoping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worktree {
    pub id: String,
    pub path: PathBuf,
    pub name: String,
    pub branch: Option<String>,
    pub is_current: bool,
}

/// Stable identity for a worktree path: canonicalized when possible,
/// the absolute form otherwise.
pub fn worktree_id(path: &Path) -> String {
    let normalized = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    normalized.to_string_lossy().to_string()
}

/// Enumerate the repository's worktrees via `git worktree list --porcelain`.
pub fn list_worktrees(repo_root: &Path, current_root: &Path) -> Result<Vec<Worktree>> {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo_root)
        .args(["worktree", "list", "--porcelain"])
        .env("GIT_TERMINAL_PROMPT", "0")
        .output();
    match output {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::Git(
            "git not found. Ensure git is installed and on PATH.".into(),
        )),
        Err(e) => Err(AppError::Git(format!("failed to run git: {e}"))),
        Ok(out) if !out.status.success() => Err(AppError::Git(
            String::from_utf8_lossy(&out.stderr).trim().to_string(),
        )),
        Ok(out) => Ok(parse_worktree_list(
            &String::from_utf8_lossy(&out.stdout),
            current_root,
        )),
    }
}

/// Parse `git worktree list --porcelain` output.
///
/// Stanzas are blank-line separated:
/// ```text
/// worktree /path/to/main
/// HEAD abc123
/// branch refs/heads/main
/// ```
/// Detached worktrees carry `detached` instead of a `branch` line.
pub fn parse_worktree_list(output: &str, current_root: &Path) -> Vec<Worktree> {
    let current_id = worktree_id(current_root);
    let mut worktrees = Vec::new();
    let mut path: Option<PathBuf> = None;
    let mut branch: Option<String> = None;

    let mut finish = |path: &mut Option<PathBuf>, branch: &mut Option<String>,
                      worktrees: &mut Vec<Worktree>| {
        if let Some(p) = path.take() {
            let id = worktree_id(&p);
            let name = p
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| p.to_string_lossy().to_string());
            worktrees.push(Worktree {
                is_current: id == current_id,
                id,
                path: p,
                name,
                branch: branch.take(),
            });
        }
    };

    for line in output.lines() {
        if line.is_empty() {
            finish(&mut path, &mut branch, &mut worktrees);
        } else if let Some(p) = line.strip_prefix("worktree ") {
            finish(&mut path, &mut branch, &mut worktrees);
            path = Some(PathBuf::from(p));
        } else if let Some(b) = line.strip_prefix("branch ") {
            branch = Some(b.strip_prefix("refs/heads/").unwrap_or(b).to_string());
        }
        // HEAD, detached, bare and lock lines are not needed here.
    }
    finish(&mut path, &mut branch, &mut worktrees);

    worktrees
}
