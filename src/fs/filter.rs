use std::path::Path;

use globset::{Glob, GlobBuilder, GlobMatcher};
use tracing::warn;

/// Names excluded from every scan regardless of other settings:
/// VCS internals, dependency/build output, OS metadata files.
pub const NOISE_NAMES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    "__pycache__",
    ".DS_Store",
    "Thumbs.db",
];

/// One compiled ignore pattern.
///
/// Patterns support `*` (any run within a segment) and `?` (one char),
/// matched case-sensitively against the entry name and the root-relative
/// path with separators normalized to `/`. A trailing `/` anchors the
/// pattern to directories; because exclusion happens before recursion,
/// matching the directory itself covers its descendants.
struct CompiledPattern {
    matcher: GlobMatcher,
    dir_only: bool,
}

/// A set of ignore patterns compiled once per build.
///
/// Malformed patterns degrade to "unfiltered": they are logged and
/// skipped rather than failing the build.
pub struct PatternSet {
    patterns: Vec<CompiledPattern>,
}

impl PatternSet {
    pub fn compile(raw: &[String]) -> Self {
        let mut patterns = Vec::new();
        for source in raw {
            let trimmed = source.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            // Negation patterns are not supported; treat them as absent.
            if trimmed.starts_with('!') {
                continue;
            }
            let dir_only = trimmed.ends_with('/');
            let body = trimmed.trim_end_matches('/').trim_start_matches('/');
            if body.is_empty() {
                continue;
            }
            match compile_glob(body) {
                Ok(matcher) => patterns.push(CompiledPattern { matcher, dir_only }),
                Err(e) => warn!(pattern = %source, error = %e, "skipping malformed ignore pattern"),
            }
        }
        Self { patterns }
    }

    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Does any pattern match this entry, by filename or by
    /// root-relative path?
    pub fn matches(&self, name: &str, rel_path: &str, is_dir: bool) -> bool {
        self.patterns.iter().any(|p| {
            if p.dir_only && !is_dir {
                return false;
            }
            p.matcher.is_match(name) || p.matcher.is_match(rel_path)
        })
    }
}

fn compile_glob(body: &str) -> Result<GlobMatcher, globset::Error> {
    // literal_separator keeps `*`/`?` within one path segment.
    GlobBuilder::new(body)
        .literal_separator(true)
        .case_insensitive(false)
        .build()
        .map(|g: Glob| g.compile_matcher())
}

/// Load ignore patterns from `<root>/.gitignore`, once per build.
/// A missing or unreadable file yields an empty set.
pub fn load_gitignore(root: &Path) -> PatternSet {
    match std::fs::read_to_string(root.join(".gitignore")) {
        Ok(content) => {
            let lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();
            PatternSet::compile(&lines)
        }
        Err(_) => PatternSet::empty(),
    }
}

/// Hard-coded noise-name check. Applies before every other rule,
/// including `show_hidden`.
pub fn is_noise_name(name: &str) -> bool {
    NOISE_NAMES.contains(&name)
}
