use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::fs::tree::{NodeType, TreeNode};

/// One entry of the pre-order, expansion-filtered projection of the
/// forest. Recomputed on every rebuild or expansion change, never
/// persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    pub path: PathBuf,
    pub name: String,
    pub node_type: NodeType,
    pub depth: usize,
    pub index: usize,
}

/// The slice of flat rows visible in the terminal viewport.
#[derive(Debug)]
pub struct ViewportWindow<'a> {
    pub start_index: usize,
    pub end_index: usize,
    pub nodes: &'a [FlatRow],
    pub total_nodes: usize,
    pub scrolled_past: usize,
    pub remaining: usize,
}

/// Pre-order flatten: a directory's children are included iff its path
/// is in `expanded`. Rows get sequential indices.
pub fn flatten(forest: &[TreeNode], expanded: &HashSet<PathBuf>) -> Vec<FlatRow> {
    let mut rows = Vec::new();
    for node in forest {
        flatten_node(node, expanded, &mut rows);
    }
    rows
}

fn flatten_node(node: &TreeNode, expanded: &HashSet<PathBuf>, rows: &mut Vec<FlatRow>) {
    rows.push(FlatRow {
        path: node.path.clone(),
        name: node.name.clone(),
        node_type: node.node_type,
        depth: node.depth,
        index: rows.len(),
    });
    if node.node_type == NodeType::Directory && expanded.contains(&node.path) {
        for child in &node.children {
            flatten_node(child, expanded, rows);
        }
    }
}

/// Compute the viewport window for a scroll offset and height.
///
/// Overscroll is elastic: an offset at or beyond the row count is
/// accepted verbatim (empty slice) rather than auto-clamped. Clamping
/// happens only on the next explicit scroll input via `clamp_scroll`,
/// so a structural shrink never snaps the view.
pub fn window(rows: &[FlatRow], scroll_offset: usize, viewport_height: usize) -> ViewportWindow<'_> {
    let total = rows.len();
    let end_index = (scroll_offset + viewport_height).min(total);
    let nodes = if scroll_offset >= total {
        &rows[0..0]
    } else {
        &rows[scroll_offset..end_index]
    };
    ViewportWindow {
        start_index: scroll_offset,
        end_index,
        nodes,
        total_nodes: total,
        scrolled_past: scroll_offset.min(total),
        remaining: total.saturating_sub(end_index),
    }
}

/// Clamp an offset into the valid scroll range. Applied by explicit
/// scroll commands only.
pub fn clamp_scroll(offset: usize, total: usize, viewport_height: usize) -> usize {
    offset.min(total.saturating_sub(viewport_height))
}

/// Capture the path pinned at viewport top before a rebuild.
pub fn capture_anchor(rows: &[FlatRow], scroll_offset: usize) -> Option<PathBuf> {
    rows.get(scroll_offset).map(|row| row.path.clone())
}

/// Restore the scroll offset after a rebuild: pin the anchor path at
/// the viewport top if it survived, otherwise fall back to the row now
/// occupying the same numeric index, clamped to the new length.
pub fn restore_anchor(new_rows: &[FlatRow], anchor: Option<&Path>, old_offset: usize) -> usize {
    if let Some(anchor) = anchor {
        if let Some(row) = new_rows.iter().find(|row| row.path == anchor) {
            return row.index;
        }
    }
    if new_rows.is_empty() {
        0
    } else {
        old_offset.min(new_rows.len() - 1)
    }
}

/// Reassign the selection after a rebuild.
///
/// A surviving selection is kept. A vanished one walks ancestors upward
/// and takes the first still present, else the first root node, else
/// `None` on an empty forest. No prior selection never auto-selects.
pub fn repair_selection(prev: Option<&Path>, forest: &[TreeNode]) -> Option<PathBuf> {
    let prev = prev?;
    let mut paths = HashSet::new();
    collect_paths(forest, &mut paths);

    if paths.contains(prev) {
        return Some(prev.to_path_buf());
    }
    for ancestor in prev.ancestors().skip(1) {
        if paths.contains(ancestor) {
            return Some(ancestor.to_path_buf());
        }
    }
    forest.first().map(|node| node.path.clone())
}

fn collect_paths(forest: &[TreeNode], out: &mut HashSet<PathBuf>) {
    for node in forest {
        out.insert(node.path.clone());
        collect_paths(&node.children, out);
    }
}
