use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    Frame,
};

use crate::app::App;
use crate::explorer::NotifyLevel;
use crate::fs::tree::NodeType;
use crate::git::status::GitStatus;

/// Render the tree viewport and the status bar.
pub fn render(app: &mut App, frame: &mut Frame) {
    let [tree_area, status_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());

    app.viewport_height = tree_area.height as usize;
    render_tree(app, frame, tree_area);
    render_status_bar(app, frame, status_area);
}

fn render_tree(app: &App, frame: &mut Frame, area: Rect) {
    let window = app.explorer.window(area.height as usize);
    let selected = app.explorer.selected_path();

    for (i, row) in window.nodes.iter().enumerate() {
        let y = area.y + i as u16;
        let indent = "  ".repeat(row.depth);
        let expander = match row.node_type {
            NodeType::Directory if app.explorer.expanded_folders().contains(&row.path) => "▾ ",
            NodeType::Directory => "▸ ",
            NodeType::File => "  ",
        };
        let status = app.explorer.status_of(&row.path);
        let marker = status.map(|s| s.marker()).unwrap_or(' ');

        let is_selected = selected == Some(row.path.as_path());
        let name_style = if is_selected {
            Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
        } else if row.node_type == NodeType::Directory {
            Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD)
        } else if row.name.starts_with('.') {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        let line = Line::from(vec![
            Span::styled(format!("{marker} "), status_style(status)),
            Span::raw(indent),
            Span::raw(expander),
            Span::styled(row.name.clone(), name_style),
        ]);
        frame
            .buffer_mut()
            .set_line(area.x, y, &line, area.width);
    }
}

fn status_style(status: Option<GitStatus>) -> Style {
    match status {
        Some(GitStatus::Modified) => Style::default().fg(Color::Yellow),
        Some(GitStatus::Added) => Style::default().fg(Color::Green),
        Some(GitStatus::Deleted) => Style::default().fg(Color::Red),
        Some(GitStatus::Untracked) => Style::default().fg(Color::Cyan),
        Some(GitStatus::Ignored) => Style::default().fg(Color::DarkGray),
        None => Style::default(),
    }
}

fn render_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let explorer = &app.explorer;
    let window = explorer.window(app.viewport_height);

    let mut spans: Vec<Span> = Vec::new();

    if let Some((notification, _)) = &app.status_message {
        let color = match notification.level {
            NotifyLevel::Info => Color::Cyan,
            NotifyLevel::Success => Color::Green,
            NotifyLevel::Warning => Color::Yellow,
            NotifyLevel::Error => Color::Red,
        };
        spans.push(Span::styled(
            format!(" {} ", notification.message),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    } else {
        let root_name = explorer
            .root()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| explorer.root().to_string_lossy().to_string());
        spans.push(Span::styled(
            format!(" {root_name} "),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(format!(
            "{} items · sort {} · ",
            window.total_nodes,
            explorer.config().sort_by.label()
        )));
        if explorer.git_only_mode() {
            spans.push(Span::styled("git-only · ", Style::default().fg(Color::Yellow)));
        }
        if !explorer.git_available() {
            spans.push(Span::styled(
                "git off · ",
                Style::default().fg(Color::DarkGray),
            ));
        }
        if !app.watcher_active() {
            spans.push(Span::styled(
                "watch off · ",
                Style::default().fg(Color::DarkGray),
            ));
        }
        spans.push(Span::raw(format!(
            "↑{} ↓{}",
            window.scrolled_past, window.remaining
        )));
        if explorer.loading() {
            spans.push(Span::styled(
                " · loading…",
                Style::default().fg(Color::Cyan),
            ));
        }
    }

    let line = Line::from(spans);
    frame
        .buffer_mut()
        .set_line(area.x, area.y, &line, area.width);
}
