use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;
use crate::fs::tree::NodeType;

/// Map a key press onto engine intents.
pub async fn handle_key(app: &mut App, key: KeyEvent) {
    let height = app.viewport_height;
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            if app.status_message.is_some() {
                app.dismiss_status();
            } else {
                app.quit();
            }
        }

        KeyCode::Char('j') | KeyCode::Down => app.explorer.select_next(height),
        KeyCode::Char('k') | KeyCode::Up => app.explorer.select_previous(height),
        KeyCode::Char('g') | KeyCode::Home => app.explorer.select_first(height),
        KeyCode::Char('G') | KeyCode::End => app.explorer.select_last(height),

        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.explorer.scroll_by((height / 2) as isize, height);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.explorer.scroll_by(-((height / 2) as isize), height);
        }

        KeyCode::Char('l') | KeyCode::Right => expand_selected(app),
        KeyCode::Char('h') | KeyCode::Left => collapse_or_jump_to_parent(app),
        KeyCode::Enter | KeyCode::Char(' ') => toggle_selected(app),

        KeyCode::Char('.') => {
            let shown = app.explorer.config().show_hidden;
            app.explorer.config_mut().show_hidden = !shown;
            app.explorer.refresh(false).await;
        }
        KeyCode::Char('s') => {
            let next = app.explorer.config().sort_by.next();
            app.explorer.config_mut().sort_by = next;
            app.explorer.refresh(false).await;
        }
        KeyCode::Char('S') => {
            let toggled = app.explorer.config().sort_direction.toggled();
            app.explorer.config_mut().sort_direction = toggled;
            app.explorer.refresh(false).await;
        }

        KeyCode::Char('o') => app.explorer.toggle_git_only(),
        KeyCode::Char('r') => app.explorer.refresh(true).await,
        KeyCode::Char('R') => app.explorer.refresh_git_status().await,
        KeyCode::Char('w') => app.cycle_worktree(),
        KeyCode::Char('x') => app.explorer.clear_selection(),

        _ => {}
    }
}

fn selected_node_type(app: &App) -> Option<NodeType> {
    let selected = app.explorer.selected_path()?;
    app.explorer
        .rows()
        .iter()
        .find(|row| row.path == selected)
        .map(|row| row.node_type)
}

fn expand_selected(app: &mut App) {
    if selected_node_type(app) == Some(NodeType::Directory) {
        if let Some(path) = app.explorer.selected_path().map(|p| p.to_path_buf()) {
            app.explorer.expand(&path);
        }
    }
}

fn toggle_selected(app: &mut App) {
    if selected_node_type(app) == Some(NodeType::Directory) {
        if let Some(path) = app.explorer.selected_path().map(|p| p.to_path_buf()) {
            app.explorer.toggle_expand(&path);
        }
    }
}

/// Collapse an expanded directory; on a file or collapsed directory,
/// move the selection to the parent.
fn collapse_or_jump_to_parent(app: &mut App) {
    let Some(selected) = app.explorer.selected_path().map(|p| p.to_path_buf()) else {
        return;
    };
    let is_expanded_dir = selected_node_type(app) == Some(NodeType::Directory)
        && app.explorer.expanded_folders().contains(&selected);
    if is_expanded_dir {
        app.explorer.collapse(&selected);
    } else if let Some(parent) = selected.parent() {
        app.explorer.select(Some(parent.to_path_buf()));
    }
}
