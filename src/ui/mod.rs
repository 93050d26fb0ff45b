pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::ListState;
use renderfns::{draw_footer, draw_header, HeaderInfo};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let route = app.route_path();
  let source = app.context().client.source();
  let header = HeaderInfo {
    title: &app.context().title,
    source: &source,
    route: &route,
    busy: app.is_busy(),
  };
  draw_header(frame, chunks[0], &header, &app.shortcuts());

  app.render_view(frame, chunks[1]);
  app.command_input().render_overlay(frame, chunks[1]);

  draw_footer(frame, chunks[2], &app.view_breadcrumb(), app.status_message());
}

/// Keep a list selection inside `0..len`; select the first row when there is
/// data and nothing selected, clear the selection when the list is empty
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    Some(i) if i >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    _ => {}
  }
}
