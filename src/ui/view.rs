use crate::app::AppContext;
use crate::routes::Route;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
}

/// Trait for view behavior
///
/// Views handle their own input modes (search, selection) and return
/// actions for the App to execute: App → View → Components.
///
/// Views never own fetched data. They hold the queries they are interested
/// in and read the matching cache entries from the context on every render,
/// so anything derived from server data is computed on read.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent, ctx: &mut AppContext) -> ViewAction;

  fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &AppContext);

  fn breadcrumb_label(&self) -> String;

  /// Route that leads back to this view
  fn route(&self) -> Route;

  /// Called after every event once completions are applied. Views re-issue
  /// invalidated queries and commit debounced input here.
  fn tick(&mut self, _ctx: &mut AppContext) {}

  /// True while a text field has focus; the app then stops intercepting `:`
  fn is_capturing_input(&self) -> bool {
    false
  }

  /// Keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
