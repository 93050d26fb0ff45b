use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

const PLACEHOLDER: &str = "Search tickets...";

/// Events emitted by search input that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
  /// Text changed (each keystroke; empty string on cancel)
  Changed(String),
  /// Enter pressed; focus leaves the box, the text stays
  Submitted,
}

/// Search box that stays visible and takes focus on `/`
#[derive(Debug, Clone, Default)]
pub struct SearchInput {
  input: TextInput,
  active: bool,
}

impl SearchInput {
  pub fn new() -> Self {
    Self::default()
  }

  /// Whether the box currently has focus
  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Take focus, keeping the current text for editing
  pub fn activate(&mut self) {
    self.active = true;
  }

  /// Handle a key event.
  /// Call this regardless of active state - it handles activation too
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<SearchEvent> {
    if !self.active {
      if key.code == KeyCode::Char('/') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(_) => {
        self.active = false;
        KeyResult::Event(SearchEvent::Submitted)
      }
      InputResult::Cancelled => {
        self.active = false;
        if self.input.is_empty() {
          return KeyResult::Handled;
        }
        self.input.clear();
        KeyResult::Event(SearchEvent::Changed(String::new()))
      }
      InputResult::Consumed => {
        KeyResult::Event(SearchEvent::Changed(self.input.value().to_string()))
      }
      InputResult::NotHandled => KeyResult::NotHandled,
    }
  }

  /// Render the search box. `pending` marks typed text that hasn't been applied yet.
  pub fn render(&self, frame: &mut Frame, area: Rect, pending: bool) {
    let border = if self.active {
      Color::Yellow
    } else {
      Color::DarkGray
    };
    let mut block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border))
      .title(" Search ");
    if pending {
      block = block.title_bottom(Line::from(" ... ").right_aligned());
    }

    let line = if self.input.is_empty() && !self.active {
      Line::from(Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray)))
    } else {
      Line::from(vec![
        Span::styled("/", Style::default().fg(Color::Yellow)),
        Span::raw(self.input.value()),
      ])
    };

    let inner = block.inner(area);
    frame.render_widget(Paragraph::new(line).block(block), area);
    if self.active && inner.width > 0 && inner.height > 0 {
      let x = inner.x + (1 + self.input.cursor_column()).min(inner.width - 1);
      frame.set_cursor_position(Position::new(x, inner.y));
    }
  }
}
