use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// What the header shows besides the shortcuts
pub struct HeaderInfo<'a> {
  pub title: &'a str,
  /// Where data comes from ("mock" or the API host)
  pub source: &'a str,
  pub route: &'a str,
  /// Loads and mutations currently running
  pub busy: bool,
}

/// Draw the header bar with title, context, and shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, info: &HeaderInfo, shortcuts: &[ShortcutInfo]) {
  let separator = Span::styled("│", Style::default().fg(Color::DarkGray));
  let mut spans = vec![
    Span::styled(format!(" {} ", info.title), Style::default().fg(Color::Cyan).bold()),
    separator.clone(),
    Span::styled(format!(" {} ", info.source), Style::default().fg(Color::White)),
    separator,
    Span::styled(format!(" {} ", info.route), Style::default().fg(Color::Yellow).bold()),
  ];
  if info.busy {
    spans.push(Span::styled("⟳ ", Style::default().fg(Color::DarkGray)));
  }
  spans.push(Span::raw(" "));
  spans.extend(shortcut_spans(shortcuts));

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Shortcuts ordered by priority; keys highlighted, labels dimmed
fn shortcut_spans(shortcuts: &[ShortcutInfo]) -> Vec<Span<'static>> {
  let mut sorted: Vec<&ShortcutInfo> = shortcuts.iter().collect();
  sorted.sort_by_key(|s| s.priority);

  let mut spans = Vec::new();
  for (i, shortcut) in sorted.into_iter().enumerate() {
    if i > 0 {
      spans.push(Span::raw("   "));
    }
    spans.push(Span::styled(format!("<{}>", shortcut.key), Style::default().fg(Color::Cyan)));
    spans.push(Span::styled(format!(" {}", shortcut.label), Style::default().fg(Color::DarkGray)));
  }
  spans
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_shortcuts_sorted_by_priority() {
    let shortcuts = vec![
      ShortcutInfo::new("q", "back").with_priority(90),
      ShortcutInfo::new(":", "command").with_priority(10),
    ];
    let text: String = shortcut_spans(&shortcuts)
      .iter()
      .map(|s| s.content.as_ref())
      .collect();
    assert_eq!(text, "<:> command   <q> back");
  }

  #[test]
  fn test_no_shortcuts() {
    assert!(shortcut_spans(&[]).is_empty());
  }
}
