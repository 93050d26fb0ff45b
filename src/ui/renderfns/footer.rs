use crate::app::StatusMessage;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer bar: view breadcrumb on the left, last status message on the right
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], status: Option<&StatusMessage>) {
  let message = status.map(|status| match status {
    StatusMessage::Info(text) => Span::styled(format!("{} ", text), Style::default().fg(Color::Green)),
    StatusMessage::Error(text) => Span::styled(format!("{} ", text), Style::default().fg(Color::Red)),
  });
  let message_width = message.as_ref().map(|m| m.width() as u16).unwrap_or(0);

  let chunks = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Min(0), Constraint::Length(message_width)])
    .split(area);

  let mut spans = vec![Span::raw(" ")];
  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i == breadcrumb.len() - 1 {
      // Current view
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };
    spans.push(Span::styled(part.clone(), style));
  }

  let background = Style::default().bg(Color::Black);
  frame.render_widget(Paragraph::new(Line::from(spans)).style(background), chunks[0]);

  if let Some(message) = message {
    frame.render_widget(Paragraph::new(Line::from(message)).style(background), chunks[1]);
  }
}
