use crate::api::types::TicketStatus;
use chrono::{DateTime, Utc};
use ratatui::prelude::Color;

/// Truncate a string to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Get the display color for a ticket status
pub fn status_color(status: TicketStatus) -> Color {
  match status {
    TicketStatus::Closed => Color::Green,
    TicketStatus::InProgress => Color::Yellow,
    TicketStatus::Open => Color::White,
  }
}

pub fn format_date(date: &DateTime<Utc>) -> String {
  date.format("%Y-%m-%d").to_string()
}
