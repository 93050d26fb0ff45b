use crate::api::types::UserProfile;
use crate::api::ApiQuery;
use crate::app::AppContext;
use crate::routes::Route;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use tracing::info;

/// Name shown while no profile is available
pub fn display_name(profile: Option<&UserProfile>) -> String {
  profile
    .map(|p| p.full_name())
    .filter(|name| !name.trim().is_empty())
    .unwrap_or_else(|| "Guest".to_string())
}

/// Profile page with a small local counter
pub struct UserProfileView {
  query: ApiQuery,
  counter: u32,
}

impl UserProfileView {
  pub fn new(ctx: &mut AppContext) -> Self {
    let query = ApiQuery::profile();
    ctx.client.query(&query);
    Self { query, counter: 0 }
  }

  fn profile<'a>(&self, ctx: &'a AppContext) -> Option<&'a UserProfile> {
    ctx.client.profile(&self.query)
  }

  fn lines(&self, ctx: &AppContext) -> Vec<Line<'static>> {
    let label = |s: &'static str| Span::styled(s, Style::default().fg(Color::DarkGray));
    let entry = ctx.client.entry(&self.query);
    let profile = self.profile(ctx);

    if let Some(e) = entry.filter(|e| e.is_error()).and_then(|e| e.error()) {
      return vec![
        Line::from(Span::styled(format!("Error: {}", e), Style::default().fg(Color::Red))),
        Line::default(),
        Line::from(label("Press 'r' to retry.")),
      ];
    }

    let mut lines = Vec::new();
    if profile.is_none() {
      lines.push(Line::from(Span::styled(
        "Loading profile...",
        Style::default().fg(Color::DarkGray),
      )));
      lines.push(Line::default());
    }

    let name = profile
      .map(|p| p.full_name())
      .unwrap_or_else(|| "Loading...".to_string());
    let initials = profile.map(|p| p.initials()).unwrap_or_else(|| "??".to_string());
    let email = profile
      .and_then(|p| p.email.clone())
      .unwrap_or_else(|| "-".to_string());

    lines.extend([
      Line::from(vec![label("Name:         "), Span::raw(name)]),
      Line::from(vec![label("Display name: "), Span::raw(display_name(profile))]),
      Line::from(vec![
        label("Initials:     "),
        Span::styled(initials, Style::default().fg(Color::Cyan).bold()),
      ]),
      Line::from(vec![label("Email:        "), Span::raw(email)]),
      Line::default(),
      Line::from(vec![label("Counter:      "), Span::raw(self.counter.to_string())]),
    ]);
    lines
  }
}

impl View for UserProfileView {
  fn handle_key(&mut self, key: KeyEvent, ctx: &mut AppContext) -> ViewAction {
    match key.code {
      KeyCode::Char('+') => self.counter = self.counter.saturating_add(1),
      KeyCode::Char('l') => {
        let name = display_name(self.profile(ctx));
        info!(display_name = %name, "user profile");
        ctx.info(format!("Display name: {}", name));
      }
      KeyCode::Char('r') => {
        ctx.client.refetch(&self.query);
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &AppContext) {
    let block = Block::default()
      .title(" User profile ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    frame.render_widget(Paragraph::new(self.lines(ctx)).block(block), area);
  }

  fn breadcrumb_label(&self) -> String {
    "Profile".to_string()
  }

  fn route(&self) -> Route {
    Route::UserProfile
  }

  fn tick(&mut self, ctx: &mut AppContext) {
    ctx.client.ensure(&self.query);
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("+", "count").with_priority(20),
      ShortcutInfo::new("l", "log name").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(60),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
