use crate::api::types::{SortBy, TicketFilters, TicketStatus};
use crate::api::ApiQuery;
use crate::app::AppContext;
use crate::routes::Route;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

const STATUS_OPTIONS: [Option<TicketStatus>; 4] = [
  None,
  Some(TicketStatus::Open),
  Some(TicketStatus::InProgress),
  Some(TicketStatus::Closed),
];

/// Filter settings page. The selection is local to the page; a preview of
/// how many tickets match comes from the shared list cache.
pub struct TicketFiltersView {
  /// Currently applied status
  status: Option<TicketStatus>,
  list_state: ListState,
  preview: ApiQuery,
}

impl TicketFiltersView {
  pub fn new(ctx: &mut AppContext) -> Self {
    let mut list_state = ListState::default();
    list_state.select(Some(0));
    let mut view = Self {
      status: None,
      list_state,
      preview: ApiQuery::list(&TicketFilters::new()),
    };
    view.refresh_preview(ctx);
    view
  }

  /// The filters this page currently describes
  pub fn filters(&self) -> TicketFilters {
    let filters = TicketFilters::new().with_sort(SortBy::Date);
    match self.status {
      Some(status) => filters.with_status(status),
      None => filters,
    }
  }

  fn apply_highlighted(&mut self, ctx: &mut AppContext) {
    let Some(status) = self.list_state.selected().and_then(|i| STATUS_OPTIONS.get(i)) else {
      return;
    };
    self.status = *status;
    self.refresh_preview(ctx);
  }

  fn refresh_preview(&mut self, ctx: &mut AppContext) {
    self.preview = ApiQuery::list(&self.filters());
    ctx.client.query(&self.preview);
  }

  fn preview_line(&self, ctx: &AppContext) -> Line<'static> {
    let text = match ctx.client.entry(&self.preview) {
      Some(entry) if entry.is_error() => "Matching tickets: unavailable".to_string(),
      Some(entry) => match entry.data().and_then(|d| d.as_tickets()) {
        Some(tickets) => format!("Matching tickets: {}", tickets.len()),
        None => "Matching tickets: ...".to_string(),
      },
      None => "Matching tickets: ...".to_string(),
    };
    Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)))
  }
}

impl View for TicketFiltersView {
  fn handle_key(&mut self, key: KeyEvent, ctx: &mut AppContext) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        let next = self.list_state.selected().map_or(0, |i| (i + 1).min(STATUS_OPTIONS.len() - 1));
        self.list_state.select(Some(next));
      }
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Enter | KeyCode::Char(' ') => self.apply_highlighted(ctx),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &AppContext) {
    let block = Block::default()
      .title(" Ticket filters ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1),                          // Heading
        Constraint::Length(STATUS_OPTIONS.len() as u16), // Options
        Constraint::Length(1),                          // Spacer
        Constraint::Length(1),                          // Sort
        Constraint::Length(1),                          // Preview
        Constraint::Min(0),
      ])
      .split(inner);

    frame.render_widget(
      Paragraph::new(Span::styled("Status", Style::default().bold())),
      chunks[0],
    );

    let items: Vec<ListItem> = STATUS_OPTIONS
      .iter()
      .map(|option| {
        let mark = if *option == self.status { "(x)" } else { "( )" };
        let label = option.map(|s| s.label()).unwrap_or("All");
        ListItem::new(format!("{} {}", mark, label))
      })
      .collect();
    let list = List::new(items)
      .highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[1], &mut self.list_state);

    frame.render_widget(
      Paragraph::new(Line::from(vec![
        Span::styled("Sort by: ", Style::default().fg(Color::DarkGray)),
        Span::raw(SortBy::Date.as_str()),
      ])),
      chunks[3],
    );
    frame.render_widget(Paragraph::new(self.preview_line(ctx)), chunks[4]);
  }

  fn breadcrumb_label(&self) -> String {
    "Filters".to_string()
  }

  fn route(&self) -> Route {
    Route::TicketFilters
  }

  fn tick(&mut self, ctx: &mut AppContext) {
    ctx.client.ensure(&self.preview);
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("enter", "select").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
