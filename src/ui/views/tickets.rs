use crate::api::types::{Ticket, TicketFilters, TicketStatus};
use crate::api::ApiQuery;
use crate::app::AppContext;
use crate::debounce::Debouncer;
use crate::error::Error;
use crate::routes::Route;
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_date, status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use std::time::Instant;
use tracing::debug;

/// What the detail pane shows. Built from the entry for the currently
/// selected id only, so a late result for an earlier selection never shows.
#[derive(Debug, PartialEq)]
pub enum DetailPane<'a> {
  NoSelection,
  Loading,
  Error(&'a Error),
  Ticket(&'a Ticket),
}

/// `all → open → in-progress → closed → all`
fn next_status(current: Option<TicketStatus>) -> Option<TicketStatus> {
  match current {
    None => Some(TicketStatus::Open),
    Some(TicketStatus::Open) => Some(TicketStatus::InProgress),
    Some(TicketStatus::InProgress) => Some(TicketStatus::Closed),
    Some(TicketStatus::Closed) => None,
  }
}

/// Ticket browser: list on the left, detail of the selected ticket on the right
pub struct TicketsView {
  filters: TicketFilters,
  list_query: ApiQuery,
  selected_id: Option<String>,
  detail_query: Option<ApiQuery>,
  list_state: ListState,
  search: SearchInput,
  debouncer: Debouncer<String>,
}

impl TicketsView {
  pub fn new(ticket_id: Option<String>, ctx: &mut AppContext) -> Self {
    let filters = TicketFilters::new();
    let list_query = ApiQuery::list(&filters);
    ctx.client.query(&list_query);

    let mut view = Self {
      filters,
      list_query,
      selected_id: None,
      detail_query: None,
      list_state: ListState::default(),
      search: SearchInput::new(),
      debouncer: Debouncer::new(ctx.debounce),
    };
    if let Some(id) = ticket_id {
      view.select_ticket(&id, ctx);
    }
    view
  }

  fn tickets<'a>(&self, ctx: &'a AppContext) -> &'a [Ticket] {
    ctx.client.tickets(&self.list_query).unwrap_or(&[])
  }

  fn highlighted<'a>(&self, ctx: &'a AppContext) -> Option<&'a Ticket> {
    self
      .list_state
      .selected()
      .and_then(|i| self.tickets(ctx).get(i))
  }

  /// Switch the list to `filters`. Equivalent filters keep the current query.
  fn set_filters(&mut self, filters: TicketFilters, ctx: &mut AppContext) {
    let query = ApiQuery::list(&filters);
    self.filters = filters;
    if query != self.list_query {
      debug!(key = %query.key(), "ticket list filters changed");
      self.list_query = query;
      self.list_state.select(None);
      ctx.client.query(&self.list_query);
    }
  }

  fn apply_search(&mut self, search: String, ctx: &mut AppContext) {
    let filters = self.filters.clone().with_search(search);
    self.set_filters(filters, ctx);
  }

  /// Point the detail pane at `id` and request it
  pub fn select_ticket(&mut self, id: &str, ctx: &mut AppContext) {
    match ApiQuery::detail(id) {
      Ok(query) => {
        ctx.client.query(&query);
        self.selected_id = Some(id.to_string());
        self.detail_query = Some(query);
      }
      Err(e) => ctx.error(e.to_string()),
    }
  }

  pub fn detail_pane<'a>(&self, ctx: &'a AppContext) -> DetailPane<'a> {
    let Some(query) = &self.detail_query else {
      return DetailPane::NoSelection;
    };
    let Some(entry) = ctx.client.entry(query) else {
      return DetailPane::Loading;
    };
    if entry.is_error() {
      if let Some(e) = entry.error() {
        return DetailPane::Error(e);
      }
    }
    match ctx.client.ticket(query) {
      Some(ticket) => DetailPane::Ticket(ticket),
      None => DetailPane::Loading,
    }
  }

  /// Error of the current list query, if its last load failed
  pub fn list_error<'a>(&self, ctx: &'a AppContext) -> Option<&'a Error> {
    ctx
      .client
      .entry(&self.list_query)
      .filter(|entry| entry.is_error())
      .and_then(|entry| entry.error())
  }

  /// Commit debounced search text that has been quiet long enough, then
  /// re-issue anything a mutation invalidated
  pub fn tick_at(&mut self, now: Instant, ctx: &mut AppContext) {
    if let Some(search) = self.debouncer.poll_at(now) {
      self.apply_search(search, ctx);
    }
    ctx.client.ensure(&self.list_query);
    if let Some(query) = &self.detail_query {
      ctx.client.ensure(query);
    }
  }

  fn refresh(&mut self, ctx: &mut AppContext) {
    ctx.client.refetch(&self.list_query);
    if let Some(query) = &self.detail_query {
      ctx.client.refetch(query);
    }
  }

  fn mark_highlighted_read(&mut self, ctx: &mut AppContext) {
    let Some(id) = self.highlighted(ctx).map(|t| t.id.clone()) else {
      return;
    };
    match ctx.client.mark_read(&id) {
      Ok(()) => ctx.info(format!("Marked ticket {} read", id)),
      Err(e) => ctx.error(e.to_string()),
    }
  }

  fn filter_summary(&self) -> Line<'static> {
    let status = self.filters.status.map(|s| s.label()).unwrap_or("All");
    let sort = self.filters.sort_by.unwrap_or_default().as_str();
    Line::from(vec![
      Span::styled(" Status: ", Style::default().fg(Color::DarkGray)),
      Span::styled(status, Style::default().fg(Color::Yellow)),
      Span::styled("   Sort by: ", Style::default().fg(Color::DarkGray)),
      Span::styled(sort, Style::default().fg(Color::Yellow)),
    ])
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect, ctx: &AppContext) {
    let entry = ctx.client.entry(&self.list_query);
    let tickets = self.tickets(ctx);
    ensure_valid_selection(&mut self.list_state, tickets.len());

    let title = match entry {
      Some(e) if e.is_initial_load() => " Tickets (loading...) ".to_string(),
      Some(e) if e.is_fetching() => format!(" Tickets ({}) (refreshing...) ", tickets.len()),
      _ => format!(" Tickets ({}) ", tickets.len()),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if let Some(e) = self.list_error(ctx) {
      let paragraph = Paragraph::new(format!("Failed to load tickets: {}\n\nPress 'r' to retry.", e))
        .block(block)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, area);
      return;
    }

    if tickets.is_empty() {
      let content = if entry.is_some_and(|e| e.is_initial_load()) {
        "Loading tickets..."
      } else {
        "No tickets found."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let selected = self.selected_id.as_deref();
    let items: Vec<ListItem> = tickets
      .iter()
      .map(|ticket| {
        let marker = if ticket.read { " " } else { "●" };
        let mut title_style = Style::default();
        if Some(ticket.id.as_str()) == selected {
          title_style = title_style.fg(Color::Cyan);
        }
        ListItem::new(Line::from(vec![
          Span::styled(marker, Style::default().fg(Color::Magenta)),
          Span::raw(" "),
          Span::styled(format!("{:<4}", ticket.id), Style::default().fg(Color::Cyan)),
          Span::styled(
            format!("{:<12}", ticket.status.label()),
            Style::default().fg(status_color(ticket.status)),
          ),
          Span::styled(truncate(&ticket.title, 40), title_style),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect, ctx: &AppContext) {
    let title = match &self.selected_id {
      Some(id) => format!(" Ticket #{} ", id),
      None => " Details ".to_string(),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let paragraph = match self.detail_pane(ctx) {
      DetailPane::NoSelection => Paragraph::new("Select a ticket to view details")
        .style(Style::default().fg(Color::DarkGray)),
      DetailPane::Loading => {
        Paragraph::new("Loading ticket...").style(Style::default().fg(Color::DarkGray))
      }
      DetailPane::Error(e) => Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", e))
        .style(Style::default().fg(Color::Red)),
      DetailPane::Ticket(ticket) => Paragraph::new(detail_lines(ticket)),
    };
    frame.render_widget(paragraph.block(block).wrap(Wrap { trim: true }), area);
  }
}

fn detail_lines(ticket: &Ticket) -> Vec<Line<'_>> {
  let label = |s: &'static str| Span::styled(s, Style::default().fg(Color::DarkGray));
  vec![
    Line::from(Span::styled(&ticket.title, Style::default().bold())),
    Line::default(),
    Line::from(vec![
      label("Status:  "),
      Span::styled(ticket.status.label(), Style::default().fg(status_color(ticket.status))),
    ]),
    Line::from(vec![label("Created: "), Span::raw(format_date(&ticket.created_at))]),
    Line::from(vec![
      label("Read:    "),
      Span::raw(if ticket.read { "yes" } else { "no" }),
    ]),
    Line::default(),
    Line::from(ticket.description.as_deref().unwrap_or("No description")),
  ]
}

impl View for TicketsView {
  fn handle_key(&mut self, key: KeyEvent, ctx: &mut AppContext) -> ViewAction {
    match self.search.handle_key(key) {
      KeyResult::Handled => return ViewAction::None,
      KeyResult::Event(SearchEvent::Changed(text)) => {
        if self.search.is_active() {
          self.debouncer.push(text);
        } else {
          // Esc cleared the box; drop any pending text and clear right away
          self.debouncer.cancel();
          self.apply_search(text, ctx);
        }
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) => {
        // Enter applies right away instead of waiting out the window
        if let Some(text) = self.debouncer.flush() {
          self.apply_search(text, ctx);
        }
        return ViewAction::None;
      }
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Enter => {
        if let Some(id) = self.highlighted(ctx).map(|t| t.id.clone()) {
          self.select_ticket(&id, ctx);
        }
      }
      KeyCode::Char('s') => {
        let mut filters = self.filters.clone();
        filters.status = next_status(filters.status);
        self.set_filters(filters, ctx);
      }
      KeyCode::Char('o') => {
        let mut filters = self.filters.clone();
        filters.sort_by = Some(filters.sort_by.unwrap_or_default().toggle());
        self.set_filters(filters, ctx);
      }
      KeyCode::Char('m') => self.mark_highlighted_read(ctx),
      KeyCode::Char('r') => self.refresh(ctx),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &AppContext) {
    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(3), // Search box
        Constraint::Length(1), // Filter summary
        Constraint::Min(1),    // List and detail
      ])
      .split(area);

    self
      .search
      .render(frame, rows[0], self.debouncer.is_pending());
    frame.render_widget(Paragraph::new(self.filter_summary()), rows[1]);

    let panes = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
      .split(rows[2]);
    self.render_list(frame, panes[0], ctx);
    self.render_detail(frame, panes[1], ctx);
  }

  fn breadcrumb_label(&self) -> String {
    match &self.selected_id {
      Some(id) => format!("Tickets #{}", id),
      None => "Tickets".to_string(),
    }
  }

  fn route(&self) -> Route {
    Route::Tickets {
      ticket_id: self.selected_id.clone(),
    }
  }

  fn tick(&mut self, ctx: &mut AppContext) {
    self.tick_at(Instant::now(), ctx);
  }

  fn is_capturing_input(&self) -> bool {
    self.search.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("s", "status").with_priority(30),
      ShortcutInfo::new("o", "sort").with_priority(40),
      ShortcutInfo::new("m", "mark read").with_priority(50),
      ShortcutInfo::new("r", "refresh").with_priority(60),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::testing::{FailingApi, GatedApi};
  use crate::api::{CachedTicketClient, MockApi, TicketApi};
  use crossterm::event::KeyModifiers;
  use ratatui::backend::TestBackend;
  use std::sync::Arc;
  use std::time::Duration;

  fn context(api: Arc<dyn TicketApi>) -> AppContext {
    let client = CachedTicketClient::new(api, Duration::from_secs(60));
    AppContext::new(client, "tix", Duration::from_millis(300))
  }

  fn mock_context() -> AppContext {
    context(Arc::new(MockApi::new().with_latency(Duration::ZERO)))
  }

  /// Let spawned loads finish and apply every completion
  async fn drain(ctx: &mut AppContext) {
    for _ in 0..20 {
      tokio::task::yield_now().await;
      ctx.client.poll();
      tokio::time::sleep(Duration::from_millis(1)).await;
    }
    ctx.client.poll();
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn ids(view: &TicketsView, ctx: &AppContext) -> Vec<String> {
    view.tickets(ctx).iter().map(|t| t.id.clone()).collect()
  }

  fn rendered(view: &mut TicketsView, ctx: &AppContext) -> String {
    let mut terminal = Terminal::new(TestBackend::new(120, 20)).unwrap();
    terminal.draw(|f| view.render(f, f.area(), ctx)).unwrap();
    terminal
      .backend()
      .buffer()
      .content()
      .iter()
      .map(|cell| cell.symbol())
      .collect()
  }

  #[test]
  fn test_status_cycle() {
    let mut status = None;
    let mut seen = Vec::new();
    for _ in 0..4 {
      status = next_status(status);
      seen.push(status);
    }
    assert_eq!(
      seen,
      vec![
        Some(TicketStatus::Open),
        Some(TicketStatus::InProgress),
        Some(TicketStatus::Closed),
        None
      ]
    );
  }

  #[tokio::test]
  async fn test_late_result_for_previous_selection_is_never_shown() {
    let api = Arc::new(GatedApi::new(&["1", "2"]));
    let mut ctx = context(api.clone());
    let mut view = TicketsView::new(None, &mut ctx);
    assert_eq!(view.detail_pane(&ctx), DetailPane::NoSelection);

    view.select_ticket("1", &mut ctx);
    view.select_ticket("2", &mut ctx);
    assert_eq!(view.detail_pane(&ctx), DetailPane::Loading);

    // Ticket 1 arrives after the selection moved on
    api.release("1");
    drain(&mut ctx).await;
    assert_eq!(view.detail_pane(&ctx), DetailPane::Loading);
    assert!(!rendered(&mut view, &ctx).contains("logged out right after signing in"));

    api.release("2");
    drain(&mut ctx).await;
    match view.detail_pane(&ctx) {
      DetailPane::Ticket(ticket) => assert_eq!(ticket.id, "2"),
      other => panic!("expected ticket 2, got {:?}", other),
    }
    assert_eq!(view.route().path(), "/tickets/2");
  }

  #[tokio::test]
  async fn test_route_id_selects_ticket() {
    let mut ctx = mock_context();
    let mut view = TicketsView::new(Some("3".to_string()), &mut ctx);
    drain(&mut ctx).await;
    assert!(matches!(view.detail_pane(&ctx), DetailPane::Ticket(t) if t.title == "Add new feature"));
    assert!(rendered(&mut view, &ctx).contains("Export the ticket list as CSV."));
  }

  #[tokio::test]
  async fn test_search_is_debounced() {
    let mut ctx = mock_context();
    let mut view = TicketsView::new(None, &mut ctx);
    drain(&mut ctx).await;
    assert_eq!(ids(&view, &ctx), vec!["3", "2", "1"]);

    for c in ['/', 'l', 'o', 'g'] {
      view.handle_key(key(KeyCode::Char(c)), &mut ctx);
    }
    assert!(view.is_capturing_input());

    // Still inside the quiet window: the list query is unchanged
    let start = Instant::now();
    view.tick_at(start, &mut ctx);
    assert_eq!(view.list_query, ApiQuery::list(&TicketFilters::new()));

    view.tick_at(start + Duration::from_millis(301), &mut ctx);
    assert_eq!(
      view.list_query,
      ApiQuery::list(&TicketFilters::new().with_search("log"))
    );
    drain(&mut ctx).await;
    assert_eq!(ids(&view, &ctx), vec!["1"]);
  }

  #[tokio::test]
  async fn test_escape_clears_search_immediately() {
    let mut ctx = mock_context();
    let mut view = TicketsView::new(None, &mut ctx);
    for c in ['/', 'd', 'o', 'c'] {
      view.handle_key(key(KeyCode::Char(c)), &mut ctx);
    }
    view.handle_key(key(KeyCode::Enter), &mut ctx);
    assert_eq!(
      view.list_query,
      ApiQuery::list(&TicketFilters::new().with_search("doc"))
    );

    view.handle_key(key(KeyCode::Char('/')), &mut ctx);
    view.handle_key(key(KeyCode::Char('s')), &mut ctx);
    assert!(view.debouncer.is_pending());
    view.handle_key(key(KeyCode::Esc), &mut ctx);
    assert!(!view.debouncer.is_pending());
    assert_eq!(view.list_query, ApiQuery::list(&TicketFilters::new()));
  }

  #[tokio::test]
  async fn test_enter_applies_search_immediately() {
    let mut ctx = mock_context();
    let mut view = TicketsView::new(None, &mut ctx);
    for c in ['/', 'd', 'o', 'c'] {
      view.handle_key(key(KeyCode::Char(c)), &mut ctx);
    }
    view.handle_key(key(KeyCode::Enter), &mut ctx);
    assert!(!view.is_capturing_input());
    drain(&mut ctx).await;
    assert_eq!(ids(&view, &ctx), vec!["2"]);
  }

  #[tokio::test]
  async fn test_status_and_sort_keys() {
    let mut ctx = mock_context();
    let mut view = TicketsView::new(None, &mut ctx);

    view.handle_key(key(KeyCode::Char('s')), &mut ctx);
    drain(&mut ctx).await;
    assert_eq!(ids(&view, &ctx), vec!["2", "1"]);

    view.handle_key(key(KeyCode::Char('o')), &mut ctx);
    drain(&mut ctx).await;
    assert_eq!(ids(&view, &ctx), vec!["1", "2"]);

    // Back to date order shares the key with the unsorted open list
    view.handle_key(key(KeyCode::Char('o')), &mut ctx);
    assert_eq!(
      view.list_query,
      ApiQuery::list(&TicketFilters::new().with_status(TicketStatus::Open))
    );
  }

  #[tokio::test]
  async fn test_mark_read_refreshes_list_and_detail() {
    let mut ctx = mock_context();
    let mut view = TicketsView::new(None, &mut ctx);
    drain(&mut ctx).await;

    // Newest first: 3, 2, 1
    view.list_state.select(Some(1));
    view.handle_key(key(KeyCode::Char('j')), &mut ctx);
    view.handle_key(key(KeyCode::Enter), &mut ctx);
    drain(&mut ctx).await;
    assert!(matches!(view.detail_pane(&ctx), DetailPane::Ticket(t) if !t.read));

    view.handle_key(key(KeyCode::Char('m')), &mut ctx);
    drain(&mut ctx).await;
    view.tick_at(Instant::now(), &mut ctx);
    drain(&mut ctx).await;

    assert!(matches!(view.detail_pane(&ctx), DetailPane::Ticket(t) if t.read));
    assert!(view.tickets(&ctx).iter().all(|t| t.read));
  }

  #[tokio::test]
  async fn test_failed_list_shows_error() {
    let mut ctx = context(Arc::new(FailingApi));
    let mut view = TicketsView::new(Some("1".to_string()), &mut ctx);
    drain(&mut ctx).await;

    assert!(matches!(view.list_error(&ctx), Some(Error::Network(_))));
    assert!(matches!(view.detail_pane(&ctx), DetailPane::Error(_)));
    let screen = rendered(&mut view, &ctx);
    assert!(screen.contains("Failed to load tickets"));

    // Errors are not retried on tick
    view.tick_at(Instant::now(), &mut ctx);
    assert!(!ctx.client.entry(&view.list_query).unwrap().is_fetching());
  }

  #[tokio::test]
  async fn test_empty_selection_placeholder() {
    let mut ctx = mock_context();
    let mut view = TicketsView::new(None, &mut ctx);
    drain(&mut ctx).await;
    assert!(rendered(&mut view, &ctx).contains("Select a ticket to view details"));
  }
}
