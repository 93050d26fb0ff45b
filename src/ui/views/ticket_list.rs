use crate::api::types::{Ticket, TicketFilters, TicketStatus};
use crate::api::ApiQuery;
use crate::app::AppContext;
use crate::routes::Route;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::TicketsView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs};
use tokio::time::Instant;
use tracing::info;

/// Status choices offered by the list page
const STATUS_TABS: [Option<TicketStatus>; 3] =
  [None, Some(TicketStatus::Open), Some(TicketStatus::Closed)];

fn tab_label(status: Option<TicketStatus>) -> &'static str {
  status.map(|s| s.label()).unwrap_or("All")
}

/// Unread tickets in `tickets`; derived on every render, never stored
pub fn unread_count(tickets: &[Ticket]) -> usize {
  tickets.iter().filter(|t| !t.read).count()
}

/// Ticket list with a status filter and a notifications count
pub struct TicketListView {
  tab: usize,
  query: ApiQuery,
  list_state: ListState,
  /// Last load that was logged, so each load is logged once
  logged_at: Option<Instant>,
}

impl TicketListView {
  pub fn new(ctx: &mut AppContext) -> Self {
    let query = ApiQuery::list(&TicketFilters::new());
    ctx.client.query(&query);
    Self {
      tab: 0,
      query,
      list_state: ListState::default(),
      logged_at: None,
    }
  }

  fn status(&self) -> Option<TicketStatus> {
    STATUS_TABS[self.tab]
  }

  fn select_tab(&mut self, tab: usize, ctx: &mut AppContext) {
    self.tab = tab % STATUS_TABS.len();
    let filters = match self.status() {
      Some(status) => TicketFilters::new().with_status(status),
      None => TicketFilters::new(),
    };
    self.query = ApiQuery::list(&filters);
    self.list_state.select(None);
    ctx.client.query(&self.query);
  }

  /// Size of a load not seen before, if it brought any tickets. Empty
  /// loads are marked seen but not reported.
  fn take_new_load(&mut self, ctx: &AppContext) -> Option<usize> {
    let entry = ctx.client.entry(&self.query)?;
    if !entry.is_success() || entry.updated_at() == self.logged_at {
      return None;
    }
    self.logged_at = entry.updated_at();
    let count = entry.data().and_then(|d| d.as_tickets()).map_or(0, |t| t.len());
    (count > 0).then_some(count)
  }

  fn tickets<'a>(&self, ctx: &'a AppContext) -> &'a [Ticket] {
    ctx.client.tickets(&self.query).unwrap_or(&[])
  }

  fn render_tabs(&self, frame: &mut Frame, area: Rect, ctx: &AppContext) {
    let unread = unread_count(self.tickets(ctx));
    let chunks = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Min(0), Constraint::Length(20)])
      .split(area);

    let tabs = Tabs::new(STATUS_TABS.iter().map(|s| tab_label(*s)))
      .select(self.tab)
      .highlight_style(Style::default().fg(Color::Yellow).bold())
      .divider("|");
    frame.render_widget(tabs, chunks[0]);

    let color = if unread > 0 { Color::Magenta } else { Color::DarkGray };
    let badge = Paragraph::new(format!("Notifications: {}", unread))
      .style(Style::default().fg(color))
      .alignment(Alignment::Right);
    frame.render_widget(badge, chunks[1]);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect, ctx: &AppContext) {
    let entry = ctx.client.entry(&self.query);
    let tickets = self.tickets(ctx);
    ensure_valid_selection(&mut self.list_state, tickets.len());

    let block = Block::default()
      .title(format!(" {} tickets ", tab_label(self.status())))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if let Some(e) = entry.filter(|e| e.is_error()).and_then(|e| e.error()) {
      let paragraph = Paragraph::new(format!("Error: {}", e))
        .block(block)
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, area);
      return;
    }

    if tickets.is_empty() {
      let content = if entry.is_some_and(|e| e.is_initial_load()) {
        "Loading..."
      } else {
        "No tickets."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = tickets
      .iter()
      .map(|ticket| {
        let title_style = if ticket.read {
          Style::default()
        } else {
          Style::default().bold()
        };
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<4}", ticket.id), Style::default().fg(Color::Cyan)),
          Span::styled(
            format!("{:<12}", ticket.status.label()),
            Style::default().fg(status_color(ticket.status)),
          ),
          Span::styled(truncate(&ticket.title, 60), title_style),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for TicketListView {
  fn handle_key(&mut self, key: KeyEvent, ctx: &mut AppContext) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Tab | KeyCode::Char('l') | KeyCode::Right => self.select_tab(self.tab + 1, ctx),
      KeyCode::BackTab | KeyCode::Char('h') | KeyCode::Left => {
        self.select_tab(self.tab + STATUS_TABS.len() - 1, ctx)
      }
      KeyCode::Char('a') => self.select_tab(0, ctx),
      KeyCode::Char('o') => self.select_tab(1, ctx),
      KeyCode::Char('c') => self.select_tab(2, ctx),
      KeyCode::Char('r') => {
        ctx.client.refetch(&self.query);
      }
      KeyCode::Enter => {
        let id = self
          .list_state
          .selected()
          .and_then(|i| self.tickets(ctx).get(i))
          .map(|t| t.id.clone());
        if let Some(id) = id {
          return ViewAction::Push(Box::new(TicketsView::new(Some(id), ctx)));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &AppContext) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(1)])
      .split(area);
    self.render_tabs(frame, chunks[0], ctx);
    self.render_list(frame, chunks[1], ctx);
  }

  fn breadcrumb_label(&self) -> String {
    "Ticket list".to_string()
  }

  fn route(&self) -> Route {
    Route::TicketList
  }

  fn tick(&mut self, ctx: &mut AppContext) {
    ctx.client.ensure(&self.query);
    if let Some(count) = self.take_new_load(ctx) {
      info!(count, status = tab_label(self.status()), "tickets loaded");
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("tab", "status").with_priority(20),
      ShortcutInfo::new("enter", "open").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(60),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
