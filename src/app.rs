use crate::api::CachedTicketClient;
use crate::event::{Event, EventHandler};
use crate::routes::{self, CommandAction, Route};
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{TicketFiltersView, TicketListView, TicketsView, UserProfileView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::{info, warn};

/// Message shown on the right of the footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
  Info(String),
  Error(String),
}

/// State shared by all views: the cached API client plus app-wide settings.
///
/// Owned by [`App`] and lent to the active view for each key press, render
/// and tick.
pub struct AppContext {
  pub client: CachedTicketClient,
  pub title: String,
  /// Quiet period before typed search text becomes a query
  pub debounce: Duration,
  status: Option<StatusMessage>,
}

impl AppContext {
  pub fn new(client: CachedTicketClient, title: impl Into<String>, debounce: Duration) -> Self {
    Self {
      client,
      title: title.into(),
      debounce,
      status: None,
    }
  }

  pub fn info(&mut self, message: impl Into<String>) {
    self.status = Some(StatusMessage::Info(message.into()));
  }

  pub fn error(&mut self, message: impl Into<String>) {
    self.status = Some(StatusMessage::Error(message.into()));
  }

  pub fn status(&self) -> Option<&StatusMessage> {
    self.status.as_ref()
  }

  pub fn clear_status(&mut self) {
    self.status = None;
  }
}

/// Build the root view for a route
pub fn view_for_route(route: &Route, ctx: &mut AppContext) -> Box<dyn View> {
  match route {
    Route::Tickets { ticket_id } => Box::new(TicketsView::new(ticket_id.clone(), ctx)),
    Route::TicketList => Box::new(TicketListView::new(ctx)),
    Route::TicketFilters => Box::new(TicketFiltersView::new(ctx)),
    Route::UserProfile => Box::new(UserProfileView::new(ctx)),
  }
}

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,
  command: CommandInput,
  ctx: AppContext,
  tick_rate: Duration,
  should_quit: bool,
}

impl App {
  pub fn new(mut ctx: AppContext, route: Route, tick_rate: Duration) -> Self {
    info!(%route, "starting");
    let root = view_for_route(&route, &mut ctx);
    Self {
      view_stack: vec![root],
      command: CommandInput::new(),
      ctx,
      tick_rate,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(self.tick_rate);
    let result = self.event_loop(&mut terminal, &mut events).await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {}
    }
    self.tick();
  }

  /// Apply finished loads, surface mutation failures, then let the active
  /// view react (debounce commits, re-issuing invalidated queries)
  pub fn tick(&mut self) {
    self.ctx.client.poll();
    if let Some(e) = self.ctx.client.take_mutation_error() {
      self.ctx.error(format!("Update failed: {}", e));
    }
    if let Some(view) = self.view_stack.last_mut() {
      view.tick(&mut self.ctx);
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) {
    // Command line first while it is open
    if self.command.is_active() {
      if let KeyResult::Event(CommandEvent::Submitted(line)) = self.command.handle_key(key) {
        self.execute_command(&line);
      }
      return;
    }

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let capturing = self
      .view_stack
      .last()
      .is_some_and(|view| view.is_capturing_input());
    if !capturing && self.command.handle_key(key) != KeyResult::NotHandled {
      return;
    }

    self.ctx.clear_status();
    let Some(view) = self.view_stack.last_mut() else {
      return;
    };
    let action = view.handle_key(key, &mut self.ctx);
    self.apply_action(action);
  }

  fn apply_action(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn execute_command(&mut self, line: &str) {
    if line.trim().is_empty() {
      return;
    }
    match routes::parse_command(line) {
      Ok(CommandAction::Navigate(route)) => self.navigate(&route),
      Ok(CommandAction::Quit) => self.should_quit = true,
      Err(e) => {
        warn!(command = line, error = %e, "bad command");
        self.ctx.error(e.to_string());
      }
    }
  }

  /// Replace the stack with the root view for `route`
  pub fn navigate(&mut self, route: &Route) {
    info!(%route, "navigate");
    self.ctx.clear_status();
    let view = view_for_route(route, &mut self.ctx);
    self.view_stack.clear();
    self.view_stack.push(view);
  }

  pub fn render_view(&mut self, frame: &mut Frame, area: Rect) {
    if let Some(view) = self.view_stack.last_mut() {
      view.render(frame, area, &self.ctx);
    }
  }

  // Accessors for UI rendering

  pub fn context(&self) -> &AppContext {
    &self.ctx
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command
  }

  pub fn status_message(&self) -> Option<&StatusMessage> {
    self.ctx.status()
  }

  pub fn is_busy(&self) -> bool {
    self.ctx.client.is_busy()
  }

  pub fn route(&self) -> Route {
    self
      .view_stack
      .last()
      .map(|view| view.route())
      .unwrap_or_default()
  }

  pub fn route_path(&self) -> String {
    self.route().path()
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    self
      .view_stack
      .last()
      .map(|view| view.shortcuts())
      .unwrap_or_default()
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|view| view.breadcrumb_label())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::MockApi;
  use std::sync::Arc;

  fn test_app(route: Route) -> App {
    let api = MockApi::new().with_latency(Duration::ZERO);
    let client = CachedTicketClient::new(Arc::new(api), Duration::from_secs(60));
    let ctx = AppContext::new(client, "tix", Duration::from_millis(300));
    App::new(ctx, route, Duration::from_millis(50))
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_command(app: &mut App, line: &str) {
    app.handle_key(key(KeyCode::Char(':')));
    for c in line.chars() {
      app.handle_key(key(KeyCode::Char(c)));
    }
    app.handle_key(key(KeyCode::Enter));
  }

  #[tokio::test]
  async fn test_starts_on_requested_route() {
    let app = test_app(Route::Tickets {
      ticket_id: Some("2".to_string()),
    });
    assert_eq!(app.route_path(), "/tickets/2");
  }

  #[tokio::test]
  async fn test_command_navigates_and_replaces_stack() {
    let mut app = test_app(Route::default());
    type_command(&mut app, "profile");
    assert_eq!(app.route(), Route::UserProfile);
    assert_eq!(app.view_breadcrumb().len(), 1);

    type_command(&mut app, "/ticket-list");
    assert_eq!(app.route(), Route::TicketList);
  }

  #[tokio::test]
  async fn test_unknown_command_reports_error() {
    let mut app = test_app(Route::default());
    type_command(&mut app, "/nowhere");
    assert!(matches!(app.status_message(), Some(StatusMessage::Error(_))));
    assert_eq!(app.route(), Route::default());
  }

  #[tokio::test]
  async fn test_quit_command_and_back_on_root() {
    let mut app = test_app(Route::UserProfile);
    type_command(&mut app, "q");
    assert!(app.should_quit);

    let mut app = test_app(Route::UserProfile);
    app.handle_key(key(KeyCode::Char('q')));
    assert!(app.should_quit);
  }

  #[tokio::test]
  async fn test_ctrl_c_quits() {
    let mut app = test_app(Route::default());
    app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(app.should_quit);
  }

  #[tokio::test]
  async fn test_colon_is_typed_into_search_while_searching() {
    let mut app = test_app(Route::default());
    app.handle_key(key(KeyCode::Char('/')));
    app.handle_key(key(KeyCode::Char(':')));
    assert!(!app.command_input().is_active());
  }
}
