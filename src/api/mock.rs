//! In-memory ticket backend with simulated latency.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::types::{Ticket, TicketFilters, TicketStatus, UserProfile};
use super::TicketApi;
use crate::error::{Error, Result};

pub const DEFAULT_LATENCY: Duration = Duration::from_millis(800);

/// Ticket API backed by a fixed fixture
pub struct MockApi {
  tickets: Mutex<Vec<Ticket>>,
  profile: UserProfile,
  latency: Duration,
}

impl MockApi {
  pub fn new() -> Self {
    Self::with_tickets(fixture_tickets())
  }

  pub fn with_tickets(tickets: Vec<Ticket>) -> Self {
    Self {
      tickets: Mutex::new(tickets),
      profile: UserProfile {
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        email: Some("jane.doe@example.com".to_string()),
      },
      latency: DEFAULT_LATENCY,
    }
  }

  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = latency;
    self
  }

  async fn delay(&self) {
    if !self.latency.is_zero() {
      tokio::time::sleep(self.latency).await;
    }
  }

  fn tickets(&self) -> MutexGuard<'_, Vec<Ticket>> {
    // Only plain data behind the lock, so a poisoned guard is still consistent
    self.tickets.lock().unwrap_or_else(|e| e.into_inner())
  }
}

impl Default for MockApi {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl TicketApi for MockApi {
  async fn fetch_tickets(&self, filters: &TicketFilters) -> Result<Vec<Ticket>> {
    self.delay().await;
    Ok(filters.apply(&self.tickets()))
  }

  async fn fetch_ticket(&self, id: &str) -> Result<Ticket> {
    self.delay().await;
    self
      .tickets()
      .iter()
      .find(|t| t.id == id)
      .cloned()
      .ok_or_else(|| Error::NotFound(format!("ticket {}", id)))
  }

  async fn fetch_user_profile(&self) -> Result<UserProfile> {
    self.delay().await;
    Ok(self.profile.clone())
  }

  async fn mark_read(&self, id: &str) -> Result<()> {
    self.delay().await;
    let mut tickets = self.tickets();
    let ticket = tickets
      .iter_mut()
      .find(|t| t.id == id)
      .ok_or_else(|| Error::NotFound(format!("ticket {}", id)))?;
    ticket.read = true;
    Ok(())
  }

  fn source(&self) -> String {
    "mock".to_string()
  }
}

fn at(secs: i64) -> DateTime<Utc> {
  DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// The three-ticket fixture
pub fn fixture_tickets() -> Vec<Ticket> {
  vec![
    Ticket {
      id: "1".to_string(),
      title: "Fix bug in login".to_string(),
      status: TicketStatus::Open,
      created_at: at(1_704_880_800), // 2024-01-10 10:00 UTC
      description: Some("Users are logged out right after signing in on Safari.".to_string()),
      read: false,
    },
    Ticket {
      id: "2".to_string(),
      title: "Update documentation".to_string(),
      status: TicketStatus::Open,
      created_at: at(1_705_053_600), // 2024-01-12 10:00 UTC
      description: None,
      read: true,
    },
    Ticket {
      id: "3".to_string(),
      title: "Add new feature".to_string(),
      status: TicketStatus::Closed,
      created_at: at(1_705_312_800), // 2024-01-15 10:00 UTC
      description: Some("Export the ticket list as CSV.".to_string()),
      read: true,
    },
  ]
}
