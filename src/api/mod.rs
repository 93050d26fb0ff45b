//! Fetch client for tickets and the user profile.
//!
//! [`TicketApi`] is the seam the rest of the app talks to. [`MockApi`] serves
//! an in-memory fixture, [`HttpApi`] talks to a REST backend, and
//! [`CachedTicketClient`] puts the query cache in front of either.

pub mod cached_client;
pub mod http;
pub mod mock;
pub mod types;
mod wire;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use types::{Ticket, TicketFilters, UserProfile};

pub use cached_client::{ApiQuery, CachedTicketClient};
pub use http::HttpApi;
pub use mock::MockApi;

/// Async access to the ticket backend. Failures come back as [`crate::error::Error`].
#[async_trait]
pub trait TicketApi: Send + Sync {
  /// Tickets matching `filters`, already filtered and sorted
  async fn fetch_tickets(&self, filters: &TicketFilters) -> Result<Vec<Ticket>>;

  /// A single ticket; `Error::NotFound` for unknown ids
  async fn fetch_ticket(&self, id: &str) -> Result<Ticket>;

  async fn fetch_user_profile(&self) -> Result<UserProfile>;

  /// Flag a ticket as read
  async fn mark_read(&self, id: &str) -> Result<()>;

  /// Short description of where data comes from, shown in the header
  fn source(&self) -> String;
}

/// Pick the backend from configuration: HTTP when a base URL is set, mock otherwise.
pub fn from_config(config: &Config) -> color_eyre::Result<Arc<dyn TicketApi>> {
  match config.api.base_url.as_deref() {
    Some(url) => {
      let api = HttpApi::new(url, config.api.timeout())
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create API client for {}: {}", url, e))?;
      tracing::info!(url, "using HTTP ticket API");
      Ok(Arc::new(api))
    }
    None => {
      tracing::info!("using mock ticket API");
      Ok(Arc::new(MockApi::new().with_latency(config.mock.latency())))
    }
  }
}
