//! Ticket client that routes every read through the shared query cache.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;

use super::types::{Ticket, TicketFilters, UserProfile};
use super::TicketApi;
use crate::error::{Error, Result};
use crate::query::key::{all_tickets_key, ticket_detail_key, ticket_list_key, user_profile_key};
use crate::query::{CacheEntry, QueryCache, QueryKey};

/// Payload stored in the cache; one variant per key family
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
  Tickets(Vec<Ticket>),
  Ticket(Ticket),
  Profile(UserProfile),
}

impl QueryData {
  pub fn as_tickets(&self) -> Option<&[Ticket]> {
    match self {
      QueryData::Tickets(t) => Some(t),
      _ => None,
    }
  }

  pub fn as_ticket(&self) -> Option<&Ticket> {
    match self {
      QueryData::Ticket(t) => Some(t),
      _ => None,
    }
  }

  pub fn as_profile(&self) -> Option<&UserProfile> {
    match self {
      QueryData::Profile(p) => Some(p),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum QueryKind {
  List(TicketFilters),
  Detail(String),
  Profile,
}

/// A read the app can issue: what to fetch plus the key it is cached under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiQuery {
  key: QueryKey,
  kind: QueryKind,
}

impl ApiQuery {
  pub fn list(filters: &TicketFilters) -> Self {
    let filters = filters.normalized();
    Self {
      key: ticket_list_key(&filters),
      kind: QueryKind::List(filters),
    }
  }

  /// Fails with `InvalidArgument` for an empty id
  pub fn detail(id: &str) -> Result<Self> {
    Ok(Self {
      key: ticket_detail_key(id)?,
      kind: QueryKind::Detail(id.to_string()),
    })
  }

  pub fn profile() -> Self {
    Self {
      key: user_profile_key(),
      kind: QueryKind::Profile,
    }
  }

  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  fn load(&self, api: Arc<dyn TicketApi>) -> BoxFuture<'static, Result<QueryData>> {
    let kind = self.kind.clone();
    Box::pin(async move {
      match kind {
        QueryKind::List(filters) => api.fetch_tickets(&filters).await.map(QueryData::Tickets),
        QueryKind::Detail(id) => api.fetch_ticket(&id).await.map(QueryData::Ticket),
        QueryKind::Profile => api.fetch_user_profile().await.map(QueryData::Profile),
      }
    })
  }
}

/// Ticket API with a query cache in front of it.
///
/// Owns the cache; views get `&mut` access through the app context and
/// never hold on to results outside of it.
pub struct CachedTicketClient {
  api: Arc<dyn TicketApi>,
  cache: QueryCache<QueryData>,
}

impl CachedTicketClient {
  pub fn new(api: Arc<dyn TicketApi>, stale_time: Duration) -> Self {
    Self {
      api,
      cache: QueryCache::new().with_stale_time(stale_time),
    }
  }

  pub fn source(&self) -> String {
    self.api.source()
  }

  /// Issue a read (served, joined or started per the cache rules)
  pub fn query(&mut self, query: &ApiQuery) -> &CacheEntry<QueryData> {
    let api = self.api.clone();
    self.cache.query(query.key(), || query.load(api))
  }

  /// Force a reload of `query`
  pub fn refetch(&mut self, query: &ApiQuery) -> &CacheEntry<QueryData> {
    let api = self.api.clone();
    self.cache.refetch(query.key(), || query.load(api))
  }

  /// Re-issue `query` if it was invalidated since it was last loaded.
  /// Returns whether a load was started.
  pub fn ensure(&mut self, query: &ApiQuery) -> bool {
    if self.cache.is_invalidated(query.key()) {
      self.query(query);
      true
    } else {
      false
    }
  }

  pub fn entry(&self, query: &ApiQuery) -> Option<&CacheEntry<QueryData>> {
    self.cache.get(query.key())
  }

  pub fn tickets(&self, query: &ApiQuery) -> Option<&[Ticket]> {
    self.entry(query)?.data()?.as_tickets()
  }

  pub fn ticket(&self, query: &ApiQuery) -> Option<&Ticket> {
    self.entry(query)?.data()?.as_ticket()
  }

  pub fn profile(&self, query: &ApiQuery) -> Option<&UserProfile> {
    self.entry(query)?.data()?.as_profile()
  }

  /// Flag a ticket read, then invalidate every ticket query
  pub fn mark_read(&mut self, id: &str) -> Result<()> {
    if id.trim().is_empty() {
      return Err(Error::InvalidArgument(
        "ticket id must not be empty".to_string(),
      ));
    }
    let api = self.api.clone();
    let id = id.to_string();
    self.cache.mutate(
      format!("mark ticket {} read", id),
      all_tickets_key(),
      async move { api.mark_read(&id).await },
    );
    Ok(())
  }

  pub fn take_mutation_error(&mut self) -> Option<Error> {
    self.cache.take_mutation_error()
  }

  /// True while any load or mutation is running
  pub fn is_busy(&self) -> bool {
    self.cache.pending_mutations() > 0 || self.cache.fetching_count() > 0
  }

  /// Apply finished loads; see [`QueryCache::poll`]
  pub fn poll(&mut self) -> bool {
    self.cache.poll()
  }

  #[cfg(test)]
  pub fn cache(&self) -> &QueryCache<QueryData> {
    &self.cache
  }
}
