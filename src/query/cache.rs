//! Shared query cache keyed by [`QueryKey`].
//!
//! The cache map is owned by whoever holds the `QueryCache` (the app context)
//! and is only mutated from the event loop. Loaders run on tokio tasks and
//! report back over a channel that [`QueryCache::poll`] drains on each tick,
//! so a load never touches the map directly.

use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::key::QueryKey;
use crate::error::{Error, Result};

/// Lifecycle of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryStatus {
  /// Known key, never loaded
  Idle,
  /// A load is in flight. Previous data, if any, is still served.
  Loading,
  /// Last load succeeded
  Success,
  /// Last load failed
  Error,
}

/// State stored for one key
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
  status: QueryStatus,
  data: Option<V>,
  error: Option<Error>,
  updated_at: Option<Instant>,
  invalidated: bool,
  in_flight: Option<u64>,
}

impl<V> Default for CacheEntry<V> {
  fn default() -> Self {
    Self {
      status: QueryStatus::Idle,
      data: None,
      error: None,
      updated_at: None,
      invalidated: false,
      in_flight: None,
    }
  }
}

impl<V> CacheEntry<V> {
  /// Last successfully loaded data, kept while a refetch is in flight
  pub fn data(&self) -> Option<&V> {
    self.data.as_ref()
  }

  pub fn error(&self) -> Option<&Error> {
    self.error.as_ref()
  }

  /// When data was last stored
  pub fn updated_at(&self) -> Option<Instant> {
    self.updated_at
  }

  pub fn is_loading(&self) -> bool {
    self.status == QueryStatus::Loading
  }

  pub fn is_success(&self) -> bool {
    self.status == QueryStatus::Success
  }

  pub fn is_error(&self) -> bool {
    self.status == QueryStatus::Error
  }

  /// Loading with nothing to show yet
  pub fn is_initial_load(&self) -> bool {
    self.is_loading() && self.data.is_none()
  }

  pub fn is_fetching(&self) -> bool {
    self.in_flight.is_some()
  }

  pub fn is_invalidated(&self) -> bool {
    self.invalidated
  }

  /// Success, not invalidated, and younger than `stale_time`
  pub fn is_fresh(&self, stale_time: Duration) -> bool {
    self.status == QueryStatus::Success
      && !self.invalidated
      && self
        .updated_at
        .map(|t| t.elapsed() <= stale_time)
        .unwrap_or(false)
  }
}

enum Completion<V> {
  Query {
    key: QueryKey,
    generation: u64,
    result: Result<V>,
  },
  Mutation {
    label: String,
    invalidates: QueryKey,
    result: Result<()>,
  },
}

/// Async-state cache with request deduplication and prefix invalidation
pub struct QueryCache<V> {
  entries: HashMap<QueryKey, CacheEntry<V>>,
  tx: mpsc::UnboundedSender<Completion<V>>,
  rx: mpsc::UnboundedReceiver<Completion<V>>,
  stale_time: Duration,
  next_generation: u64,
  pending_mutations: usize,
  last_mutation_error: Option<Error>,
}

impl<V: Send + 'static> QueryCache<V> {
  pub fn new() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      entries: HashMap::new(),
      tx,
      rx,
      stale_time: Duration::from_secs(60),
      next_generation: 0,
      pending_mutations: 0,
      last_mutation_error: None,
    }
  }

  /// Set how long a successful result counts as fresh.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  /// Request the data for `key`.
  ///
  /// - fresh entry: returned as is, `loader` is not called
  /// - load already in flight: joined, `loader` is not called
  /// - otherwise `loader` is called once and its future is spawned
  pub fn query<F, Fut>(&mut self, key: &QueryKey, loader: F) -> &CacheEntry<V>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V>> + Send + 'static,
  {
    if let Some(entry) = self.entries.get(key) {
      if entry.is_fetching() {
        debug!(%key, "joining in-flight query");
      } else if entry.is_fresh(self.stale_time) {
        debug!(%key, "query cache hit");
      } else {
        self.start_load(key, loader);
      }
    } else {
      self.start_load(key, loader);
    }
    self.entry_or_idle(key)
  }

  /// Start a new load even if the data is fresh. Joins an in-flight load.
  pub fn refetch<F, Fut>(&mut self, key: &QueryKey, loader: F) -> &CacheEntry<V>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V>> + Send + 'static,
  {
    if !self.entries.get(key).is_some_and(CacheEntry::is_fetching) {
      self.start_load(key, loader);
    }
    self.entry_or_idle(key)
  }

  pub fn get(&self, key: &QueryKey) -> Option<&CacheEntry<V>> {
    self.entries.get(key)
  }

  /// Store data directly. Any in-flight load for the key is superseded.
  pub fn set(&mut self, key: &QueryKey, data: V) {
    let entry = self.entries.entry(key.clone()).or_default();
    entry.status = QueryStatus::Success;
    entry.data = Some(data);
    entry.error = None;
    entry.updated_at = Some(Instant::now());
    entry.invalidated = false;
    entry.in_flight = None;
  }

  /// Mark every entry under `prefix` stale. Returns how many were marked.
  pub fn invalidate(&mut self, prefix: &QueryKey) -> usize {
    let mut count = 0;
    for (key, entry) in self.entries.iter_mut() {
      if key.starts_with(prefix) {
        entry.invalidated = true;
        count += 1;
      }
    }
    debug!(%prefix, count, "invalidated queries");
    count
  }

  pub fn is_invalidated(&self, key: &QueryKey) -> bool {
    self.entries.get(key).is_some_and(CacheEntry::is_invalidated)
  }

  /// Drop every entry under `prefix`. Completions for them are discarded.
  pub fn remove(&mut self, prefix: &QueryKey) -> usize {
    let before = self.entries.len();
    self.entries.retain(|key, _| !key.starts_with(prefix));
    before - self.entries.len()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }

  /// Number of entries with a load in flight
  pub fn fetching_count(&self) -> usize {
    self.entries.values().filter(|e| e.is_fetching()).count()
  }

  /// Run a write. On success every entry under `invalidates` is marked stale.
  pub fn mutate<Fut>(&mut self, label: impl Into<String>, invalidates: QueryKey, mutation: Fut)
  where
    Fut: Future<Output = Result<()>> + Send + 'static,
  {
    let label = label.into();
    let tx = self.tx.clone();
    self.pending_mutations += 1;

    tokio::spawn(async move {
      let result = catch_panics(mutation).await;
      let _ = tx.send(Completion::Mutation {
        label,
        invalidates,
        result,
      });
    });
  }

  pub fn pending_mutations(&self) -> usize {
    self.pending_mutations
  }

  /// Hand the last mutation failure to the caller, once
  pub fn take_mutation_error(&mut self) -> Option<Error> {
    self.last_mutation_error.take()
  }

  /// Apply finished loads and mutations.
  ///
  /// Returns `true` if any state changed. Call this on each event loop tick.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok(completion) = self.rx.try_recv() {
      changed |= self.apply(completion);
    }
    changed
  }

  fn apply(&mut self, completion: Completion<V>) -> bool {
    match completion {
      Completion::Query {
        key,
        generation,
        result,
      } => {
        let Some(entry) = self.entries.get_mut(&key) else {
          debug!(%key, "discarding result for removed query");
          return false;
        };
        if entry.in_flight != Some(generation) {
          debug!(%key, generation, "discarding superseded query result");
          return false;
        }

        entry.in_flight = None;
        match result {
          Ok(data) => {
            entry.status = QueryStatus::Success;
            entry.data = Some(data);
            entry.error = None;
            entry.updated_at = Some(Instant::now());
          }
          Err(e) => {
            warn!(%key, error = %e, "query failed");
            entry.status = QueryStatus::Error;
            entry.error = Some(e);
          }
        }
        true
      }
      Completion::Mutation {
        label,
        invalidates,
        result,
      } => {
        self.pending_mutations = self.pending_mutations.saturating_sub(1);
        match result {
          Ok(()) => {
            debug!(%label, "mutation succeeded");
            self.last_mutation_error = None;
            self.invalidate(&invalidates);
          }
          Err(e) => {
            warn!(%label, error = %e, "mutation failed");
            self.last_mutation_error = Some(e);
          }
        }
        true
      }
    }
  }

  fn start_load<F, Fut>(&mut self, key: &QueryKey, loader: F)
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V>> + Send + 'static,
  {
    self.next_generation += 1;
    let generation = self.next_generation;

    let entry = self.entries.entry(key.clone()).or_default();
    entry.status = QueryStatus::Loading;
    entry.in_flight = Some(generation);
    entry.invalidated = false;

    debug!(%key, generation, "starting query");

    let future = loader();
    let tx = self.tx.clone();
    let key = key.clone();
    tokio::spawn(async move {
      let result = catch_panics(future).await;
      // The cache may have been dropped; nothing to report to then.
      let _ = tx.send(Completion::Query {
        key,
        generation,
        result,
      });
    });
  }

  fn entry_or_idle(&mut self, key: &QueryKey) -> &CacheEntry<V> {
    self.entries.entry(key.clone()).or_default()
  }
}

impl<V: Send + 'static> Default for QueryCache<V> {
  fn default() -> Self {
    Self::new()
  }
}

impl<V> std::fmt::Debug for QueryCache<V> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryCache")
      .field("entries", &self.entries.len())
      .field("stale_time", &self.stale_time)
      .field("pending_mutations", &self.pending_mutations)
      .finish_non_exhaustive()
  }
}

/// A panicking loader becomes an error entry instead of a load that never ends.
async fn catch_panics<T>(future: impl Future<Output = Result<T>>) -> Result<T> {
  match AssertUnwindSafe(future).catch_unwind().await {
    Ok(result) => result,
    Err(_) => Err(Error::Network("request task panicked".to_string())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::{TicketFilters, TicketStatus};
  use crate::query::key::{
    all_tickets_key, ticket_detail_key, ticket_list_key, ticket_lists_key, user_profile_key,
  };
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;
  use tokio::sync::oneshot;

  async fn settle<V: Send + 'static>(cache: &mut QueryCache<V>) {
    for _ in 0..50 {
      tokio::task::yield_now().await;
      if cache.poll() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(1)).await;
    }
  }

  fn counting_loader(
    counter: &Arc<AtomicU32>,
    value: i32,
  ) -> impl FnOnce() -> futures::future::BoxFuture<'static, Result<i32>> {
    let counter = counter.clone();
    move || {
      counter.fetch_add(1, Ordering::SeqCst);
      Box::pin(async move { Ok(value) })
    }
  }

  #[tokio::test]
  async fn test_query_success() {
    let mut cache: QueryCache<Vec<i32>> = QueryCache::new();
    let key = ticket_lists_key();

    let entry = cache.query(&key, || async { Ok(vec![1, 2, 3]) });
    assert!(entry.is_loading());
    assert!(entry.is_initial_load());

    settle(&mut cache).await;

    let entry = cache.get(&key).unwrap();
    assert!(entry.is_success());
    assert_eq!(entry.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error_lands_in_entry() {
    let mut cache: QueryCache<i32> = QueryCache::new();
    let key = ticket_detail_key("9").unwrap();

    cache.query(&key, || async { Err(Error::NotFound("ticket 9".to_string())) });
    settle(&mut cache).await;

    let entry = cache.get(&key).unwrap();
    assert!(entry.is_error());
    assert_eq!(entry.error(), Some(&Error::NotFound("ticket 9".to_string())));
    assert!(entry.data().is_none());
  }

  #[tokio::test]
  async fn test_concurrent_queries_are_deduplicated() {
    let mut cache: QueryCache<i32> = QueryCache::new();
    let key = ticket_detail_key("1").unwrap();
    let counter = Arc::new(AtomicU32::new(0));
    let (release, gate) = oneshot::channel::<()>();

    let c = counter.clone();
    cache.query(&key, move || {
      c.fetch_add(1, Ordering::SeqCst);
      async move {
        let _ = gate.await;
        Ok(1)
      }
    });
    // Second request before the first resolves
    let entry = cache.query(&key, counting_loader(&counter, 2));
    assert!(entry.is_loading());
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    release.send(()).unwrap();
    settle(&mut cache).await;

    assert_eq!(cache.get(&key).unwrap().data(), Some(&1));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_fresh_entry_skips_loader() {
    let mut cache: QueryCache<i32> = QueryCache::new();
    let key = user_profile_key();
    let counter = Arc::new(AtomicU32::new(0));

    cache.query(&key, counting_loader(&counter, 7));
    settle(&mut cache).await;
    cache.query(&key, counting_loader(&counter, 8));

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(cache.get(&key).unwrap().data(), Some(&7));
  }

  #[tokio::test]
  async fn test_stale_entry_serves_old_data_while_revalidating() {
    let mut cache: QueryCache<i32> = QueryCache::new().with_stale_time(Duration::ZERO);
    let key = user_profile_key();
    let counter = Arc::new(AtomicU32::new(0));

    cache.query(&key, counting_loader(&counter, 1));
    settle(&mut cache).await;
    tokio::time::sleep(Duration::from_millis(2)).await;

    let entry = cache.query(&key, counting_loader(&counter, 2));
    assert!(entry.is_loading());
    assert!(!entry.is_initial_load());
    assert_eq!(entry.data(), Some(&1));

    settle(&mut cache).await;
    assert_eq!(cache.get(&key).unwrap().data(), Some(&2));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_invalidate_root_marks_lists_and_details() {
    let mut cache: QueryCache<i32> = QueryCache::new();
    let list = ticket_list_key(&TicketFilters::new().with_status(TicketStatus::Open));
    let detail = ticket_detail_key("1").unwrap();
    let profile = user_profile_key();

    cache.set(&list, 1);
    cache.set(&detail, 2);
    cache.set(&profile, 3);

    assert_eq!(cache.invalidate(&all_tickets_key()), 2);
    assert!(cache.is_invalidated(&list));
    assert!(cache.is_invalidated(&detail));
    assert!(!cache.is_invalidated(&profile));

    // Next access refetches
    let counter = Arc::new(AtomicU32::new(0));
    cache.query(&list, counting_loader(&counter, 10));
    cache.query(&detail, counting_loader(&counter, 20));
    cache.query(&profile, counting_loader(&counter, 30));
    assert_eq!(counter.load(Ordering::SeqCst), 2);

    settle(&mut cache).await;
    settle(&mut cache).await;
    assert_eq!(cache.get(&list).unwrap().data(), Some(&10));
    assert_eq!(cache.get(&detail).unwrap().data(), Some(&20));
    assert!(!cache.is_invalidated(&list));
  }

  #[tokio::test]
  async fn test_invalidate_lists_only() {
    let mut cache: QueryCache<i32> = QueryCache::new();
    let list = ticket_list_key(&TicketFilters::new());
    let detail = ticket_detail_key("1").unwrap();
    cache.set(&list, 1);
    cache.set(&detail, 2);

    assert_eq!(cache.invalidate(&ticket_lists_key()), 1);
    assert!(cache.is_invalidated(&list));
    assert!(!cache.is_invalidated(&detail));
  }

  #[tokio::test]
  async fn test_superseded_result_is_discarded() {
    let mut cache: QueryCache<i32> = QueryCache::new();
    let key = ticket_detail_key("1").unwrap();
    let (release_old, gate_old) = oneshot::channel::<()>();

    cache.query(&key, move || async move {
      let _ = gate_old.await;
      Ok(1)
    });
    // A direct write supersedes the in-flight load
    cache.set(&key, 2);

    release_old.send(()).unwrap();
    for _ in 0..10 {
      tokio::task::yield_now().await;
      cache.poll();
    }
    assert_eq!(cache.get(&key).unwrap().data(), Some(&2));
  }

  #[tokio::test]
  async fn test_error_is_not_retried_until_requested() {
    let mut cache: QueryCache<i32> = QueryCache::new();
    let key = ticket_detail_key("1").unwrap();
    let counter = Arc::new(AtomicU32::new(0));

    let c = counter.clone();
    cache.query(&key, move || {
      c.fetch_add(1, Ordering::SeqCst);
      async { Err(Error::Network("down".to_string())) }
    });
    settle(&mut cache).await;
    for _ in 0..5 {
      tokio::task::yield_now().await;
      cache.poll();
    }
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    cache.refetch(&key, counting_loader(&counter, 5));
    settle(&mut cache).await;
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(cache.get(&key).unwrap().data(), Some(&5));
  }

  #[tokio::test]
  async fn test_mutation_invalidates_on_success() {
    let mut cache: QueryCache<i32> = QueryCache::new();
    let list = ticket_list_key(&TicketFilters::new());
    cache.set(&list, 1);

    cache.mutate("mark read", all_tickets_key(), async { Ok(()) });
    assert_eq!(cache.pending_mutations(), 1);
    settle(&mut cache).await;

    assert_eq!(cache.pending_mutations(), 0);
    assert!(cache.is_invalidated(&list));
    assert!(cache.take_mutation_error().is_none());
  }

  #[tokio::test]
  async fn test_failed_mutation_keeps_cache() {
    let mut cache: QueryCache<i32> = QueryCache::new();
    let list = ticket_list_key(&TicketFilters::new());
    cache.set(&list, 1);

    cache.mutate("mark read", all_tickets_key(), async {
      Err(Error::Network("offline".to_string()))
    });
    settle(&mut cache).await;

    assert!(!cache.is_invalidated(&list));
    assert_eq!(
      cache.take_mutation_error(),
      Some(Error::Network("offline".to_string()))
    );
    assert_eq!(cache.take_mutation_error(), None);
  }

  fn loader_should_panic() -> bool {
    true
  }

  #[tokio::test]
  async fn test_panicking_loader_becomes_error() {
    let mut cache: QueryCache<i32> = QueryCache::new();
    let key = user_profile_key();

    cache.query(&key, || async {
      if loader_should_panic() {
        panic!("boom");
      }
      Ok(1)
    });
    settle(&mut cache).await;

    assert!(cache.get(&key).unwrap().is_error());
  }

  #[tokio::test]
  async fn test_remove_discards_pending_result() {
    let mut cache: QueryCache<i32> = QueryCache::new();
    let key = ticket_detail_key("1").unwrap();
    cache.query(&key, || async { Ok(1) });
    assert_eq!(cache.remove(&all_tickets_key()), 1);

    for _ in 0..10 {
      tokio::task::yield_now().await;
      cache.poll();
    }
    assert!(cache.get(&key).is_none());
    assert!(cache.entries.is_empty());
  }
}
