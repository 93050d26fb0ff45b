//! Hierarchical query keys.
//!
//! Keys are ordered segment lists: a namespace (`tickets`, `user`), a scope
//! (`list`, `detail`, `profile`) and then the parameters that pick one
//! result. Every key in a family shares the family's prefix, which is what
//! makes [`QueryCache::invalidate`](super::QueryCache::invalidate) by prefix
//! work.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;

use crate::api::types::TicketFilters;
use crate::error::{Error, Result};

const TICKETS: &str = "tickets";
const LIST: &str = "list";
const DETAIL: &str = "detail";
const USER: &str = "user";
const PROFILE: &str = "profile";

/// One element of a [`QueryKey`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeySegment {
  /// A namespace, scope or identifier
  Str(String),
  /// A normalized list filter record, serialized as `{"filters": {...}}`
  Filters(TicketFilters),
}

impl Serialize for KeySegment {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match self {
      KeySegment::Str(s) => serializer.serialize_str(s),
      KeySegment::Filters(filters) => {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("filters", filters)?;
        map.end()
      }
    }
  }
}

/// Cache key for a query. Equality is structural over the segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<KeySegment>);

impl QueryKey {
  fn root(namespace: &str) -> Self {
    QueryKey(vec![KeySegment::Str(namespace.to_string())])
  }

  fn push(mut self, segment: KeySegment) -> Self {
    self.0.push(segment);
    self
  }

  fn push_str(self, s: &str) -> Self {
    self.push(KeySegment::Str(s.to_string()))
  }

  /// Segment-wise prefix test. Every key starts with itself.
  pub fn starts_with(&self, prefix: &QueryKey) -> bool {
    self.0.starts_with(&prefix.0)
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
    f.write_str(&json)
  }
}

/// `["tickets"]`
pub fn all_tickets_key() -> QueryKey {
  QueryKey::root(TICKETS)
}

/// `["tickets","list"]`
pub fn ticket_lists_key() -> QueryKey {
  all_tickets_key().push_str(LIST)
}

/// `["tickets","list",{"filters":{..}}]`, with the filters normalized so
/// that equivalent records never fragment the cache.
pub fn ticket_list_key(filters: &TicketFilters) -> QueryKey {
  ticket_lists_key().push(KeySegment::Filters(filters.normalized()))
}

/// `["tickets","detail"]`
pub fn ticket_details_key() -> QueryKey {
  all_tickets_key().push_str(DETAIL)
}

/// `["tickets","detail",id]`
pub fn ticket_detail_key(id: &str) -> Result<QueryKey> {
  if id.trim().is_empty() {
    return Err(Error::InvalidArgument(
      "ticket id must not be empty".to_string(),
    ));
  }
  Ok(ticket_details_key().push_str(id))
}

/// `["user"]`
pub fn all_user_key() -> QueryKey {
  QueryKey::root(USER)
}

/// `["user","profile"]`
pub fn user_profile_key() -> QueryKey {
  all_user_key().push_str(PROFILE)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::{SortBy, TicketStatus};

  #[test]
  fn test_hierarchy() {
    assert_eq!(all_tickets_key().to_string(), r#"["tickets"]"#);
    assert_eq!(ticket_lists_key().to_string(), r#"["tickets","list"]"#);
    assert_eq!(ticket_details_key().to_string(), r#"["tickets","detail"]"#);
    assert_eq!(
      ticket_detail_key("42").unwrap().to_string(),
      r#"["tickets","detail","42"]"#
    );
    assert_eq!(user_profile_key().to_string(), r#"["user","profile"]"#);
  }

  #[test]
  fn test_list_key_wraps_filters() {
    let key = ticket_list_key(&TicketFilters::new().with_status(TicketStatus::Open));
    assert_eq!(
      key.to_string(),
      r#"["tickets","list",{"filters":{"status":"open"}}]"#
    );

    let key = ticket_list_key(&TicketFilters::new());
    assert_eq!(key.to_string(), r#"["tickets","list",{"filters":{}}]"#);
  }

  #[test]
  fn test_equivalent_filters_produce_equal_keys() {
    let a = TicketFilters {
      status: Some(TicketStatus::Closed),
      search: None,
      sort_by: Some(SortBy::Title),
    };
    let b = TicketFilters::new()
      .with_sort(SortBy::Title)
      .with_status(TicketStatus::Closed)
      .with_search("");
    assert_eq!(ticket_list_key(&a), ticket_list_key(&b));

    let c = TicketFilters::new().with_search(" bug ");
    let d = TicketFilters::new().with_search("bug");
    assert_eq!(ticket_list_key(&c), ticket_list_key(&d));
  }

  #[test]
  fn test_default_sort_shares_key_with_unsorted() {
    assert_eq!(
      ticket_list_key(&TicketFilters::new().with_sort(SortBy::Date)),
      ticket_list_key(&TicketFilters::new())
    );
    assert_ne!(
      ticket_list_key(&TicketFilters::new().with_sort(SortBy::Title)),
      ticket_list_key(&TicketFilters::new())
    );
  }

  #[test]
  fn test_different_filters_produce_different_keys() {
    let open = ticket_list_key(&TicketFilters::new().with_status(TicketStatus::Open));
    let closed = ticket_list_key(&TicketFilters::new().with_status(TicketStatus::Closed));
    let all = ticket_list_key(&TicketFilters::new());
    assert_ne!(open, closed);
    assert_ne!(open, all);
  }

  #[test]
  fn test_detail_keys_are_distinct() {
    let one = ticket_detail_key("1").unwrap();
    let two = ticket_detail_key("2").unwrap();
    assert_ne!(one, two);
    assert_ne!(one, ticket_details_key());
    assert!(one.starts_with(&ticket_details_key()));
  }

  #[test]
  fn test_empty_detail_id_is_rejected() {
    assert!(matches!(
      ticket_detail_key(""),
      Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
      ticket_detail_key("  "),
      Err(Error::InvalidArgument(_))
    ));
  }

  #[test]
  fn test_prefixes() {
    let list = ticket_list_key(&TicketFilters::new());
    let detail = ticket_detail_key("1").unwrap();

    assert!(list.starts_with(&all_tickets_key()));
    assert!(list.starts_with(&ticket_lists_key()));
    assert!(!list.starts_with(&ticket_details_key()));
    assert!(detail.starts_with(&all_tickets_key()));
    assert!(!detail.starts_with(&ticket_lists_key()));
    assert!(!user_profile_key().starts_with(&all_tickets_key()));
    assert!(!all_tickets_key().starts_with(&ticket_lists_key()));
  }
}
