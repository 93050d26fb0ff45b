use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Workflow status of a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TicketStatus {
  Open,
  InProgress,
  Closed,
}

impl TicketStatus {
  /// Name used on the wire and in query strings
  pub fn as_str(&self) -> &'static str {
    match self {
      TicketStatus::Open => "open",
      TicketStatus::InProgress => "in-progress",
      TicketStatus::Closed => "closed",
    }
  }

  /// Human-readable label
  pub fn label(&self) -> &'static str {
    match self {
      TicketStatus::Open => "Open",
      TicketStatus::InProgress => "In Progress",
      TicketStatus::Closed => "Closed",
    }
  }
}

impl fmt::Display for TicketStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TicketStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "open" => Ok(TicketStatus::Open),
      "in-progress" | "in_progress" | "in progress" => Ok(TicketStatus::InProgress),
      "closed" => Ok(TicketStatus::Closed),
      other => Err(Error::InvalidArgument(format!("unknown status '{}'", other))),
    }
  }
}

/// Sort order for ticket lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
  /// Newest first
  #[default]
  Date,
  /// Alphabetical, case-insensitive
  Title,
}

impl SortBy {
  pub fn as_str(&self) -> &'static str {
    match self {
      SortBy::Date => "date",
      SortBy::Title => "title",
    }
  }

  pub fn toggle(self) -> Self {
    match self {
      SortBy::Date => SortBy::Title,
      SortBy::Title => SortBy::Date,
    }
  }
}

impl FromStr for SortBy {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "date" => Ok(SortBy::Date),
      "title" => Ok(SortBy::Title),
      other => Err(Error::InvalidArgument(format!("unknown sort '{}'", other))),
    }
  }
}

/// A ticket as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
  pub id: String,
  pub title: String,
  pub status: TicketStatus,
  pub created_at: DateTime<Utc>,
  pub description: Option<String>,
  pub read: bool,
}

/// The signed-in user's profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
  pub first_name: String,
  pub last_name: String,
  pub email: Option<String>,
}

impl UserProfile {
  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
  }

  /// Upper-cased first letters of first and last name, `??` if either is blank
  pub fn initials(&self) -> String {
    match (self.first_name.chars().next(), self.last_name.chars().next()) {
      (Some(f), Some(l)) => format!("{}{}", f, l).to_uppercase(),
      _ => "??".to_string(),
    }
  }
}

/// Filter options for ticket list queries.
///
/// Absent fields mean "no constraint". Use [`TicketFilters::normalized`]
/// before comparing or keying on a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketFilters {
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub status: Option<TicketStatus>,
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub search: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub sort_by: Option<SortBy>,
}

impl TicketFilters {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_status(mut self, status: TicketStatus) -> Self {
    self.status = Some(status);
    self
  }

  pub fn with_search(mut self, search: impl Into<String>) -> Self {
    self.search = Some(search.into());
    self
  }

  pub fn with_sort(mut self, sort_by: SortBy) -> Self {
    self.sort_by = Some(sort_by);
    self
  }

  /// Canonical form: search is trimmed, blank search collapses to `None`,
  /// and the default sort is stored as `None`.
  pub fn normalized(&self) -> Self {
    let search = self
      .search
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(String::from);

    Self {
      status: self.status,
      search,
      sort_by: self.sort_by.filter(|s| *s != SortBy::default()),
    }
  }

  /// Whether a ticket satisfies the status and search constraints
  pub fn matches(&self, ticket: &Ticket) -> bool {
    if let Some(status) = self.status {
      if ticket.status != status {
        return false;
      }
    }

    match self.search.as_deref().map(str::trim) {
      Some(term) if !term.is_empty() => {
        let term = term.to_lowercase();
        ticket.title.to_lowercase().contains(&term)
          || ticket
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&term))
      }
      _ => true,
    }
  }

  /// Filter and sort a slice of tickets the way the API would
  pub fn apply(&self, tickets: &[Ticket]) -> Vec<Ticket> {
    let mut result: Vec<Ticket> = tickets.iter().filter(|t| self.matches(t)).cloned().collect();
    sort_tickets(&mut result, self.sort_by.unwrap_or_default());
    result
  }
}

/// Sort tickets in place; ties keep their relative order
pub fn sort_tickets(tickets: &mut [Ticket], sort_by: SortBy) {
  match sort_by {
    SortBy::Date => tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    SortBy::Title => tickets.sort_by_key(|t| t.title.to_lowercase()),
  }
}
