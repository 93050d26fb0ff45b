//! Serde types matching the REST backend's JSON.
//!
//! Kept apart from the domain types so the wire format (camelCase, string
//! statuses and timestamps) does not leak into the rest of the app.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{Ticket, TicketStatus, UserProfile};
use crate::error::{Error, Result};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTicket {
  pub id: String,
  pub title: String,
  pub status: String,
  pub created_at: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub read: bool,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUserProfile {
  pub first_name: String,
  pub last_name: String,
  #[serde(default)]
  pub email: Option<String>,
}

impl TryFrom<ApiTicket> for Ticket {
  type Error = Error;

  fn try_from(t: ApiTicket) -> Result<Self> {
    let status: TicketStatus = t
      .status
      .parse()
      .map_err(|_| Error::Network(format!("ticket {} has unknown status '{}'", t.id, t.status)))?;

    let created_at = DateTime::parse_from_rfc3339(&t.created_at)
      .map(|dt| dt.with_timezone(&Utc))
      .map_err(|e| Error::Network(format!("ticket {} has bad createdAt: {}", t.id, e)))?;

    Ok(Ticket {
      id: t.id,
      title: t.title,
      status,
      created_at,
      // Blank descriptions render the same as missing ones
      description: t.description.filter(|d| !d.trim().is_empty()),
      read: t.read,
    })
  }
}

impl From<ApiUserProfile> for UserProfile {
  fn from(p: ApiUserProfile) -> Self {
    UserProfile {
      first_name: p.first_name,
      last_name: p.last_name,
      email: p.email,
    }
  }
}
