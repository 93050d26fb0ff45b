use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use super::types::{Ticket, TicketFilters, UserProfile};
use super::wire::{ApiTicket, ApiUserProfile};
use super::TicketApi;
use crate::error::{Error, Result};

/// REST client for the ticket backend
#[derive(Clone)]
pub struct HttpApi {
  client: reqwest::Client,
  base: Url,
}

impl HttpApi {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
    let base = Url::parse(base_url)?;
    if base.cannot_be_a_base() {
      return Err(Error::InvalidArgument(format!(
        "API URL cannot be used as a base: {}",
        base_url
      )));
    }

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(concat!("tix/", env!("CARGO_PKG_VERSION")))
      .build()?;

    Ok(Self { client, base })
  }

  /// Base URL with `segments` appended as escaped path segments
  fn endpoint(&self, segments: &[&str]) -> Result<Url> {
    let mut url = self.base.clone();
    url
      .path_segments_mut()
      .map_err(|_| Error::InvalidArgument(format!("bad API URL {}", self.base)))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  fn tickets_url(&self, filters: &TicketFilters) -> Result<Url> {
    let mut url = self.endpoint(&["tickets"])?;
    let filters = filters.normalized();

    let mut pairs: Vec<(&str, &str)> = Vec::new();
    if let Some(status) = filters.status {
      pairs.push(("status", status.as_str()));
    }
    if let Some(search) = filters.search.as_deref() {
      pairs.push(("search", search));
    }
    if let Some(sort_by) = filters.sort_by {
      pairs.push(("sortBy", sort_by.as_str()));
    }
    if !pairs.is_empty() {
      url.query_pairs_mut().extend_pairs(pairs);
    }
    Ok(url)
  }

  async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T> {
    tracing::debug!(%url, "GET");
    let response = self.client.get(url.clone()).send().await?;
    check_status(response.status(), &url, what)?;
    response
      .json()
      .await
      .map_err(|e| Error::Network(format!("failed to parse {}: {}", what, e)))
  }
}

fn check_status(status: StatusCode, url: &Url, what: &str) -> Result<()> {
  if status == StatusCode::NOT_FOUND {
    return Err(Error::NotFound(what.to_string()));
  }
  if !status.is_success() {
    return Err(Error::Network(format!("{} returned {}", url, status)));
  }
  Ok(())
}

#[async_trait]
impl TicketApi for HttpApi {
  async fn fetch_tickets(&self, filters: &TicketFilters) -> Result<Vec<Ticket>> {
    let url = self.tickets_url(filters)?;
    let tickets: Vec<ApiTicket> = self.get_json(url, "tickets").await?;
    tickets.into_iter().map(Ticket::try_from).collect()
  }

  async fn fetch_ticket(&self, id: &str) -> Result<Ticket> {
    let url = self.endpoint(&["tickets", id])?;
    let ticket: ApiTicket = self.get_json(url, &format!("ticket {}", id)).await?;
    Ticket::try_from(ticket)
  }

  async fn fetch_user_profile(&self) -> Result<UserProfile> {
    let url = self.endpoint(&["user", "profile"])?;
    let profile: ApiUserProfile = self.get_json(url, "user profile").await?;
    Ok(profile.into())
  }

  async fn mark_read(&self, id: &str) -> Result<()> {
    let url = self.endpoint(&["tickets", id, "read"])?;
    tracing::debug!(%url, "POST");
    let response = self.client.post(url.clone()).send().await?;
    check_status(response.status(), &url, &format!("ticket {}", id))
  }

  fn source(&self) -> String {
    self.base.host_str().unwrap_or(self.base.as_str()).to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::{SortBy, TicketStatus};

  fn api(base: &str) -> HttpApi {
    HttpApi::new(base, Duration::from_secs(5)).unwrap()
  }

  #[test]
  fn test_endpoint_with_and_without_trailing_slash() {
    assert_eq!(
      api("http://localhost:3000/api/")
        .endpoint(&["tickets", "1"])
        .unwrap()
        .as_str(),
      "http://localhost:3000/api/tickets/1"
    );
    assert_eq!(
      api("http://localhost:3000/api")
        .endpoint(&["user", "profile"])
        .unwrap()
        .as_str(),
      "http://localhost:3000/api/user/profile"
    );
  }

  #[test]
  fn test_ticket_id_is_escaped() {
    let url = api("http://localhost/").endpoint(&["tickets", "a/b"]).unwrap();
    assert_eq!(url.as_str(), "http://localhost/tickets/a%2Fb");
  }

  #[test]
  fn test_tickets_url_query() {
    let api = api("http://localhost/");
    assert_eq!(
      api.tickets_url(&TicketFilters::new()).unwrap().as_str(),
      "http://localhost/tickets"
    );

    let filters = TicketFilters::new()
      .with_status(TicketStatus::InProgress)
      .with_search(" login bug ")
      .with_sort(SortBy::Title);
    assert_eq!(
      api.tickets_url(&filters).unwrap().as_str(),
      "http://localhost/tickets?status=in-progress&search=login+bug&sortBy=title"
    );
  }

  #[test]
  fn test_check_status() {
    let url = Url::parse("http://localhost/tickets/1").unwrap();
    assert_eq!(
      check_status(StatusCode::NOT_FOUND, &url, "ticket 1"),
      Err(Error::NotFound("ticket 1".to_string()))
    );
    assert!(matches!(
      check_status(StatusCode::INTERNAL_SERVER_ERROR, &url, "ticket 1"),
      Err(Error::Network(_))
    ));
    assert!(check_status(StatusCode::OK, &url, "ticket 1").is_ok());
  }

  #[test]
  fn test_rejects_non_base_url() {
    assert!(HttpApi::new("mailto:someone@example.com", Duration::from_secs(1)).is_err());
    assert!(HttpApi::new("not a url", Duration::from_secs(1)).is_err());
  }

  #[test]
  fn test_source_is_host() {
    assert_eq!(api("https://tickets.example.com/api").source(), "tickets.example.com");
  }
}
