//! Error taxonomy shared by the fetch client, key factory and query cache.

/// Errors that can end up in a cache entry or come out of key construction.
///
/// Entries hold on to their last error, so this is `Clone` and carries
/// plain strings instead of source errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
  /// The request never produced a usable response
  #[error("network error: {0}")]
  Network(String),
  /// A detail fetch for an id the API does not know
  #[error("not found: {0}")]
  NotFound(String),
  /// A malformed argument, e.g. an empty ticket id or an unknown route
  #[error("invalid argument: {0}")]
  InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
  fn from(e: reqwest::Error) -> Self {
    Error::Network(e.to_string())
  }
}

impl From<url::ParseError> for Error {
  fn from(e: url::ParseError) -> Self {
    Error::InvalidArgument(e.to_string())
  }
}
