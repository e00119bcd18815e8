//! Core types shared by the storage backends and the retrieval policy.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::http::Response;

/// Options for a cache lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
  /// Ignore the query string of both the stored and the requested URL
  pub ignore_search: bool,
}

impl MatchOptions {
  pub fn ignore_search() -> Self {
    Self {
      ignore_search: true,
    }
  }
}

/// A response read back from a cache generation.
#[derive(Debug, Clone)]
pub struct CachedResponse {
  pub response: Response,
  /// When the entry was last written
  pub cached_at: DateTime<Utc>,
}

/// Listing information for one stored entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySummary {
  pub method: String,
  pub url: String,
  pub status: u16,
  pub size: usize,
  /// Hex SHA-256 of the body
  pub digest: String,
  pub cached_at: DateTime<Utc>,
}

/// Result of a retrieval, including where the response came from.
#[derive(Debug, Clone)]
pub struct Retrieved {
  /// The actual response
  pub response: Response,
  /// Where the response came from
  pub source: ResponseSource,
  /// When the response was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl Retrieved {
  /// A live response straight from the network.
  pub fn from_network(response: Response) -> Self {
    Self {
      response,
      source: ResponseSource::Network,
      cached_at: None,
    }
  }

  /// A cached copy served while a revalidation runs in the background.
  pub fn stale(cached: CachedResponse) -> Self {
    Self {
      response: cached.response,
      source: ResponseSource::CacheStale,
      cached_at: Some(cached.cached_at),
    }
  }

  /// A cached document served because the network was unreachable.
  pub fn offline(cached: CachedResponse) -> Self {
    Self {
      response: cached.response,
      source: ResponseSource::Offline,
      cached_at: Some(cached.cached_at),
    }
  }
}

/// Indicates where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
  /// Fresh data from network
  Network,
  /// Cached copy, possibly outdated, revalidation in flight
  CacheStale,
  /// Network unreachable, serving an offline fallback
  Offline,
}

impl ResponseSource {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Network => "network",
      Self::CacheStale => "cache",
      Self::Offline => "offline",
    }
  }
}

/// Hex SHA-256 of a response body.
pub fn body_digest(body: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(body);
  hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_body_digest_of_empty_body() {
    assert_eq!(
      body_digest(b""),
      "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
  }

  #[test]
  fn test_source_labels() {
    assert_eq!(ResponseSource::Network.as_str(), "network");
    assert_eq!(ResponseSource::CacheStale.as_str(), "cache");
    assert_eq!(ResponseSource::Offline.as_str(), "offline");
  }
}
