//! Generation naming and a handle bound to one generation.

use color_eyre::Result;
use std::fmt;
use std::sync::Arc;

use super::storage::CacheStorage;
use super::traits::{CachedResponse, MatchOptions};
use crate::http::{Request, Response};

/// Name of a cache generation: `<app>-v<version>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenerationName(String);

impl GenerationName {
  pub fn new(app_name: &str, version: &str) -> Self {
    Self(format!("{}-v{}", app_name, version))
  }

  /// Wrap a name read back from storage.
  pub fn from_stored(name: String) -> Self {
    Self(name)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Whether a stored generation name is this one.
  pub fn matches(&self, name: &str) -> bool {
    self.0 == name
  }
}

impl fmt::Display for GenerationName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A storage handle bound to a single generation.
pub struct Generation<S: ?Sized> {
  storage: Arc<S>,
  name: GenerationName,
}

impl<S: CacheStorage + ?Sized> Generation<S> {
  /// Bind to a generation without touching storage.
  pub fn bind(storage: Arc<S>, name: GenerationName) -> Self {
    Self { storage, name }
  }

  pub fn name(&self) -> &GenerationName {
    &self.name
  }

  pub async fn match_request(
    &self,
    request: &Request,
    options: MatchOptions,
  ) -> Result<Option<CachedResponse>> {
    self
      .storage
      .match_request(self.name.as_str(), request, options)
      .await
  }

  pub async fn put(&self, request: &Request, response: &Response) -> Result<()> {
    self.storage.put(self.name.as_str(), request, response).await
  }

  pub async fn put_all(&self, entries: &[(Request, Response)]) -> Result<()> {
    self.storage.put_all(self.name.as_str(), entries).await
  }
}

impl<S: ?Sized> Clone for Generation<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      name: self.name.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStorage;

  #[test]
  fn test_generation_name_embeds_version() {
    let name = GenerationName::new("poop-diary-pwa", "1");
    assert_eq!(name.as_str(), "poop-diary-pwa-v1");
    assert!(name.matches("poop-diary-pwa-v1"));
    assert!(!name.matches("poop-diary-pwa-v2"));
  }

  #[tokio::test]
  async fn test_bound_generation_writes_under_its_name() {
    let storage = Arc::new(MemoryStorage::new());
    let generation = Generation::bind(storage.clone(), GenerationName::new("app", "3"));
    assert!(storage.keys().await.unwrap().is_empty());

    let request = Request::get(url::Url::parse("http://app.test/").unwrap());
    generation
      .put(&request, &Response::new(reqwest::StatusCode::OK, "root"))
      .await
      .unwrap();

    assert_eq!(generation.name().as_str(), "app-v3");
    assert_eq!(storage.keys().await.unwrap(), vec!["app-v3"]);
  }
}
