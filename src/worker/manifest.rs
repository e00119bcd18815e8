//! The fixed list of core assets provisioned at install time.

use std::collections::HashSet;
use url::Url;

/// Entry point document, served first when a navigation is offline.
pub const ENTRY_POINT: &str = "./index.html";

/// Scope root, the second offline fallback.
pub const ROOT: &str = "./";

/// Core assets every install must store before the app can run offline.
pub const CORE_ASSETS: &[&str] = &[
  "./",
  "./index.html",
  "./manifest.json",
  "./service-worker.js",
  "./icons/icon-192.png",
  "./icons/icon-512.png",
  "./icons/apple-touch-icon.png",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
  paths: Vec<String>,
}

impl Default for Manifest {
  fn default() -> Self {
    Self::new(CORE_ASSETS.iter().map(|p| p.to_string()).collect())
  }
}

impl Manifest {
  pub fn new(paths: Vec<String>) -> Self {
    Self { paths }
  }

  pub fn len(&self) -> usize {
    self.paths.len()
  }

  pub fn is_empty(&self) -> bool {
    self.paths.is_empty()
  }

  /// Resolve every path against the scope, in manifest order.
  ///
  /// Two paths resolving to the same URL is an error: a batch write
  /// cannot hold the same identity twice.
  pub fn resolve(&self, scope: &Url) -> Result<Vec<Url>, ManifestError> {
    let mut seen = HashSet::new();
    let mut urls = Vec::with_capacity(self.paths.len());

    for path in &self.paths {
      let url = scope
        .join(path)
        .map_err(|e| ManifestError::InvalidPath(path.clone(), e))?;
      if !seen.insert(url.clone()) {
        return Err(ManifestError::Duplicate(url.to_string()));
      }
      urls.push(url);
    }

    Ok(urls)
  }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
  #[error("invalid manifest path {0}: {1}")]
  InvalidPath(String, url::ParseError),
  #[error("manifest lists {0} more than once")]
  Duplicate(String),
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scope() -> Url {
    Url::parse("https://diary.example/app/").unwrap()
  }

  #[test]
  fn test_default_manifest_resolves_in_order() {
    let urls = Manifest::default().resolve(&scope()).unwrap();
    assert_eq!(urls.len(), CORE_ASSETS.len());
    assert_eq!(urls[0].as_str(), "https://diary.example/app/");
    assert_eq!(urls[1].as_str(), "https://diary.example/app/index.html");
    assert_eq!(
      urls[6].as_str(),
      "https://diary.example/app/icons/apple-touch-icon.png"
    );
  }

  #[test]
  fn test_duplicate_paths_are_rejected() {
    let manifest = Manifest::new(vec!["./a.js".into(), "a.js".into()]);
    let err = manifest.resolve(&scope()).unwrap_err();
    assert!(matches!(err, ManifestError::Duplicate(_)));
  }

  #[test]
  fn test_empty_manifest() {
    let manifest = Manifest::new(Vec::new());
    assert!(manifest.is_empty());
    assert!(manifest.resolve(&scope()).unwrap().is_empty());
  }
}
