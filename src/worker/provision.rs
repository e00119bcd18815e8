use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use super::{Error, Manifest};
use crate::cache::{CacheStorage, Generation, GenerationName};
use crate::http::Request;
use crate::net::Fetcher;

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
  pub generation: GenerationName,
  /// Number of manifest assets stored
  pub assets: usize,
  /// The installed worker may activate without waiting for clients to reload
  pub skip_waiting: bool,
}

/// Populate a generation with every manifest asset.
///
/// All assets are fetched concurrently and written in one batch, so a
/// single failed fetch (transport failure or non-success status) leaves
/// storage untouched: a failed install never creates its generation.
pub async fn provision<S, F>(
  storage: &Arc<S>,
  fetcher: &F,
  generation: &GenerationName,
  scope: &Url,
  manifest: &Manifest,
) -> Result<InstallOutcome, Error>
where
  S: CacheStorage + ?Sized,
  F: Fetcher + ?Sized,
{
  let fail = |reason: String| Error::Provisioning {
    generation: generation.to_string(),
    reason,
  };

  let urls = manifest.resolve(scope).map_err(|e| fail(e.to_string()))?;
  // The generation only comes into existence with the batch write below
  let cache = Generation::bind(Arc::clone(storage), generation.clone());

  let fetches = urls.into_iter().map(|url| async move {
    let request = Request::get(url);
    match fetcher.fetch(&request).await {
      Ok(response) if response.is_success() => {
        debug!(url = %request.url, size = response.body.len(), "Fetched core asset");
        Ok((request, response))
      }
      Ok(response) => Err(format!("{} returned {}", request.url, response.status)),
      Err(e) => Err(format!("{}: {}", request.url, e)),
    }
  });
  let entries = try_join_all(fetches).await.map_err(fail)?;

  cache.put_all(&entries).await?;
  info!(%generation, assets = entries.len(), "Core assets provisioned");

  Ok(InstallOutcome {
    generation: generation.clone(),
    assets: entries.len(),
    skip_waiting: true,
  })
}
