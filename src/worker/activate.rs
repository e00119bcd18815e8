use futures::future::join_all;
use tracing::{debug, info, warn};

use super::{Clients, Error};
use crate::cache::{CacheStorage, GenerationName};

/// What an activation did to the stored generations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
  /// Stale generations removed
  pub deleted: Vec<String>,
  /// Stale generations that could not be removed, with the reason.
  /// They stay behind until the next activation.
  pub failed: Vec<(String, String)>,
}

/// Delete every generation except `current`, record it as the activated
/// one, then claim open clients.
///
/// Deletions run concurrently and fail independently; a failed deletion
/// never keeps the others, or the claim, from happening.
pub async fn activate<S>(
  storage: &S,
  clients: &dyn Clients,
  current: &GenerationName,
) -> Result<ActivationReport, Error>
where
  S: CacheStorage + ?Sized,
{
  let names = storage.keys().await?;

  let deletions = names
    .into_iter()
    .filter(|name| !current.matches(name))
    .map(|name| async move {
      let result = storage.delete(&name).await;
      (name, result)
    });

  let mut report = ActivationReport::default();
  for (name, result) in join_all(deletions).await {
    match result {
      Ok(true) => {
        info!(generation = %name, "Deleted stale generation");
        report.deleted.push(name);
      }
      Ok(false) => debug!(generation = %name, "Stale generation already gone"),
      Err(e) => {
        warn!(generation = %name, error = %e, "Failed to delete stale generation");
        report.failed.push((name, e.to_string()));
      }
    }
  }

  storage.mark_activated(current.as_str()).await?;
  clients.claim(current).await;
  Ok(report)
}
