use async_trait::async_trait;
use std::sync::RwLock;
use tracing::info;

use crate::cache::GenerationName;

/// The client-claiming primitive: puts already-open pages under the
/// control of the active worker without a reload.
#[async_trait]
pub trait Clients: Send + Sync {
  async fn claim(&self, generation: &GenerationName);
}

/// Tracks which generation controls the pages served by this process.
#[derive(Default)]
pub struct ControlledClients {
  controller: RwLock<Option<GenerationName>>,
}

impl ControlledClients {
  pub fn new() -> Self {
    Self::default()
  }

  /// The generation currently in control, if any worker has claimed.
  pub fn controller(&self) -> Option<GenerationName> {
    self
      .controller
      .read()
      .map(|guard| guard.clone())
      .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
  }
}

#[async_trait]
impl Clients for ControlledClients {
  async fn claim(&self, generation: &GenerationName) {
    let mut guard = self
      .controller
      .write()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(previous) = guard.replace(generation.clone()) {
      info!(%previous, current = %generation, "Clients claimed from previous worker");
    } else {
      info!(current = %generation, "Clients claimed");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_claim_replaces_controller() {
    let clients = ControlledClients::new();
    assert_eq!(clients.controller(), None);

    clients.claim(&GenerationName::new("app", "1")).await;
    clients.claim(&GenerationName::new("app", "2")).await;
    assert_eq!(clients.controller(), Some(GenerationName::new("app", "2")));
  }
}
