//! The caching worker and its lifecycle.
//!
//! A worker moves through `install` → `activate` → `handle_fetch`:
//! - Install provisions the core asset manifest into the worker's generation
//! - Activate deletes every other generation and claims open clients
//! - Fetch handling applies the retrieval policy to intercepted requests
//!
//! Triggers arriving out of order are rejected with `Error::InvalidState`.

mod activate;
mod clients;
mod error;
mod manifest;
mod policy;
mod provision;

#[cfg(test)]
pub mod testing;

pub use activate::ActivationReport;
pub use clients::{Clients, ControlledClients};
pub use error::Error;
pub use manifest::{Manifest, CORE_ASSETS};
pub use policy::{classify, Strategy};
pub use provision::InstallOutcome;

use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::cache::{CacheStorage, Generation, GenerationName, Retrieved};
use crate::http::Request;
use crate::net::Fetcher;
use policy::RetrievalPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
  Parsed,
  Installing,
  Installed,
  Activating,
  Activated,
  /// Install failed; this worker will never serve
  Redundant,
}

impl fmt::Display for WorkerState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Parsed => "parsed",
      Self::Installing => "installing",
      Self::Installed => "installed",
      Self::Activating => "activating",
      Self::Activated => "activated",
      Self::Redundant => "redundant",
    };
    f.write_str(name)
  }
}

/// Everything a worker needs from its host.
pub struct WorkerContext<S: ?Sized, F: ?Sized> {
  pub storage: Arc<S>,
  pub fetcher: Arc<F>,
  pub clients: Arc<dyn Clients>,
  /// The generation this worker provisions and serves from
  pub generation: GenerationName,
  /// Base URL the manifest and fallbacks resolve against
  pub scope: Url,
  pub manifest: Manifest,
}

pub struct Worker<S: ?Sized, F: ?Sized> {
  ctx: WorkerContext<S, F>,
  state: WorkerState,
  policy: RetrievalPolicy<S, F>,
}

impl<S, F> Worker<S, F>
where
  S: CacheStorage + ?Sized + 'static,
  F: Fetcher + ?Sized + 'static,
{
  pub fn new(ctx: WorkerContext<S, F>) -> Result<Self, Error> {
    let cache = Generation::bind(Arc::clone(&ctx.storage), ctx.generation.clone());
    let policy = RetrievalPolicy::new(cache, Arc::clone(&ctx.fetcher), &ctx.scope)?;

    Ok(Self {
      ctx,
      state: WorkerState::Parsed,
      policy,
    })
  }

  /// Take over the generation a previous run activated.
  ///
  /// The activated generation wins over `ctx.generation`: a newer version
  /// that was only installed keeps waiting until it is activated.
  pub async fn resume(mut ctx: WorkerContext<S, F>) -> Result<Self, Error> {
    let Some(active) = ctx.storage.activated().await? else {
      return Err(Error::NotActivated {
        generation: ctx.generation.to_string(),
      });
    };

    if !ctx.generation.matches(&active) {
      info!(configured = %ctx.generation, %active, "Configured generation is not active");
      ctx.generation = GenerationName::from_stored(active);
    }

    let mut worker = Self::new(ctx)?;
    worker.ctx.clients.claim(&worker.ctx.generation).await;
    worker.state = WorkerState::Activated;
    info!(generation = %worker.ctx.generation, "Resumed active worker");
    Ok(worker)
  }

  /// Install and activate `ctx.generation`, or keep serving the previously
  /// activated generation when that fails (e.g. starting offline).
  pub async fn launch(ctx: WorkerContext<S, F>) -> Result<Self, Error> {
    let mut worker = Self::new(ctx)?;

    let failure = match worker.install().await {
      Ok(outcome) if outcome.skip_waiting => match worker.activate().await {
        Ok(_) => return Ok(worker),
        Err(e) => e,
      },
      Ok(outcome) => {
        info!(generation = %outcome.generation, "Installed worker is waiting");
        return Self::resume(worker.ctx).await;
      }
      Err(e) => e,
    };

    warn!(
      generation = %worker.ctx.generation,
      error = %failure,
      "Falling back to the active generation"
    );
    match Self::resume(worker.ctx).await {
      Err(Error::NotActivated { .. }) => Err(failure),
      resumed => resumed,
    }
  }

  pub fn state(&self) -> WorkerState {
    self.state
  }

  pub fn generation(&self) -> &GenerationName {
    &self.ctx.generation
  }

  /// Install lifecycle step: provision the core asset manifest.
  ///
  /// A failure leaves the worker redundant; it must not be activated.
  pub async fn install(&mut self) -> Result<InstallOutcome, Error> {
    self.expect_state("install", WorkerState::Parsed)?;
    self.state = WorkerState::Installing;
    info!(
      generation = %self.ctx.generation,
      assets = self.ctx.manifest.len(),
      "Installing"
    );

    let result = provision::provision(
      &self.ctx.storage,
      self.ctx.fetcher.as_ref(),
      &self.ctx.generation,
      &self.ctx.scope,
      &self.ctx.manifest,
    )
    .await;

    match result {
      Ok(outcome) => {
        self.state = WorkerState::Installed;
        Ok(outcome)
      }
      Err(e) => {
        self.state = WorkerState::Redundant;
        error!(generation = %self.ctx.generation, error = %e, "Install failed");
        Err(e)
      }
    }
  }

  /// Activate lifecycle step: drop stale generations and claim clients.
  ///
  /// If the generations cannot even be listed the worker stays installed
  /// and activation may be retried.
  pub async fn activate(&mut self) -> Result<ActivationReport, Error> {
    self.expect_state("activate", WorkerState::Installed)?;
    self.state = WorkerState::Activating;

    let result = activate::activate(
      self.ctx.storage.as_ref(),
      self.ctx.clients.as_ref(),
      &self.ctx.generation,
    )
    .await;

    match result {
      Ok(report) => {
        self.state = WorkerState::Activated;
        info!(
          generation = %self.ctx.generation,
          deleted = report.deleted.len(),
          failed = report.failed.len(),
          "Activated"
        );
        Ok(report)
      }
      Err(e) => {
        self.state = WorkerState::Installed;
        error!(generation = %self.ctx.generation, error = %e, "Activation failed");
        Err(e)
      }
    }
  }

  /// Fetch lifecycle step: answer one outbound request.
  ///
  /// Non-GET requests go straight to the network with no cache access.
  pub async fn handle_fetch(&self, request: Request) -> Result<Retrieved, Error> {
    self.expect_state("handle fetch", WorkerState::Activated)?;

    match classify(&request) {
      None => {
        debug!(method = %request.method, url = %request.url, "Passing through");
        self
          .ctx
          .fetcher
          .fetch(&request)
          .await
          .map(Retrieved::from_network)
          .map_err(|source| Error::Transport {
            url: request.url.to_string(),
            source,
          })
      }
      Some(Strategy::NetworkFirst) => self.policy.navigate(&request).await,
      Some(Strategy::StaleWhileRevalidate) => self.policy.stale_while_revalidate(&request).await,
    }
  }

  /// Wait until background revalidations have written their results.
  pub async fn settle(&self) {
    self.policy.settle().await;
  }

  fn expect_state(&self, action: &'static str, expected: WorkerState) -> Result<(), Error> {
    if self.state == expected {
      Ok(())
    } else {
      Err(Error::InvalidState {
        action,
        state: self.state,
      })
    }
  }
}
