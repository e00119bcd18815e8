use thiserror::Error;

use super::WorkerState;
use crate::net::FetchError;

#[derive(Error, Debug)]
pub enum Error {
  #[error("Provisioning {generation} failed: {reason}")]
  Provisioning { generation: String, reason: String },

  #[error("No activated generation to resume (configured: {generation}); run activate first")]
  NotActivated { generation: String },

  #[error("No response available for {url}")]
  Unresolved { url: String },

  #[error("Cannot {action} while the worker is {state}")]
  InvalidState {
    action: &'static str,
    state: WorkerState,
  },

  #[error("Request to {url} failed: {source}")]
  Transport {
    url: String,
    #[source]
    source: FetchError,
  },

  #[error("Cache storage error: {0}")]
  Storage(color_eyre::Report),

  #[error("Invalid URL: {0}")]
  Url(#[from] url::ParseError),
}

impl From<color_eyre::Report> for Error {
  fn from(report: color_eyre::Report) -> Self {
    Error::Storage(report)
  }
}
