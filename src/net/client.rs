use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{CONNECTION, HOST, TRANSFER_ENCODING};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::http::{Request, Response};

/// A failure to complete the network exchange at all.
///
/// Error statuses are not failures: they come back as a `Response`.
#[derive(Debug, Error)]
pub enum FetchError {
  #[error("network error: {0}")]
  Network(#[from] reqwest::Error),

  #[error("network unreachable: {0}")]
  Unreachable(String),
}

/// The network fetch primitive.
#[async_trait]
pub trait Fetcher: Send + Sync {
  async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// Fetcher backed by a shared reqwest client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpFetcher {
  client: Client,
}

impl HttpFetcher {
  /// Create a fetcher. Without a timeout, requests run until the transport gives up.
  pub fn new(timeout: Option<Duration>) -> Result<Self> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }

    let client = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

#[async_trait]
impl Fetcher for HttpFetcher {
  async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
    let mut headers = request.headers.clone();
    for name in [HOST, CONNECTION, TRANSFER_ENCODING] {
      headers.remove(name);
    }

    let mut builder = self
      .client
      .request(request.method.clone(), request.url.clone())
      .headers(headers);
    if let Some(ref body) = request.body {
      builder = builder.body(body.clone());
    }

    let response = builder.send().await?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    debug!(method = %request.method, url = %request.url, status = status.as_u16(), "Fetched");

    Ok(Response {
      status,
      headers,
      body,
    })
  }
}
