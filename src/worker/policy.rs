//! Retrieval policy for intercepted requests.
//!
//! Only GET requests are intercepted. Navigations go network-first with an
//! offline fallback to the entry point document; everything else is served
//! stale-while-revalidate. Responses are only ever cached when their status
//! is a success.

use reqwest::Method;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use url::Url;

use super::manifest::{ENTRY_POINT, ROOT};
use super::Error;
use crate::cache::{CacheStorage, CachedResponse, Generation, MatchOptions, Retrieved};
use crate::http::{Request, RequestMode, Response};
use crate::net::Fetcher;

/// How an intercepted request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
  /// Network first, cached entry point when the network is unreachable
  NetworkFirst,
  /// Cached copy now, refreshed copy for the next request
  StaleWhileRevalidate,
}

/// Pick a strategy, or `None` when the request must not be intercepted.
pub fn classify(request: &Request) -> Option<Strategy> {
  if request.method != Method::GET {
    return None;
  }

  if is_navigation(request) {
    Some(Strategy::NetworkFirst)
  } else {
    Some(Strategy::StaleWhileRevalidate)
  }
}

/// A top-level navigation, or a GET that accepts HTML.
pub fn is_navigation(request: &Request) -> bool {
  request.mode == RequestMode::Navigate
    || (request.method == Method::GET
      && request
        .accept()
        .is_some_and(|accept| accept.contains("text/html")))
}

pub struct RetrievalPolicy<S: ?Sized, F: ?Sized> {
  cache: Generation<S>,
  fetcher: Arc<F>,
  entry_point: Request,
  root: Request,
  /// Background revalidations still writing to the cache
  revalidations: Mutex<JoinSet<()>>,
}

impl<S, F> RetrievalPolicy<S, F>
where
  S: CacheStorage + ?Sized + 'static,
  F: Fetcher + ?Sized + 'static,
{
  pub fn new(cache: Generation<S>, fetcher: Arc<F>, scope: &Url) -> Result<Self, Error> {
    Ok(Self {
      cache,
      fetcher,
      entry_point: Request::get(scope.join(ENTRY_POINT)?),
      root: Request::get(scope.join(ROOT)?),
      revalidations: Mutex::new(JoinSet::new()),
    })
  }

  /// Network-first retrieval for navigations.
  ///
  /// Only transport failures fall back to the cache. An error status from a
  /// reachable server is passed through as-is.
  pub async fn navigate(&self, request: &Request) -> Result<Retrieved, Error> {
    match self.fetcher.fetch(request).await {
      Ok(response) => {
        if response.is_success() {
          store(&self.cache, request, &response).await;
        } else {
          debug!(url = %request.url, status = response.status.as_u16(), "Not caching error response");
        }
        Ok(Retrieved::from_network(response))
      }
      Err(e) => {
        warn!(url = %request.url, error = %e, "Navigation failed, trying offline fallback");
        for fallback in [&self.entry_point, &self.root] {
          if let Some(cached) = self.lookup(fallback, MatchOptions::default()).await {
            debug!(url = %request.url, fallback = %fallback.url, "Serving offline fallback");
            return Ok(Retrieved::offline(cached));
          }
        }
        Err(Error::Unresolved {
          url: request.url.to_string(),
        })
      }
    }
  }

  /// Stale-while-revalidate retrieval for subresources.
  ///
  /// The network fetch starts before the cache lookup. A cached copy is
  /// returned without waiting for it; the fetch still refreshes the cache
  /// for the next request.
  pub async fn stale_while_revalidate(&self, request: &Request) -> Result<Retrieved, Error> {
    let fresh = self.revalidate(request.clone());

    if let Some(cached) = self.lookup(request, MatchOptions::ignore_search()).await {
      debug!(url = %request.url, "Serving cached copy while revalidating");
      return Ok(Retrieved::stale(cached));
    }

    match fresh.await {
      Ok(Some(response)) => Ok(Retrieved::from_network(response)),
      Ok(None) | Err(_) => Err(Error::Unresolved {
        url: request.url.to_string(),
      }),
    }
  }

  /// Wait for every in-flight revalidation to finish writing.
  pub async fn settle(&self) {
    let mut pending = {
      let mut set = self
        .revalidations
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
      std::mem::take(&mut *set)
    };

    while let Some(result) = pending.join_next().await {
      if let Err(e) = result {
        warn!(error = %e, "Revalidation task did not complete");
      }
    }
  }

  /// Spawn the network half of stale-while-revalidate.
  ///
  /// Transport failures are swallowed; the receiver then yields `None`.
  fn revalidate(&self, request: Request) -> oneshot::Receiver<Option<Response>> {
    let (tx, rx) = oneshot::channel();
    let cache = self.cache.clone();
    let fetcher = Arc::clone(&self.fetcher);

    let task = async move {
      let fresh = match fetcher.fetch(&request).await {
        Ok(response) => {
          if response.is_success() {
            store(&cache, &request, &response).await;
          } else {
            debug!(url = %request.url, status = response.status.as_u16(), "Not caching error response");
          }
          Some(response)
        }
        Err(e) => {
          debug!(url = %request.url, error = %e, "Revalidation failed");
          None
        }
      };
      // The requester may already have been answered from cache
      let _ = tx.send(fresh);
    };

    let mut set = self
      .revalidations
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    while set.try_join_next().is_some() {}
    set.spawn(task);

    rx
  }

  /// Cache read where a storage failure counts as a miss.
  async fn lookup(&self, request: &Request, options: MatchOptions) -> Option<CachedResponse> {
    match self.cache.match_request(request, options).await {
      Ok(found) => found,
      Err(e) => {
        warn!(url = %request.url, error = %e, "Cache lookup failed, treating as miss");
        None
      }
    }
  }
}

/// Write a response copy; failures are logged and never reach the requester.
async fn store<S>(cache: &Generation<S>, request: &Request, response: &Response)
where
  S: CacheStorage + ?Sized,
{
  match cache.put(request, response).await {
    Ok(()) => debug!(url = %request.url, generation = %cache.name(), "Cached response"),
    Err(e) => warn!(url = %request.url, error = %e, "Failed to cache response"),
  }
}
