//! Scripted collaborators for exercising the worker without a network.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::{Method, StatusCode};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::cache::{CacheStorage, CachedResponse, EntrySummary, MatchOptions, MemoryStorage};
use crate::http::{Request, Response};
use crate::net::{FetchError, Fetcher};

#[derive(Clone)]
enum Outcome {
  Respond(Response),
  Fail,
  Hang,
}

/// Fetcher answering from a fixed script, keyed by full URL.
/// Unscripted URLs fail as if the network were down.
#[derive(Default)]
pub struct ScriptedFetcher {
  routes: Mutex<HashMap<String, Outcome>>,
  calls: Mutex<Vec<(Method, String)>>,
  offline: AtomicBool,
}

impl ScriptedFetcher {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn respond(&self, url: &str, status: u16, body: &str) {
    let status = StatusCode::from_u16(status).unwrap();
    self.script(url, Outcome::Respond(Response::new(status, body)));
  }

  pub fn fail(&self, url: &str) {
    self.script(url, Outcome::Fail);
  }

  /// The fetch for this URL never resolves.
  pub fn hang(&self, url: &str) {
    self.script(url, Outcome::Hang);
  }

  /// Fail every request regardless of the script.
  pub fn set_offline(&self, offline: bool) {
    self.offline.store(offline, Ordering::SeqCst);
  }

  pub fn calls(&self) -> Vec<(Method, String)> {
    self.calls.lock().unwrap().clone()
  }

  fn script(&self, url: &str, outcome: Outcome) {
    self.routes.lock().unwrap().insert(url.to_string(), outcome);
  }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
  async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
    self
      .calls
      .lock()
      .unwrap()
      .push((request.method.clone(), request.url.to_string()));

    if self.offline.load(Ordering::SeqCst) {
      return Err(FetchError::Unreachable(request.url.to_string()));
    }

    let outcome = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
    match outcome {
      Some(Outcome::Respond(response)) => Ok(response),
      Some(Outcome::Hang) => std::future::pending().await,
      Some(Outcome::Fail) | None => Err(FetchError::Unreachable(request.url.to_string())),
    }
  }
}

/// Memory storage that counts reads and writes and can refuse deletions.
#[derive(Default)]
pub struct InstrumentedStorage {
  inner: MemoryStorage,
  reads: AtomicUsize,
  writes: AtomicUsize,
  undeletable: Mutex<HashSet<String>>,
}

impl InstrumentedStorage {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn reads(&self) -> usize {
    self.reads.load(Ordering::SeqCst)
  }

  pub fn writes(&self) -> usize {
    self.writes.load(Ordering::SeqCst)
  }

  pub fn refuse_delete(&self, name: &str) {
    self.undeletable.lock().unwrap().insert(name.to_string());
  }
}

#[async_trait]
impl CacheStorage for InstrumentedStorage {
  async fn open(&self, name: &str) -> Result<()> {
    self.inner.open(name).await
  }

  async fn keys(&self) -> Result<Vec<String>> {
    self.inner.keys().await
  }

  async fn delete(&self, name: &str) -> Result<bool> {
    if self.undeletable.lock().unwrap().contains(name) {
      return Err(eyre!("generation {} is locked", name));
    }
    self.inner.delete(name).await
  }

  async fn match_request(
    &self,
    name: &str,
    request: &Request,
    options: MatchOptions,
  ) -> Result<Option<CachedResponse>> {
    self.reads.fetch_add(1, Ordering::SeqCst);
    self.inner.match_request(name, request, options).await
  }

  async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<()> {
    self.writes.fetch_add(1, Ordering::SeqCst);
    self.inner.put(name, request, response).await
  }

  async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<()> {
    self.writes.fetch_add(1, Ordering::SeqCst);
    self.inner.put_all(name, entries).await
  }

  async fn entries(&self, name: &str) -> Result<Vec<EntrySummary>> {
    self.inner.entries(name).await
  }

  async fn mark_activated(&self, name: &str) -> Result<()> {
    self.inner.mark_activated(name).await
  }

  async fn activated(&self) -> Result<Option<String>> {
    self.inner.activated().await
  }
}
