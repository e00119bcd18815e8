//! Local HTTP proxy that answers browser requests through the worker.
//!
//! Every incoming path is mapped beneath the configured scope. Responses
//! carry `x-pwacache-source` (network, cache or offline) and
//! `x-pwacache-generation` naming the generation in control. Answers from
//! the cache add `x-pwacache-cached-at` with the RFC 3339 store time.

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{
  ACCEPT_ENCODING, CONNECTION, CONTENT_LENGTH, HOST, TE, TRANSFER_ENCODING, UPGRADE,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use color_eyre::{eyre::eyre, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use url::Url;

use crate::cache::{CacheStorage, GenerationName, Retrieved};
use crate::http::{Request, RequestMode};
use crate::net::Fetcher;
use crate::worker::{ControlledClients, Error, Worker};

/// Largest request body forwarded on passthrough.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

const SOURCE_HEADER: &str = "x-pwacache-source";
const GENERATION_HEADER: &str = "x-pwacache-generation";
const CACHED_AT_HEADER: &str = "x-pwacache-cached-at";
const FETCH_MODE_HEADER: &str = "sec-fetch-mode";

pub type ProxyWorker = Worker<dyn CacheStorage, dyn Fetcher>;

#[derive(Clone)]
pub struct ProxyState {
  pub worker: Arc<ProxyWorker>,
  pub clients: Arc<ControlledClients>,
  pub scope: Url,
}

pub fn router(state: ProxyState) -> Router {
  Router::new()
    .fallback(proxy)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// Serve until Ctrl-C, then let pending revalidations finish.
pub async fn serve(addr: SocketAddr, state: ProxyState) -> Result<()> {
  let listener = TcpListener::bind(addr)
    .await
    .map_err(|e| eyre!("Failed to bind {}: {}", addr, e))?;
  info!(%addr, scope = %state.scope, "Proxy listening");

  let worker = Arc::clone(&state.worker);
  axum::serve(listener, router(state))
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| eyre!("Proxy server failed: {}", e))?;

  worker.settle().await;
  Ok(())
}

async fn shutdown_signal() {
  if tokio::signal::ctrl_c().await.is_ok() {
    info!("Shutting down");
  }
}

async fn proxy(State(state): State<ProxyState>, request: axum::extract::Request) -> Response {
  let request = match into_worker_request(&state.scope, request).await {
    Ok(request) => request,
    Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
  };

  match state.worker.handle_fetch(request).await {
    Ok(retrieved) => into_http_response(retrieved, state.clients.controller()),
    Err(e @ (Error::Unresolved { .. } | Error::Transport { .. })) => {
      (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
    }
    Err(e) => {
      error!(error = %e, "Worker failed to handle request");
      (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
    }
  }
}

async fn into_worker_request(scope: &Url, request: axum::extract::Request) -> Result<Request> {
  let (parts, body) = request.into_parts();

  let path = parts
    .uri
    .path_and_query()
    .map(|pq| pq.as_str())
    .unwrap_or("/");
  let url = scope
    .join(path.trim_start_matches('/'))
    .map_err(|e| eyre!("Invalid request path {}: {}", path, e))?;

  let mode = parts
    .headers
    .get(FETCH_MODE_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(RequestMode::from_fetch_mode)
    .unwrap_or_default();

  let mut headers = parts.headers;
  strip_hop_by_hop(&mut headers);
  // reqwest negotiates and decodes compression itself
  headers.remove(ACCEPT_ENCODING);

  let mut forwarded = Request::new(parts.method.clone(), url).with_mode(mode);
  forwarded.headers = headers;

  if parts.method != Method::GET && parts.method != Method::HEAD {
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
      .await
      .map_err(|e| eyre!("Failed to read request body: {}", e))?;
    forwarded = forwarded.with_body(bytes.to_vec());
  }

  Ok(forwarded)
}

fn into_http_response(retrieved: Retrieved, controller: Option<GenerationName>) -> Response {
  let response = retrieved.response;

  let mut headers = response.headers;
  strip_hop_by_hop(&mut headers);
  headers.remove(CONTENT_LENGTH);
  headers.insert(SOURCE_HEADER, HeaderValue::from_static(retrieved.source.as_str()));
  if let Some(value) = controller.and_then(|g| HeaderValue::from_str(g.as_str()).ok()) {
    headers.insert(GENERATION_HEADER, value);
  }
  if let Some(value) = retrieved
    .cached_at
    .and_then(|at| HeaderValue::from_str(&at.to_rfc3339()).ok())
  {
    headers.insert(CACHED_AT_HEADER, value);
  }

  (response.status, headers, Body::from(response.body)).into_response()
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
  for name in [HOST, CONNECTION, TRANSFER_ENCODING, TE, UPGRADE] {
    headers.remove(name);
  }
  headers.remove("keep-alive");
  headers.remove("proxy-connection");
}
