//! Request and response snapshots exchanged between the host, the cache and the network.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{Method, StatusCode};
use url::Url;

/// How the host issued a request, mirroring the browser's fetch modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestMode {
  /// Top-level page navigation
  Navigate,
  SameOrigin,
  #[default]
  NoCors,
  Cors,
}

impl RequestMode {
  /// Map a `Sec-Fetch-Mode` header value onto a mode.
  pub fn from_fetch_mode(value: &str) -> Self {
    match value.trim().to_ascii_lowercase().as_str() {
      "navigate" => Self::Navigate,
      "same-origin" => Self::SameOrigin,
      "cors" => Self::Cors,
      _ => Self::NoCors,
    }
  }
}

/// An outbound request as seen by the interceptor.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  pub mode: RequestMode,
  pub headers: HeaderMap,
  /// Only carried for passthrough requests; reads never have a body
  pub body: Option<Vec<u8>>,
}

impl Request {
  pub fn new(method: Method, url: Url) -> Self {
    Self {
      method,
      url,
      mode: RequestMode::default(),
      headers: HeaderMap::new(),
      body: None,
    }
  }

  pub fn get(url: Url) -> Self {
    Self::new(Method::GET, url)
  }

  pub fn with_mode(mut self, mode: RequestMode) -> Self {
    self.mode = mode;
    self
  }

  pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
    self.headers.insert(name, value);
    self
  }

  pub fn with_body(mut self, body: Vec<u8>) -> Self {
    self.body = Some(body);
    self
  }

  /// The `Accept` header, if present and readable.
  pub fn accept(&self) -> Option<&str> {
    self.headers.get(ACCEPT).and_then(|v| v.to_str().ok())
  }

  pub fn identity(&self) -> RequestIdentity {
    RequestIdentity::new(&self.method, &self.url)
  }
}

/// The key a cached response is stored under.
///
/// Fragments never take part in matching. `url_without_query` backs
/// lookups that ignore the search component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestIdentity {
  pub method: String,
  pub url: String,
  pub url_without_query: String,
}

impl RequestIdentity {
  pub fn new(method: &Method, url: &Url) -> Self {
    let mut url = url.clone();
    url.set_fragment(None);
    let full = url.to_string();
    url.set_query(None);

    Self {
      method: method.as_str().to_string(),
      url: full,
      url_without_query: url.to_string(),
    }
  }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
  pub status: StatusCode,
  pub headers: HeaderMap,
  pub body: Vec<u8>,
}

impl Response {
  pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      headers: HeaderMap::new(),
      body: body.into(),
    }
  }

  pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
    self.headers.insert(name, value);
    self
  }

  /// Whether the status is in the 2xx range. Only these are ever cached.
  pub fn is_success(&self) -> bool {
    self.status.is_success()
  }

  /// Headers as owned pairs for persistence. Values keep their raw bytes.
  pub fn header_pairs(&self) -> Vec<(String, Vec<u8>)> {
    self
      .headers
      .iter()
      .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
      .collect()
  }

  /// Rebuild a response from persisted parts.
  pub fn from_parts(
    status: u16,
    headers: &[(String, Vec<u8>)],
    body: Vec<u8>,
  ) -> Result<Self, InvalidResponse> {
    let status = StatusCode::from_u16(status).map_err(|_| InvalidResponse::Status(status))?;

    let mut map = HeaderMap::new();
    for (name, value) in headers {
      let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| InvalidResponse::Header(name.clone()))?;
      let value =
        HeaderValue::from_bytes(value).map_err(|_| InvalidResponse::Header(name.to_string()))?;
      map.append(name, value);
    }

    Ok(Self {
      status,
      headers: map,
      body,
    })
  }
}

#[derive(Debug, thiserror::Error)]
pub enum InvalidResponse {
  #[error("invalid status code {0}")]
  Status(u16),
  #[error("invalid header {0}")]
  Header(String),
}

#[cfg(test)]
mod tests {
  use super::*;
  use reqwest::header::CONTENT_DISPOSITION;

  fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
  }

  #[test]
  fn test_identity_strips_fragment() {
    let id = RequestIdentity::new(&Method::GET, &url("http://app.test/a.js?v=2#top"));
    assert_eq!(id.url, "http://app.test/a.js?v=2");
    assert_eq!(id.url_without_query, "http://app.test/a.js");
  }

  #[test]
  fn test_identity_without_query_is_stable() {
    let plain = RequestIdentity::new(&Method::GET, &url("http://app.test/data.json"));
    let searched = RequestIdentity::new(&Method::GET, &url("http://app.test/data.json?x=1"));
    assert_ne!(plain.url, searched.url);
    assert_eq!(plain.url_without_query, searched.url_without_query);
  }

  #[test]
  fn test_accept_header_lookup() {
    let req = Request::get(url("http://app.test/"));
    assert_eq!(req.accept(), None);

    let req = req.with_header(ACCEPT, HeaderValue::from_static("text/html,*/*"));
    assert_eq!(req.accept(), Some("text/html,*/*"));
  }

  #[test]
  fn test_fetch_mode_parsing() {
    assert_eq!(RequestMode::from_fetch_mode("navigate"), RequestMode::Navigate);
    assert_eq!(RequestMode::from_fetch_mode("CORS"), RequestMode::Cors);
    assert_eq!(RequestMode::from_fetch_mode("websocket"), RequestMode::NoCors);
  }

  #[test]
  fn test_response_parts_roundtrip_keeps_repeated_headers() {
    let headers = vec![
      ("set-cookie".to_string(), b"a=1".to_vec()),
      ("set-cookie".to_string(), b"b=2".to_vec()),
    ];
    let res = Response::from_parts(200, &headers, b"ok".to_vec()).unwrap();
    assert_eq!(res.headers.get_all("set-cookie").iter().count(), 2);
    assert_eq!(res.header_pairs(), headers);
  }

  #[test]
  fn test_header_pairs_keep_non_ascii_values() {
    let value = HeaderValue::from_bytes("attachment; filename=\"café.pdf\"".as_bytes()).unwrap();
    let res = Response::new(StatusCode::OK, "pdf").with_header(CONTENT_DISPOSITION, value.clone());

    let pairs = res.header_pairs();
    assert_eq!(pairs.len(), 1);
    let restored = Response::from_parts(200, &pairs, Vec::new()).unwrap();
    assert_eq!(restored.headers.get(CONTENT_DISPOSITION), Some(&value));
  }

  #[test]
  fn test_response_rejects_bad_status() {
    assert!(Response::from_parts(42, &[], Vec::new()).is_err());
  }
}
