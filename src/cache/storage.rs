//! Cache storage trait with in-memory and SQLite implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::traits::{body_digest, CachedResponse, EntrySummary, MatchOptions};
use crate::http::{Request, RequestIdentity, Response};

/// Trait for cache storage backends.
///
/// A backend holds any number of named generations. Each operation is a
/// single unit; concurrent writes to the same identity are last-write-wins.
#[async_trait]
pub trait CacheStorage: Send + Sync {
  /// Create the generation if it does not exist yet.
  async fn open(&self, name: &str) -> Result<()>;

  /// Names of all generations, oldest first.
  async fn keys(&self) -> Result<Vec<String>>;

  /// Delete a generation and all of its entries. Returns whether it existed.
  async fn delete(&self, name: &str) -> Result<bool>;

  /// Find the stored response for a request.
  async fn match_request(
    &self,
    name: &str,
    request: &Request,
    options: MatchOptions,
  ) -> Result<Option<CachedResponse>>;

  /// Store a response, replacing any entry with the same identity.
  async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<()>;

  /// Store several responses at once. Either all are written or none are.
  async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<()>;

  /// List the entries of a generation, in storage order.
  async fn entries(&self, name: &str) -> Result<Vec<EntrySummary>>;

  /// Record `name` as the activated generation, replacing any earlier one.
  async fn mark_activated(&self, name: &str) -> Result<()>;

  /// The activated generation, if it has not been deleted since.
  async fn activated(&self) -> Result<Option<String>>;
}

// ============================================================================
// In-memory storage
// ============================================================================

struct MemoryEntry {
  identity: RequestIdentity,
  response: Response,
  cached_at: DateTime<Utc>,
}

struct MemoryGeneration {
  name: String,
  entries: Vec<MemoryEntry>,
}

impl MemoryGeneration {
  fn upsert(&mut self, identity: RequestIdentity, response: Response) {
    // Replacing moves the entry to the end, like a delete followed by an insert
    self.entries.retain(|e| e.identity != identity);
    self.entries.push(MemoryEntry {
      identity,
      response,
      cached_at: Utc::now(),
    });
  }
}

/// Storage that lives only as long as the process.
#[derive(Default)]
pub struct MemoryStorage {
  generations: Mutex<Vec<MemoryGeneration>>,
  activated: Mutex<Option<String>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<MutexGuard<'_, Vec<MemoryGeneration>>> {
    self
      .generations
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  fn lock_activated(&self) -> Result<MutexGuard<'_, Option<String>>> {
    self
      .activated
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

fn find_or_create<'a>(
  generations: &'a mut Vec<MemoryGeneration>,
  name: &str,
) -> &'a mut MemoryGeneration {
  let index = match generations.iter().position(|g| g.name == name) {
    Some(index) => index,
    None => {
      generations.push(MemoryGeneration {
        name: name.to_string(),
        entries: Vec::new(),
      });
      generations.len() - 1
    }
  };
  &mut generations[index]
}

#[async_trait]
impl CacheStorage for MemoryStorage {
  async fn open(&self, name: &str) -> Result<()> {
    let mut generations = self.lock()?;
    find_or_create(&mut generations, name);
    Ok(())
  }

  async fn keys(&self) -> Result<Vec<String>> {
    let generations = self.lock()?;
    Ok(generations.iter().map(|g| g.name.clone()).collect())
  }

  async fn delete(&self, name: &str) -> Result<bool> {
    let mut generations = self.lock()?;
    let before = generations.len();
    generations.retain(|g| g.name != name);
    Ok(generations.len() != before)
  }

  async fn match_request(
    &self,
    name: &str,
    request: &Request,
    options: MatchOptions,
  ) -> Result<Option<CachedResponse>> {
    let generations = self.lock()?;
    let Some(generation) = generations.iter().find(|g| g.name == name) else {
      return Ok(None);
    };
    let identity = request.identity();

    let same_method = |e: &&MemoryEntry| e.identity.method == identity.method;
    let exact = generation
      .entries
      .iter()
      .filter(same_method)
      .find(|e| e.identity.url == identity.url);

    let found = match exact {
      Some(entry) => Some(entry),
      None if options.ignore_search => generation
        .entries
        .iter()
        .filter(same_method)
        .find(|e| e.identity.url_without_query == identity.url_without_query),
      None => None,
    };

    Ok(found.map(|e| CachedResponse {
      response: e.response.clone(),
      cached_at: e.cached_at,
    }))
  }

  async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<()> {
    let mut generations = self.lock()?;
    find_or_create(&mut generations, name).upsert(request.identity(), response.clone());
    Ok(())
  }

  async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<()> {
    // Holding the lock for the whole batch makes it atomic
    let mut generations = self.lock()?;
    let generation = find_or_create(&mut generations, name);
    for (request, response) in entries {
      generation.upsert(request.identity(), response.clone());
    }
    Ok(())
  }

  async fn entries(&self, name: &str) -> Result<Vec<EntrySummary>> {
    let generations = self.lock()?;
    let Some(generation) = generations.iter().find(|g| g.name == name) else {
      return Ok(Vec::new());
    };

    Ok(
      generation
        .entries
        .iter()
        .map(|e| EntrySummary {
          method: e.identity.method.clone(),
          url: e.identity.url.clone(),
          status: e.response.status.as_u16(),
          size: e.response.body.len(),
          digest: body_digest(&e.response.body),
          cached_at: e.cached_at,
        })
        .collect(),
    )
  }

  async fn mark_activated(&self, name: &str) -> Result<()> {
    *self.lock_activated()? = Some(name.to_string());
    Ok(())
  }

  async fn activated(&self) -> Result<Option<String>> {
    let generations = self.lock()?;
    let activated = self.lock_activated()?;
    Ok(
      activated
        .clone()
        .filter(|name| generations.iter().any(|g| &g.name == name)),
    )
  }
}

// ============================================================================
// SQLite storage
// ============================================================================

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (or create) the storage at the given path.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Open a throwaway database that is dropped with the storage.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("pwacache").join("cache.db"))
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- One row per cache generation
CREATE TABLE IF NOT EXISTS generations (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Stored responses; rowid order is storage order
CREATE TABLE IF NOT EXISTS entries (
    generation TEXT NOT NULL,
    method TEXT NOT NULL,
    url TEXT NOT NULL,
    url_without_query TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    digest TEXT NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (generation, method, url)
);

CREATE INDEX IF NOT EXISTS idx_entries_search
    ON entries(generation, method, url_without_query);

-- At most one activated generation
CREATE TABLE IF NOT EXISTS activation (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    generation TEXT NOT NULL,
    activated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

const ENSURE_GENERATION: &str = "INSERT OR IGNORE INTO generations (name) VALUES (?)";

const UPSERT_ENTRY: &str =
  "INSERT OR REPLACE INTO entries (generation, method, url, url_without_query, status, headers, body, digest, cached_at)
   VALUES (?, ?, ?, ?, ?, ?, ?, ?, datetime('now'))";

fn insert_entry(
  conn: &Connection,
  name: &str,
  request: &Request,
  response: &Response,
) -> Result<()> {
  let identity = request.identity();
  let headers = serde_json::to_string(&response.header_pairs())
    .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

  conn
    .execute(
      UPSERT_ENTRY,
      params![
        name,
        identity.method,
        identity.url,
        identity.url_without_query,
        response.status.as_u16(),
        headers,
        response.body,
        body_digest(&response.body),
      ],
    )
    .map_err(|e| eyre!("Failed to store entry {}: {}", identity.url, e))?;

  Ok(())
}

#[async_trait]
impl CacheStorage for SqliteStorage {
  async fn open(&self, name: &str) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute(ENSURE_GENERATION, params![name])
      .map_err(|e| eyre!("Failed to open generation {}: {}", name, e))?;
    Ok(())
  }

  async fn keys(&self) -> Result<Vec<String>> {
    let conn = self.lock()?;
    let mut stmt = conn
      .prepare("SELECT name FROM generations ORDER BY rowid")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list generations: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to read generation name: {}", e))?;

    Ok(names)
  }

  async fn delete(&self, name: &str) -> Result<bool> {
    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute("DELETE FROM entries WHERE generation = ?", params![name])
      .map_err(|e| eyre!("Failed to delete entries of {}: {}", name, e))?;
    let removed = tx
      .execute("DELETE FROM generations WHERE name = ?", params![name])
      .map_err(|e| eyre!("Failed to delete generation {}: {}", name, e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(removed > 0)
  }

  async fn match_request(
    &self,
    name: &str,
    request: &Request,
    options: MatchOptions,
  ) -> Result<Option<CachedResponse>> {
    let conn = self.lock()?;
    let identity = request.identity();

    // An exact URL match wins over a query-insensitive one
    let (column, value) = if options.ignore_search {
      ("url_without_query", &identity.url_without_query)
    } else {
      ("url", &identity.url)
    };
    let sql = format!(
      "SELECT status, headers, body, cached_at FROM entries
       WHERE generation = ? AND method = ? AND {column} = ?
       ORDER BY (url = ?) DESC, rowid ASC
       LIMIT 1"
    );

    let row: Option<(u16, String, Vec<u8>, String)> = conn
      .query_row(
        &sql,
        params![name, identity.method, value, identity.url],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to look up {}: {}", identity.url, e))?;

    let Some((status, headers, body, cached_at)) = row else {
      return Ok(None);
    };

    let headers: Vec<(String, Vec<u8>)> = serde_json::from_str(&headers)
      .map_err(|e| eyre!("Failed to parse stored headers: {}", e))?;
    let response = Response::from_parts(status, &headers, body)
      .map_err(|e| eyre!("Corrupt cache entry for {}: {}", identity.url, e))?;

    Ok(Some(CachedResponse {
      response,
      cached_at: parse_datetime(&cached_at)?,
    }))
  }

  async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<()> {
    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute(ENSURE_GENERATION, params![name])
      .map_err(|e| eyre!("Failed to open generation {}: {}", name, e))?;
    insert_entry(&tx, name, request, response)?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;
    Ok(())
  }

  async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<()> {
    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute(ENSURE_GENERATION, params![name])
      .map_err(|e| eyre!("Failed to open generation {}: {}", name, e))?;
    for (request, response) in entries {
      // Dropping the transaction on error rolls everything back
      insert_entry(&tx, name, request, response)?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;
    Ok(())
  }

  async fn entries(&self, name: &str) -> Result<Vec<EntrySummary>> {
    let conn = self.lock()?;
    let mut stmt = conn
      .prepare(
        "SELECT method, url, status, length(body), digest, cached_at FROM entries
         WHERE generation = ?
         ORDER BY rowid",
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let rows = stmt
      .query_map(params![name], |row| {
        Ok((
          row.get::<_, String>(0)?,
          row.get::<_, String>(1)?,
          row.get::<_, u16>(2)?,
          row.get::<_, i64>(3)?,
          row.get::<_, String>(4)?,
          row.get::<_, String>(5)?,
        ))
      })
      .map_err(|e| eyre!("Failed to list entries: {}", e))?
      .collect::<rusqlite::Result<Vec<_>>>()
      .map_err(|e| eyre!("Failed to read entry: {}", e))?;

    rows
      .into_iter()
      .map(|(method, url, status, size, digest, cached_at)| {
        Ok(EntrySummary {
          method,
          url,
          status,
          size: size.max(0) as usize,
          digest,
          cached_at: parse_datetime(&cached_at)?,
        })
      })
      .collect()
  }

  async fn mark_activated(&self, name: &str) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute(
        "INSERT OR REPLACE INTO activation (id, generation, activated_at)
         VALUES (1, ?, datetime('now'))",
        params![name],
      )
      .map_err(|e| eyre!("Failed to record activation of {}: {}", name, e))?;
    Ok(())
  }

  async fn activated(&self) -> Result<Option<String>> {
    let conn = self.lock()?;
    conn
      .query_row(
        "SELECT a.generation FROM activation a
         JOIN generations g ON g.name = a.generation
         WHERE a.id = 1",
        [],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read activated generation: {}", e))
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use reqwest::header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE};
  use reqwest::StatusCode;
  use url::Url;

  fn get(url: &str) -> Request {
    Request::get(Url::parse(url).unwrap())
  }

  fn ok(body: &str) -> Response {
    Response::new(StatusCode::OK, body)
      .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
  }

  fn backends() -> Vec<(&'static str, Box<dyn CacheStorage>)> {
    vec![
      ("memory", Box::new(MemoryStorage::new())),
      ("sqlite", Box::new(SqliteStorage::open_in_memory().unwrap())),
    ]
  }

  #[tokio::test]
  async fn test_open_is_idempotent() {
    for (label, storage) in backends() {
      storage.open("app-v1").await.unwrap();
      storage.open("app-v1").await.unwrap();
      storage.open("app-v2").await.unwrap();
      assert_eq!(storage.keys().await.unwrap(), vec!["app-v1", "app-v2"], "{label}");
    }
  }

  #[tokio::test]
  async fn test_put_then_match() {
    for (label, storage) in backends() {
      let req = get("http://app.test/app.js");
      storage.put("app-v1", &req, &ok("one")).await.unwrap();

      let hit = storage
        .match_request("app-v1", &req, MatchOptions::default())
        .await
        .unwrap()
        .expect(label);
      assert_eq!(hit.response.body, b"one", "{label}");
      assert_eq!(
        hit.response.headers.get(CONTENT_TYPE).unwrap(),
        "text/plain",
        "{label}"
      );
    }
  }

  #[tokio::test]
  async fn test_put_overwrites_same_identity() {
    for (label, storage) in backends() {
      let req = get("http://app.test/app.js");
      storage.put("app-v1", &req, &ok("one")).await.unwrap();
      storage.put("app-v1", &req, &ok("two")).await.unwrap();

      let entries = storage.entries("app-v1").await.unwrap();
      assert_eq!(entries.len(), 1, "{label}");
      assert_eq!(entries[0].digest, body_digest(b"two"), "{label}");
    }
  }

  #[tokio::test]
  async fn test_match_ignoring_search() {
    for (label, storage) in backends() {
      storage
        .put("app-v1", &get("http://app.test/data.json"), &ok("data"))
        .await
        .unwrap();

      let searched = get("http://app.test/data.json?x=1");
      let strict = storage
        .match_request("app-v1", &searched, MatchOptions::default())
        .await
        .unwrap();
      assert!(strict.is_none(), "{label}");

      let loose = storage
        .match_request("app-v1", &searched, MatchOptions::ignore_search())
        .await
        .unwrap();
      assert_eq!(loose.unwrap().response.body, b"data", "{label}");
    }
  }

  #[tokio::test]
  async fn test_ignore_search_prefers_exact_url() {
    for (label, storage) in backends() {
      storage
        .put("app-v1", &get("http://app.test/data.json?x=1"), &ok("first"))
        .await
        .unwrap();
      storage
        .put("app-v1", &get("http://app.test/data.json?x=2"), &ok("second"))
        .await
        .unwrap();

      let hit = storage
        .match_request(
          "app-v1",
          &get("http://app.test/data.json?x=2"),
          MatchOptions::ignore_search(),
        )
        .await
        .unwrap()
        .unwrap();
      assert_eq!(hit.response.body, b"second", "{label}");

      let hit = storage
        .match_request(
          "app-v1",
          &get("http://app.test/data.json"),
          MatchOptions::ignore_search(),
        )
        .await
        .unwrap()
        .unwrap();
      assert_eq!(hit.response.body, b"first", "{label}");
    }
  }

  #[tokio::test]
  async fn test_match_is_scoped_to_generation_and_method() {
    for (label, storage) in backends() {
      let req = get("http://app.test/app.js");
      storage.put("app-v1", &req, &ok("one")).await.unwrap();

      let other_generation = storage
        .match_request("app-v2", &req, MatchOptions::default())
        .await
        .unwrap();
      assert!(other_generation.is_none(), "{label}");

      let head = Request::new(reqwest::Method::HEAD, req.url.clone());
      let other_method = storage
        .match_request("app-v1", &head, MatchOptions::default())
        .await
        .unwrap();
      assert!(other_method.is_none(), "{label}");
    }
  }

  #[tokio::test]
  async fn test_delete_removes_generation_and_entries() {
    for (label, storage) in backends() {
      let req = get("http://app.test/app.js");
      storage.put("app-v1", &req, &ok("one")).await.unwrap();

      assert!(storage.delete("app-v1").await.unwrap(), "{label}");
      assert!(!storage.delete("app-v1").await.unwrap(), "{label}");
      assert!(storage.keys().await.unwrap().is_empty(), "{label}");

      // Re-creating the generation must not resurrect old entries
      storage.open("app-v1").await.unwrap();
      assert!(storage.entries("app-v1").await.unwrap().is_empty(), "{label}");
    }
  }

  #[tokio::test]
  async fn test_put_all_stores_every_entry() {
    for (label, storage) in backends() {
      let batch = vec![
        (get("http://app.test/"), ok("root")),
        (get("http://app.test/index.html"), ok("index")),
      ];
      storage.put_all("app-v1", &batch).await.unwrap();

      let urls: Vec<String> = storage
        .entries("app-v1")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.url)
        .collect();
      assert_eq!(urls, vec!["http://app.test/", "http://app.test/index.html"], "{label}");
    }
  }

  #[tokio::test]
  async fn test_activation_marker_follows_generation() {
    for (label, storage) in backends() {
      assert_eq!(storage.activated().await.unwrap(), None, "{label}");

      storage.open("app-v1").await.unwrap();
      storage.mark_activated("app-v1").await.unwrap();
      storage.open("app-v2").await.unwrap();
      assert_eq!(storage.activated().await.unwrap().as_deref(), Some("app-v1"), "{label}");

      storage.mark_activated("app-v2").await.unwrap();
      assert_eq!(storage.activated().await.unwrap().as_deref(), Some("app-v2"), "{label}");

      storage.delete("app-v2").await.unwrap();
      assert_eq!(storage.activated().await.unwrap(), None, "{label}");
    }
  }

  #[tokio::test]
  async fn test_non_ascii_header_values_are_stored_intact() {
    for (label, storage) in backends() {
      let req = get("http://app.test/report");
      let value = HeaderValue::from_bytes("inline; filename=\"año.txt\"".as_bytes()).unwrap();
      let response = ok("report").with_header(CONTENT_DISPOSITION, value.clone());
      storage.put("app-v1", &req, &response).await.unwrap();

      let hit = storage
        .match_request("app-v1", &req, MatchOptions::default())
        .await
        .unwrap()
        .expect(label);
      assert_eq!(hit.response.headers.get(CONTENT_DISPOSITION), Some(&value), "{label}");
      assert_eq!(hit.response.headers.len(), 2, "{label}");
    }
  }

  #[tokio::test]
  async fn test_sqlite_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.db");

    {
      let storage = SqliteStorage::open(&path).unwrap();
      storage
        .put("app-v1", &get("http://app.test/app.js"), &ok("one"))
        .await
        .unwrap();
      storage.mark_activated("app-v1").await.unwrap();
    }

    let storage = SqliteStorage::open(&path).unwrap();
    assert_eq!(storage.keys().await.unwrap(), vec!["app-v1"]);
    assert_eq!(storage.activated().await.unwrap().as_deref(), Some("app-v1"));
    let hit = storage
      .match_request("app-v1", &get("http://app.test/app.js"), MatchOptions::default())
      .await
      .unwrap();
    assert!(hit.is_some());
  }

  #[test]
  fn test_parse_datetime() {
    let dt = parse_datetime("2024-01-15 10:30:00").unwrap();
    assert_eq!(dt.to_rfc3339(), "2024-01-15T10:30:00+00:00");
    assert!(parse_datetime("yesterday").is_err());
  }
}
