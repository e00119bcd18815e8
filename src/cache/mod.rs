//! Generational response cache.
//!
//! This module provides the storage side of the proxy:
//! - Named cache generations (`<app>-v<version>`), exactly one current at a time
//! - Entries keyed by request method and URL, optionally matched without the query string
//! - Atomic batch writes for provisioning
//! - In-memory and SQLite backends behind one async trait

mod generation;
mod storage;
mod traits;

pub use generation::{Generation, GenerationName};
pub use storage::{CacheStorage, MemoryStorage, SqliteStorage};
pub use traits::{CachedResponse, EntrySummary, MatchOptions, ResponseSource, Retrieved};
