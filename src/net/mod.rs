//! Network access for the proxy.
//!
//! `Fetcher` is the seam the retrieval policy talks to; `HttpFetcher`
//! is the production implementation over reqwest.

mod client;

pub use client::{FetchError, Fetcher, HttpFetcher};
