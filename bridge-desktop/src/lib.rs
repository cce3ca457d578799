//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` with rustls
//! - `CacheStore` as a bounded in-memory LRU with per-entry expiry
//!
//! Hosts with a persistent cache (SQLite, on-disk) provide their own
//! `CacheStore`; the in-memory store is enough for CLIs and tests.
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use bridge_desktop::{MemoryCacheStore, ReqwestHttpClient};
//!
//! let http = Arc::new(ReqwestHttpClient::new()?);
//! let cache = Arc::new(MemoryCacheStore::new(4096));
//! ```

mod cache;
mod http;

pub use cache::MemoryCacheStore;
pub use http::ReqwestHttpClient;
