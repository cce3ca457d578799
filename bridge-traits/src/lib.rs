//! # Host Bridge Traits
//!
//! Contracts between the catalog core and the host application.
//!
//! ## Overview
//!
//! The host owns networking, the shared response cache and the log pipeline.
//! The core only sees these capabilities through the traits below, so every
//! provider can be exercised against scripted fakes in tests and against the
//! desktop adapters (`bridge-desktop`) in production.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP execution
//! - [`CacheStore`](cache::CacheStore) - Shared key/value response cache with max-age
//! - [`Clock`](time::Clock) - Time source for deterministic signing and telemetry
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert their native errors and keep the message actionable
//! (include the URL or cache key involved).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single adapter can be shared by
//! every in-flight provider operation.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::cache::CacheStore;
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//! use bytes::Bytes;
//!
//! pub struct NullCache;
//!
//! #[async_trait]
//! impl CacheStore for NullCache {
//!     async fn get(&self, _key: &str) -> Result<Option<Bytes>> { Ok(None) }
//!     async fn set(&self, _key: &str, _value: Bytes, _days: u32) -> Result<()> { Ok(()) }
//!     async fn delete(&self, _key: &str) -> Result<()> { Ok(()) }
//! }
//! ```

pub mod cache;
pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;

pub use cache::CacheStore;
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
