//! # Qobuz Provider
//!
//! Implements the `MusicProvider` contract for the Qobuz streaming catalog.
//!
//! ## Overview
//!
//! Request path, leaf first:
//! - [`transport`]: HTTP access behind a shared sliding-window rate limiter
//!   (2 requests per second by default)
//! - [`session`]: lazy login and the cached account session
//! - [`signing`]: request signatures for protected endpoints
//! - [`client`]: read-through cache with checksum-based freshness
//! - [`paginator`]: best-effort assembly of paged collections
//! - [`normalize`]: raw records to library models, with quality inference
//!   from [`quality`]
//! - [`telemetry`]: playback reports driven by the event bus
//!
//! [`QobuzProvider`] ties these together.

pub mod client;
pub mod connector;
pub mod error;
pub mod normalize;
pub mod paginator;
pub mod quality;
pub mod session;
pub mod signing;
pub mod telemetry;
pub mod transport;
pub mod types;

/// Provider id carried by every mapping, event and cache key
pub const PROVIDER_ID: &str = "qobuz";

pub use client::{CachingClient, RequestOptions};
pub use connector::QobuzProvider;
pub use error::{QobuzError, Result};
pub use normalize::Normalizer;
pub use quality::infer_quality;
pub use telemetry::TelemetryReporter;
