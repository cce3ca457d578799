//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the catalog providers:
//! - Logging and tracing setup, including forwarding to the host log sink
//! - Provider configuration with validation
//! - Event bus carrying playback and session notifications
//!
//! ## Overview
//!
//! Providers depend on this crate for their ambient concerns only. Domain
//! types live in `core-library`; host capabilities (HTTP, cache, clock) are
//! injected through `bridge-traits`.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
