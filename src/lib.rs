//! Workspace facade crate.
//!
//! Exposes feature flags that map to the individual workspace crates so a host
//! application can depend on `music-catalog-workspace` and enable providers
//! without wiring each crate individually.

#[cfg(feature = "qobuz")]
pub use provider_qobuz as qobuz;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop as desktop;
