//! # Catalog Library Model
//!
//! The unified domain model the host consumes from every streaming provider.
//!
//! ## Overview
//!
//! - [`models`]: artists, albums, tracks, playlists, stream details and the
//!   enums describing them
//! - [`provider`]: the [`MusicProvider`](provider::MusicProvider) contract a
//!   provider implements
//! - [`title`]: the title/version split shared by every normalizer

pub mod error;
pub mod models;
pub mod provider;
pub mod title;

pub use error::{LibraryError, Result};
pub use models::{
    Album, AlbumType, Artist, MediaType, Playlist, ProviderMapping, SearchResults, StreamDetails,
    StreamKind, Track, TrackQuality,
};
pub use provider::MusicProvider;
