//! Domain models for the unified catalog
//!
//! Every provider maps its remote records into these types. Identifiers are
//! provider-scoped strings; `provider_ids` lists every provider that can serve
//! the item so the host can merge the same recording across services.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Free-form string metadata (image URL, biography, copyright, ...)
pub type Metadata = BTreeMap<String, String>;

/// External identifiers keyed by scheme (`upc`, `isrc`)
pub type ExternalIds = BTreeMap<String, String>;

// =============================================================================
// Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Artist,
    Album,
    Track,
    Playlist,
}

impl MediaType {
    pub const ALL: [MediaType; 4] = [
        MediaType::Artist,
        MediaType::Album,
        MediaType::Track,
        MediaType::Playlist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Artist => "artist",
            MediaType::Album => "album",
            MediaType::Track => "track",
            MediaType::Playlist => "playlist",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AlbumType {
    #[default]
    Album,
    Single,
    Compilation,
}

/// Audio quality tier, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TrackQuality {
    LossyMp3,
    LossyOgg,
    LossyAac,
    FlacLossless,
    /// 24 bit at up to 48kHz
    FlacLosslessHiRes1,
    /// up to 96kHz
    FlacLosslessHiRes2,
    /// up to 192kHz
    FlacLosslessHiRes3,
    /// above 192kHz
    FlacLosslessHiRes4,
}

impl TrackQuality {
    pub fn is_hi_res(&self) -> bool {
        *self >= TrackQuality::FlacLosslessHiRes1
    }
}

// =============================================================================
// Provider mappings
// =============================================================================

/// Where an item can be fetched from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMapping {
    pub provider: String,
    pub item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<TrackQuality>,
    /// Human-readable resolution, e.g. "96kHz 24bit"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ProviderMapping {
    pub fn new(provider: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            item_id: item_id.into(),
            quality: None,
            details: None,
        }
    }

    pub fn with_quality(mut self, quality: TrackQuality) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

// =============================================================================
// Domain Models
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub item_id: String,
    pub provider: String,
    pub name: String,
    pub provider_ids: Vec<ProviderMapping>,
    pub metadata: Metadata,
}

impl Artist {
    pub fn new(
        provider: impl Into<String>,
        item_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let provider = provider.into();
        let item_id = item_id.into();
        Self {
            provider_ids: vec![ProviderMapping::new(provider.clone(), item_id.clone())],
            item_id,
            provider,
            name: name.into(),
            metadata: Metadata::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub item_id: String,
    pub provider: String,
    pub name: String,
    /// Edition or subtitle split off the title ("Remastered", "Deluxe Edition")
    pub version: Option<String>,
    pub artist: Artist,
    pub album_type: AlbumType,
    pub tags: Vec<String>,
    pub labels: Vec<String>,
    pub year: Option<i32>,
    pub provider_ids: Vec<ProviderMapping>,
    pub external_ids: ExternalIds,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub item_id: String,
    pub provider: String,
    pub name: String,
    pub version: Option<String>,
    /// Seconds
    pub duration: u32,
    /// Never null; may be empty when no artist could be resolved
    pub artists: Vec<Artist>,
    pub album: Option<Album>,
    pub disc_number: u32,
    pub track_number: u32,
    pub provider_ids: Vec<ProviderMapping>,
    pub external_ids: ExternalIds,
    pub metadata: Metadata,
}

impl Track {
    /// Best quality advertised across provider mappings
    pub fn best_quality(&self) -> Option<TrackQuality> {
        self.provider_ids.iter().filter_map(|m| m.quality).max()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub item_id: String,
    pub provider: String,
    pub name: String,
    /// Display name of the owner
    pub owner: String,
    /// Owned by the signed-in user or collaborative
    pub is_editable: bool,
    pub provider_ids: Vec<ProviderMapping>,
    pub metadata: Metadata,
}

/// How the player reaches the audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Url,
    File,
}

/// Resolved playable stream for a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDetails {
    pub kind: StreamKind,
    pub provider: String,
    pub item_id: String,
    pub path: String,
    /// Container, e.g. "flac" or "mp4"
    pub content_type: String,
    /// Hz
    pub sample_rate: u32,
    pub bit_depth: u32,
    /// Opaque provider payload handed back with playback events
    pub details: Value,
}

/// Search hits grouped by media type. Unrequested types stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub artists: Vec<Artist>,
    pub albums: Vec<Album>,
    pub tracks: Vec<Track>,
    pub playlists: Vec<Playlist>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.artists.is_empty()
            && self.albums.is_empty()
            && self.tracks.is_empty()
            && self.playlists.is_empty()
    }

    pub fn len(&self) -> usize {
        self.artists.len() + self.albums.len() + self.tracks.len() + self.playlists.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_with(qualities: &[TrackQuality]) -> Track {
        Track {
            item_id: "1".to_string(),
            provider: "qobuz".to_string(),
            name: "Song".to_string(),
            version: None,
            duration: 180,
            artists: Vec::new(),
            album: None,
            disc_number: 1,
            track_number: 1,
            provider_ids: qualities
                .iter()
                .map(|q| ProviderMapping::new("qobuz", "1").with_quality(*q))
                .collect(),
            external_ids: ExternalIds::new(),
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn test_quality_ordering() {
        assert!(TrackQuality::FlacLosslessHiRes4 > TrackQuality::FlacLosslessHiRes3);
        assert!(TrackQuality::FlacLosslessHiRes1 > TrackQuality::FlacLossless);
        assert!(TrackQuality::FlacLossless > TrackQuality::LossyAac);
        assert!(TrackQuality::FlacLosslessHiRes1.is_hi_res());
        assert!(!TrackQuality::FlacLossless.is_hi_res());
    }

    #[test]
    fn test_best_quality() {
        let track = track_with(&[TrackQuality::LossyAac, TrackQuality::FlacLosslessHiRes2]);
        assert_eq!(track.best_quality(), Some(TrackQuality::FlacLosslessHiRes2));
        assert_eq!(track_with(&[]).best_quality(), None);
    }

    #[test]
    fn test_artist_new_registers_provider_mapping() {
        let artist = Artist::new("qobuz", "42", "Miles Davis");
        assert_eq!(artist.provider_ids, vec![ProviderMapping::new("qobuz", "42")]);
        assert!(artist.metadata.is_empty());
    }

    #[test]
    fn test_media_type_serde() {
        assert_eq!(serde_json::to_string(&MediaType::Playlist).unwrap(), "\"playlist\"");
        assert_eq!(MediaType::Album.to_string(), "album");
    }

    #[test]
    fn test_search_results_counts() {
        let mut results = SearchResults::default();
        assert!(results.is_empty());

        results.tracks.push(track_with(&[]));
        assert_eq!(results.len(), 1);
        assert!(!results.is_empty());
    }
}
