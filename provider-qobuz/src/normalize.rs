//! Mapping of raw Qobuz records onto the library model
//!
//! Records arrive as untyped JSON. Every field is checked before use; a
//! record that fails validation maps to `None` (logged at warn level). The
//! one hard failure is an album whose artist cannot be parsed, reported as
//! [`QobuzError::MissingArtist`].

use chrono::{DateTime, Datelike};
use core_library::models::{ExternalIds, Metadata};
use core_library::title::parse_title;
use core_library::{Album, AlbumType, Artist, Playlist, ProviderMapping, Track};
use serde_json::Value;
use tracing::warn;

use crate::error::{QobuzError, Result};
use crate::quality::{infer_quality, quality_details};
use crate::types::id_string;

/// Qobuz's generic "no picture" artist image
const ARTIST_PLACEHOLDER_IMAGE: &str = "2a96cbd8b46e442fc41c2b86b821562f";

/// Image sizes, best first
const IMAGE_SIZES: [&str; 4] = ["extralarge", "large", "medium", "small"];

/// Metadata key of the public web page of a record
pub const URL_METADATA_KEY: &str = "qobuz_url";

/// Artist names marking a collective credit rather than a real performer
const VARIOUS_ARTISTS_MARKER: &str = "Various";

#[derive(Debug, Clone)]
pub struct Normalizer {
    provider_id: String,
}

impl Normalizer {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
        }
    }

    pub fn parse_artist(&self, obj: &Value) -> Option<Artist> {
        let id = id_string(obj.get("id")?)?;
        let name = text(obj, "name").unwrap_or_default();
        let mut artist = Artist::new(&self.provider_id, id, name);

        if let Some(images) = obj.get("image") {
            let image = IMAGE_SIZES
                .iter()
                .filter_map(|size| text(images, size))
                .find(|url| !url.contains(ARTIST_PLACEHOLDER_IMAGE));
            if let Some(url) = image {
                artist.metadata.insert("image".to_string(), url.to_string());
            }
        }
        if let Some(biography) = obj.get("biography").and_then(|b| text(b, "content")) {
            artist
                .metadata
                .insert("biography".to_string(), biography.to_string());
        }
        copy_text(obj, "url", &mut artist.metadata, URL_METADATA_KEY);

        Some(artist)
    }

    /// Map an album record.
    ///
    /// # Errors
    ///
    /// [`QobuzError::MissingArtist`] when the record passes validation but
    /// its artist cannot be parsed.
    pub fn parse_album(&self, obj: &Value) -> Result<Option<Album>> {
        let Some(id) = available_id(obj) else {
            warn!(id = ?obj.get("id"), "Skipping invalid or unavailable album");
            return Ok(None);
        };

        let artist = obj
            .get("artist")
            .and_then(|a| self.parse_artist(a))
            .ok_or_else(|| QobuzError::MissingArtist {
                album_id: id.clone(),
            })?;

        let (name, version) = parse_title(text(obj, "title").unwrap_or_default());

        let album_type = match text(obj, "product_type") {
            Some("single") => AlbumType::Single,
            Some("compilation") => AlbumType::Compilation,
            _ if artist.name.contains(VARIOUS_ARTISTS_MARKER) => AlbumType::Compilation,
            _ => AlbumType::Album,
        };

        let mut mapping = ProviderMapping::new(&self.provider_id, &id);
        if let Some(rate) = obj.get("maximum_sampling_rate").and_then(Value::as_f64) {
            let depth = obj.get("maximum_bit_depth").and_then(Value::as_u64).unwrap_or(16);
            mapping = mapping.with_details(quality_details(rate, depth));
        }

        let mut external_ids = ExternalIds::new();
        if let Some(upc) = text(obj, "upc") {
            external_ids.insert("upc".to_string(), upc.to_string());
        }

        let mut metadata = Metadata::new();
        if let Some(images) = obj.get("image") {
            if let Some(url) = IMAGE_SIZES.iter().find_map(|size| text(images, size)) {
                metadata.insert("image".to_string(), url.to_string());
            }
        }
        copy_text(obj, "copyright", &mut metadata, "copyright");
        copy_text(obj, "url", &mut metadata, URL_METADATA_KEY);
        copy_text(obj, "description", &mut metadata, "description");
        if flag(obj, "hires") {
            metadata.insert("hires".to_string(), "true".to_string());
        }

        Ok(Some(Album {
            item_id: id,
            provider: self.provider_id.clone(),
            name,
            version,
            artist,
            album_type,
            tags: obj
                .get("genre")
                .and_then(|g| text(g, "name"))
                .map(|genre| vec![genre.to_string()])
                .unwrap_or_default(),
            labels: obj
                .get("label")
                .and_then(|l| text(l, "name"))
                .map(|label| {
                    label
                        .split('/')
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            year: obj
                .get("released_at")
                .and_then(Value::as_i64)
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .map(|date| date.year()),
            provider_ids: vec![mapping],
            external_ids,
            metadata,
        }))
    }

    /// Map a track record, including its embedded album when present.
    ///
    /// # Errors
    ///
    /// Propagates [`QobuzError::MissingArtist`] from the embedded album.
    pub fn parse_track(&self, obj: &Value) -> Result<Option<Track>> {
        let Some(id) = available_id(obj) else {
            warn!(
                id = ?obj.get("id"),
                title = text(obj, "title").unwrap_or_default(),
                "Skipping invalid or unavailable track"
            );
            return Ok(None);
        };

        let (name, mut version) = parse_title(text(obj, "title").unwrap_or_default());
        if version.is_none() {
            version = text(obj, "version").map(str::to_string);
        }

        let album = match obj.get("album") {
            Some(album) => self.parse_album(album)?,
            None => None,
        };

        let sampling_rate = obj
            .get("maximum_sampling_rate")
            .and_then(Value::as_f64)
            .unwrap_or(44.1);
        let bit_depth = obj
            .get("maximum_bit_depth")
            .and_then(Value::as_u64)
            .unwrap_or(16);
        let quality = infer_quality(
            sampling_rate,
            bit_depth,
            obj.get("format_id").and_then(Value::as_u64),
        );

        let mut external_ids = ExternalIds::new();
        if let Some(isrc) = text(obj, "isrc") {
            external_ids.insert("isrc".to_string(), isrc.to_string());
        }

        let mut metadata = Metadata::new();
        if flag(obj, "hires") {
            metadata.insert("hires".to_string(), "true".to_string());
        }
        copy_text(obj, "url", &mut metadata, URL_METADATA_KEY);
        copy_text(obj, "performers", &mut metadata, "performers");
        copy_text(obj, "copyright", &mut metadata, "copyright");

        Ok(Some(Track {
            provider_ids: vec![ProviderMapping::new(&self.provider_id, &id)
                .with_quality(quality)
                .with_details(quality_details(sampling_rate, bit_depth))],
            item_id: id,
            provider: self.provider_id.clone(),
            name,
            version,
            duration: as_u32(obj, "duration"),
            artists: self.track_artists(obj),
            album,
            disc_number: as_u32(obj, "media_number"),
            track_number: as_u32(obj, "track_number"),
            external_ids,
            metadata,
        }))
    }

    /// Performer, then album artist, then "Name, Role - Name, Role" credits
    fn track_artists(&self, obj: &Value) -> Vec<Artist> {
        let credited = obj
            .get("performer")
            .into_iter()
            .chain(obj.get("album").and_then(|album| album.get("artist")))
            .filter(|artist| !is_various(artist))
            .find_map(|artist| self.parse_artist(artist));
        if let Some(artist) = credited {
            return vec![artist];
        }

        text(obj, "performers")
            .map(|performers| {
                performers
                    .split(" - ")
                    .filter_map(|credit| credit.split_once(", "))
                    .filter(|(_, roles)| roles.to_lowercase().contains("artist"))
                    .map(|(name, _)| Artist::new(&self.provider_id, name.trim(), name.trim()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Map a playlist record; editable when owned by `session_user_id` or
    /// collaborative.
    pub fn parse_playlist(&self, obj: &Value, session_user_id: Option<&str>) -> Option<Playlist> {
        let id = id_string(obj.get("id")?)?;
        let owner = obj.get("owner");

        let owned = match (owner.and_then(|o| o.get("id")).and_then(id_string), session_user_id) {
            (Some(owner_id), Some(user_id)) => owner_id == user_id,
            _ => false,
        };

        let mut metadata = Metadata::new();
        if let Some(image) = obj
            .get("images300")
            .and_then(Value::as_array)
            .and_then(|images| images.first())
            .and_then(Value::as_str)
        {
            metadata.insert("image".to_string(), image.to_string());
        }
        copy_text(obj, "url", &mut metadata, URL_METADATA_KEY);

        Some(Playlist {
            provider_ids: vec![ProviderMapping::new(&self.provider_id, &id)],
            item_id: id,
            provider: self.provider_id.clone(),
            name: text(obj, "name").unwrap_or_default().to_string(),
            owner: owner
                .and_then(|o| text(o, "name"))
                .unwrap_or_default()
                .to_string(),
            is_editable: owned || flag(obj, "is_collaborative"),
            metadata,
        })
    }
}

/// Id of a record that is both streamable and displayable
fn available_id(obj: &Value) -> Option<String> {
    let id = obj.get("id").and_then(id_string)?;
    (flag(obj, "streamable") && flag(obj, "displayable")).then_some(id)
}

fn is_various(artist: &Value) -> bool {
    text(artist, "name").is_some_and(|name| name.contains(VARIOUS_ARTISTS_MARKER))
}

/// Non-empty string field
fn text<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn flag(obj: &Value, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn as_u32(obj: &Value, key: &str) -> u32 {
    obj.get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

fn copy_text(obj: &Value, key: &str, metadata: &mut Metadata, as_key: &str) {
    if let Some(value) = text(obj, key) {
        metadata.insert(as_key.to_string(), value.to_string());
    }
}
