//! Qobuz catalog provider
//!
//! Implements [`MusicProvider`] on top of the caching client, the paginator
//! and the normalizer. Remote failures that are not authentication problems
//! yield empty results; records that fail validation are left out.

use async_trait::async_trait;
use bridge_traits::cache::CacheStore;
use bridge_traits::http::HttpClient;
use bridge_traits::time::{Clock, SystemClock};
use core_library::{
    Album, Artist, LibraryError, MediaType, MusicProvider, Playlist, SearchResults, StreamDetails,
    StreamKind, Track,
};
use core_runtime::config::ProviderConfig;
use core_runtime::events::EventBus;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::client::{CachingClient, RequestOptions};
use crate::error::{QobuzError, Result};
use crate::normalize::Normalizer;
use crate::paginator::Paginator;
use crate::session::SessionManager;
use crate::telemetry::TelemetryReporter;
use crate::transport::ThrottledTransport;
use crate::types::{id_string, params, Params, STREAM_FORMAT_IDS};
use crate::PROVIDER_ID;

const DISPLAY_NAME: &str = "Qobuz";

/// Result count of the search standing in for the missing top-tracks endpoint
const TOP_TRACKS_LIMIT: u32 = 10;

/// Qobuz streaming provider
///
/// # Example
///
/// ```ignore
/// use provider_qobuz::QobuzProvider;
/// use core_library::{MediaType, MusicProvider};
///
/// let provider = QobuzProvider::setup(config, http_client, cache).expect("provider disabled");
/// let _telemetry = provider.subscribe_events(&event_bus);
///
/// let results = provider.search("kind of blue", &[MediaType::Album], 5).await?;
/// ```
pub struct QobuzProvider {
    client: Arc<CachingClient>,
    paginator: Paginator,
    normalizer: Normalizer,
    telemetry: Arc<TelemetryReporter>,
}

impl QobuzProvider {
    pub fn new(
        config: ProviderConfig,
        http: Arc<dyn HttpClient>,
        cache: Arc<dyn CacheStore>,
    ) -> Result<Self> {
        Self::with_clock(config, http, cache, Arc::new(SystemClock))
    }

    /// Like [`new`](Self::new) with an explicit time source for signatures,
    /// telemetry dates and the playlist listing checksum.
    pub fn with_clock(
        config: ProviderConfig,
        http: Arc<dyn HttpClient>,
        cache: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let transport = ThrottledTransport::new(
            http,
            config.api_base_url,
            config.app_id,
            config.rate_limit,
            config.request_timeout,
        );
        let session = SessionManager::new(
            config.username,
            config.password,
            config.device_manufacturer_id,
        );
        let client = Arc::new(CachingClient::new(
            transport,
            session,
            cache,
            clock,
            config.app_secret,
            config.cache_max_age_days,
        ));

        Ok(Self {
            paginator: Paginator::new(Arc::clone(&client), config.page_size),
            normalizer: Normalizer::new(PROVIDER_ID),
            telemetry: Arc::new(TelemetryReporter::new(Arc::clone(&client), PROVIDER_ID)),
            client,
        })
    }

    /// Instantiate the provider only when it is enabled and has credentials
    pub fn setup(
        config: ProviderConfig,
        http: Arc<dyn HttpClient>,
        cache: Arc<dyn CacheStore>,
    ) -> Option<Self> {
        if !config.is_usable() {
            debug!("Qobuz provider disabled or missing credentials");
            return None;
        }

        match Self::new(config, http, cache) {
            Ok(provider) => {
                info!("Qobuz provider ready");
                Some(provider)
            }
            Err(e) => {
                error!(error = %e, "Invalid Qobuz configuration");
                None
            }
        }
    }

    /// Report playback of this provider's streams and publish auth events on
    /// `bus`. The returned task runs until the bus closes.
    pub fn subscribe_events(&self, bus: &EventBus) -> JoinHandle<()> {
        self.client.session().attach_events(bus.clone());
        Arc::clone(&self.telemetry).spawn(bus)
    }

    async fn fetch(&self, endpoint: &str, params: Params, options: &RequestOptions) -> Result<Option<Value>> {
        self.client.get(endpoint, params, options).await
    }

    /// Account id used for playlist ownership. Logs in when needed, since a
    /// cached payload may be served before any request has authenticated.
    async fn session_user_id(&self) -> Result<Option<String>> {
        let session = self
            .client
            .session()
            .token(self.client.transport())
            .await?;
        Ok(session.user_id())
    }

    fn artists_from(&self, items: &[Value]) -> Vec<Artist> {
        items
            .iter()
            .filter_map(|item| self.normalizer.parse_artist(item))
            .collect()
    }

    fn albums_from(&self, items: &[Value]) -> Vec<Album> {
        items
            .iter()
            .filter_map(|item| match self.normalizer.parse_album(item) {
                Ok(album) => album,
                Err(e) => {
                    error!(error = %e, "Leaving album out of listing");
                    None
                }
            })
            .collect()
    }

    fn tracks_from(&self, items: &[Value]) -> Vec<Track> {
        items
            .iter()
            .filter_map(|item| match self.normalizer.parse_track(item) {
                Ok(track) => track,
                Err(e) => {
                    error!(error = %e, "Leaving track out of listing");
                    None
                }
            })
            .collect()
    }

    fn playlists_from(&self, items: &[Value], user_id: Option<&str>) -> Vec<Playlist> {
        items
            .iter()
            .filter_map(|item| self.normalizer.parse_playlist(item, user_id))
            .collect()
    }

    async fn favorites(&self, kind: &str) -> Result<Vec<Value>> {
        self.paginator
            .fetch_all(
                "favorite/getUserFavorites",
                params([("type", kind)]),
                kind,
                0,
                0,
                None,
            )
            .await
    }

    async fn update_favorite(&self, endpoint: &str, item_id: &str, media_type: MediaType) -> core_library::Result<bool> {
        let key = match media_type {
            MediaType::Artist => "artist_ids",
            MediaType::Album => "album_ids",
            MediaType::Track => "track_ids",
            MediaType::Playlist => {
                return Err(LibraryError::Unsupported(
                    "playlists cannot be added to or removed from Qobuz favorites".to_string(),
                ))
            }
        };

        let result = self
            .fetch(endpoint, params([(key, item_id)]), &RequestOptions::live())
            .await?;
        debug!(endpoint, item_id, %media_type, success = result.is_some(), "Updated favorites");
        Ok(result.is_some())
    }
}

/// `type` value of a search restricted to one media type
fn search_type(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Artist => "artists",
        MediaType::Album => "albums",
        MediaType::Track => "tracks",
        MediaType::Playlist => "playlists",
    }
}

/// `items` of the collection stored under `key`
fn collection_items<'a>(payload: &'a Value, key: &str) -> &'a [Value] {
    payload
        .get(key)
        .and_then(|collection| collection.get("items"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

#[async_trait]
impl MusicProvider for QobuzProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn name(&self) -> &str {
        DISPLAY_NAME
    }

    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        media_types: &[MediaType],
        limit: u32,
    ) -> core_library::Result<SearchResults> {
        let mut search_params = params([("query", query.to_string()), ("limit", limit.to_string())]);
        // The API takes a single type; anything else searches everything
        if let [only] = media_types {
            search_params.insert("type".to_string(), search_type(*only).to_string());
        }

        let mut results = SearchResults::default();
        let Some(payload) = self
            .fetch("catalog/search", search_params, &RequestOptions::cached())
            .await?
        else {
            return Ok(results);
        };

        let wants = |media_type: MediaType| media_types.is_empty() || media_types.contains(&media_type);

        if wants(MediaType::Artist) {
            results.artists = self.artists_from(collection_items(&payload, "artists"));
        }
        if wants(MediaType::Album) {
            results.albums = self.albums_from(collection_items(&payload, "albums"));
        }
        if wants(MediaType::Track) {
            results.tracks = self.tracks_from(collection_items(&payload, "tracks"));
        }
        if wants(MediaType::Playlist) {
            let items = collection_items(&payload, "playlists");
            if !items.is_empty() {
                let user_id = self.session_user_id().await?;
                results.playlists = self.playlists_from(items, user_id.as_deref());
            }
        }

        debug!(count = results.len(), "Search complete");
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn get_library_artists(&self) -> core_library::Result<Vec<Artist>> {
        let items = self.favorites("artists").await?;
        Ok(self.artists_from(&items))
    }

    #[instrument(skip(self))]
    async fn get_library_albums(&self) -> core_library::Result<Vec<Album>> {
        let items = self.favorites("albums").await?;
        Ok(self.albums_from(&items))
    }

    #[instrument(skip(self))]
    async fn get_library_tracks(&self) -> core_library::Result<Vec<Track>> {
        let items = self.favorites("tracks").await?;
        Ok(self.tracks_from(&items))
    }

    #[instrument(skip(self))]
    async fn get_playlists(&self) -> core_library::Result<Vec<Playlist>> {
        // A fresh checksum on every call: always live, but still cached
        let checksum = self.client.clock().unix_timestamp_millis().to_string();
        let items = self
            .paginator
            .fetch_all(
                "playlist/getUserPlaylists",
                Params::new(),
                "playlists",
                0,
                0,
                Some(checksum),
            )
            .await?;

        let user_id = self.session_user_id().await?;
        Ok(self.playlists_from(&items, user_id.as_deref()))
    }

    #[instrument(skip(self))]
    async fn get_artist(&self, artist_id: &str) -> core_library::Result<Option<Artist>> {
        let payload = self
            .fetch("artist/get", params([("artist_id", artist_id)]), &RequestOptions::cached())
            .await?;
        Ok(payload.and_then(|p| self.normalizer.parse_artist(&p)))
    }

    #[instrument(skip(self))]
    async fn get_album(&self, album_id: &str) -> core_library::Result<Option<Album>> {
        let payload = self
            .fetch("album/get", params([("album_id", album_id)]), &RequestOptions::cached())
            .await?;
        match payload {
            Some(p) => Ok(self.normalizer.parse_album(&p)?),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn get_track(&self, track_id: &str) -> core_library::Result<Option<Track>> {
        let payload = self
            .fetch("track/get", params([("track_id", track_id)]), &RequestOptions::cached())
            .await?;
        match payload {
            Some(p) => Ok(self.normalizer.parse_track(&p)?),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn get_playlist(&self, playlist_id: &str) -> core_library::Result<Option<Playlist>> {
        let payload = self
            .fetch("playlist/get", params([("playlist_id", playlist_id)]), &RequestOptions::cached())
            .await?;
        let Some(payload) = payload else {
            return Ok(None);
        };
        let user_id = self.session_user_id().await?;
        Ok(self.normalizer.parse_playlist(&payload, user_id.as_deref()))
    }

    #[instrument(skip(self))]
    async fn get_album_tracks(&self, album_id: &str) -> core_library::Result<Vec<Track>> {
        let items = self
            .paginator
            .fetch_all("album/get", params([("album_id", album_id)]), "tracks", 0, 0, None)
            .await?;
        Ok(self.tracks_from(&items))
    }

    #[instrument(skip(self))]
    async fn get_playlist_tracks(
        &self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> core_library::Result<Vec<Track>> {
        // The playlist's update marker is the freshness token of its pages
        let Some(playlist) = self
            .fetch("playlist/get", params([("playlist_id", playlist_id)]), &RequestOptions::live())
            .await?
        else {
            warn!(playlist_id, "Playlist unavailable");
            return Ok(Vec::new());
        };
        let checksum = playlist.get("updated_at").and_then(id_string);

        let items = self
            .paginator
            .fetch_all(
                "playlist/get",
                params([("playlist_id", playlist_id), ("extra", "tracks")]),
                "tracks",
                limit,
                offset,
                checksum,
            )
            .await?;
        Ok(self.tracks_from(&items))
    }

    #[instrument(skip(self))]
    async fn get_artist_albums(
        &self,
        artist_id: &str,
        limit: u32,
        offset: u32,
    ) -> core_library::Result<Vec<Album>> {
        let items = self
            .paginator
            .fetch_all(
                "artist/get",
                params([("artist_id", artist_id), ("extra", "albums")]),
                "albums",
                limit,
                offset,
                None,
            )
            .await?;

        // Appearances on other artists' records are listed too
        let own: Vec<Value> = items
            .into_iter()
            .filter(|item| {
                item.get("artist")
                    .and_then(|artist| artist.get("id"))
                    .and_then(id_string)
                    .is_some_and(|id| id == artist_id)
            })
            .collect();
        Ok(self.albums_from(&own))
    }

    #[instrument(skip(self))]
    async fn get_artist_toptracks(&self, artist_id: &str) -> core_library::Result<Vec<Track>> {
        let artist = self.get_artist(artist_id).await?.ok_or_else(|| QobuzError::NotFound {
            kind: "artist",
            id: artist_id.to_string(),
        })?;

        let search_params = params([
            ("query", artist.name),
            ("limit", TOP_TRACKS_LIMIT.to_string()),
            ("type", "tracks".to_string()),
        ]);
        let Some(payload) = self
            .fetch("catalog/search", search_params, &RequestOptions::cached())
            .await?
        else {
            return Ok(Vec::new());
        };

        let performed: Vec<Value> = collection_items(&payload, "tracks")
            .iter()
            .filter(|item| {
                item.get("performer")
                    .and_then(|performer| performer.get("id"))
                    .and_then(id_string)
                    .is_some_and(|id| id == artist_id)
            })
            .cloned()
            .collect();
        Ok(self.tracks_from(&performed))
    }

    #[instrument(skip(self))]
    async fn add_library(&self, item_id: &str, media_type: MediaType) -> core_library::Result<bool> {
        self.update_favorite("favorite/create", item_id, media_type).await
    }

    #[instrument(skip(self))]
    async fn remove_library(&self, item_id: &str, media_type: MediaType) -> core_library::Result<bool> {
        self.update_favorite("favorite/delete", item_id, media_type).await
    }

    #[instrument(skip(self))]
    async fn add_playlist_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> core_library::Result<bool> {
        if track_ids.is_empty() {
            return Ok(false);
        }

        let result = self
            .fetch(
                "playlist/addTracks",
                params([("playlist_id", playlist_id.to_string()), ("track_ids", track_ids.join(","))]),
                &RequestOptions::live(),
            )
            .await?;
        Ok(result.is_some())
    }

    #[instrument(skip(self))]
    async fn remove_playlist_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> core_library::Result<bool> {
        let items = self
            .paginator
            .fetch_all(
                "playlist/get",
                params([("playlist_id", playlist_id), ("extra", "tracks")]),
                "tracks",
                0,
                0,
                None,
            )
            .await?;

        // Deletion addresses playlist entries, not catalog tracks
        let memberships: Vec<String> = items
            .iter()
            .filter(|item| {
                item.get("id")
                    .and_then(id_string)
                    .is_some_and(|id| track_ids.contains(&id))
            })
            .filter_map(|item| item.get("playlist_track_id").and_then(id_string))
            .collect();

        if memberships.is_empty() {
            debug!(playlist_id, "None of the tracks are in the playlist");
            return Ok(false);
        }

        let result = self
            .fetch(
                "playlist/deleteTracks",
                params([
                    ("playlist_id", playlist_id.to_string()),
                    ("playlist_track_ids", memberships.join(",")),
                ]),
                &RequestOptions::live(),
            )
            .await?;
        Ok(result.is_some())
    }

    #[instrument(skip(self))]
    async fn get_stream_details(&self, track_id: &str) -> core_library::Result<Option<StreamDetails>> {
        // Asking for the best format directly sometimes yields an empty
        // answer, so every format is tried from best to worst
        let mut resolved = None;
        for format_id in STREAM_FORMAT_IDS {
            let file_params = params([
                ("format_id", format_id.to_string()),
                ("track_id", track_id.to_string()),
                ("intent", "stream".to_string()),
            ]);
            let payload = self
                .fetch("track/getFileUrl", file_params, &RequestOptions::signed())
                .await?;

            if let Some(payload) = payload {
                let has_url = payload
                    .get("url")
                    .and_then(Value::as_str)
                    .is_some_and(|url| !url.is_empty());
                if has_url {
                    resolved = Some((format_id, payload));
                    break;
                }
            }
            debug!(format_id, "No stream URL for format");
        }

        let Some((format_id, mut details)) = resolved else {
            error!(track_id, "Unable to retrieve stream URL");
            return Ok(None);
        };

        if let Value::Object(map) = &mut details {
            map.entry("format_id").or_insert_with(|| Value::from(format_id));
        }

        let mime_type = details
            .get("mime_type")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let content_type = mime_type
            .split_once('/')
            .map(|(_, subtype)| subtype)
            .unwrap_or(mime_type)
            .to_string();
        let sample_rate = details
            .get("sampling_rate")
            .and_then(Value::as_f64)
            .map(|khz| (khz * 1000.0).round() as u32)
            .unwrap_or(44_100);
        let bit_depth = details
            .get("bit_depth")
            .and_then(Value::as_u64)
            .and_then(|depth| u32::try_from(depth).ok())
            .unwrap_or(16);

        Ok(Some(StreamDetails {
            kind: StreamKind::Url,
            provider: PROVIDER_ID.to_string(),
            item_id: track_id.to_string(),
            path: details
                .get("url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            content_type,
            sample_rate,
            bit_depth,
            details,
        }))
    }
}
