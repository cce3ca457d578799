//! Music provider contract
//!
//! A provider exposes one remote catalog (account library, lookups, search,
//! playable streams) through the unified model. Lookups return `Ok(None)` when
//! the remote has no usable record for the id; errors are reserved for
//! failures the host should surface (authentication, unsupported operations,
//! inconsistent remote data).

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Album, Artist, MediaType, Playlist, SearchResults, StreamDetails, Track};

#[async_trait]
pub trait MusicProvider: Send + Sync {
    /// Stable provider id used in `ProviderMapping::provider`
    fn id(&self) -> &str;

    /// Display name
    fn name(&self) -> &str;

    /// Search the catalog; only the requested media types are populated
    async fn search(
        &self,
        query: &str,
        media_types: &[MediaType],
        limit: u32,
    ) -> Result<SearchResults>;

    async fn get_library_artists(&self) -> Result<Vec<Artist>>;

    async fn get_library_albums(&self) -> Result<Vec<Album>>;

    async fn get_library_tracks(&self) -> Result<Vec<Track>>;

    /// Playlists owned or followed by the account
    async fn get_playlists(&self) -> Result<Vec<Playlist>>;

    async fn get_artist(&self, artist_id: &str) -> Result<Option<Artist>>;

    async fn get_album(&self, album_id: &str) -> Result<Option<Album>>;

    async fn get_track(&self, track_id: &str) -> Result<Option<Track>>;

    async fn get_playlist(&self, playlist_id: &str) -> Result<Option<Playlist>>;

    async fn get_album_tracks(&self, album_id: &str) -> Result<Vec<Track>>;

    /// `limit == 0` returns the whole playlist
    async fn get_playlist_tracks(
        &self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Track>>;

    /// Albums credited to the artist; `limit == 0` returns all of them
    async fn get_artist_albums(
        &self,
        artist_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Album>>;

    async fn get_artist_toptracks(&self, artist_id: &str) -> Result<Vec<Track>>;

    /// Add an item to the account library; `true` when the remote accepted it
    async fn add_library(&self, item_id: &str, media_type: MediaType) -> Result<bool>;

    async fn remove_library(&self, item_id: &str, media_type: MediaType) -> Result<bool>;

    async fn add_playlist_tracks(&self, playlist_id: &str, track_ids: &[String])
        -> Result<bool>;

    async fn remove_playlist_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<bool>;

    /// Resolve a playable stream for the track
    async fn get_stream_details(&self, track_id: &str) -> Result<Option<StreamDetails>>;

    /// Library listing for one media type, grouped like search results
    async fn get_library(&self, media_type: MediaType) -> Result<SearchResults> {
        let mut results = SearchResults::default();
        match media_type {
            MediaType::Artist => results.artists = self.get_library_artists().await?,
            MediaType::Album => results.albums = self.get_library_albums().await?,
            MediaType::Track => results.tracks = self.get_library_tracks().await?,
            MediaType::Playlist => results.playlists = self.get_playlists().await?,
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProviderMapping;
    use mockall::mock;

    mock! {
        Provider {}

        #[async_trait]
        impl MusicProvider for Provider {
            fn id(&self) -> &str;
            fn name(&self) -> &str;
            async fn search(&self, query: &str, media_types: &[MediaType], limit: u32) -> Result<SearchResults>;
            async fn get_library_artists(&self) -> Result<Vec<Artist>>;
            async fn get_library_albums(&self) -> Result<Vec<Album>>;
            async fn get_library_tracks(&self) -> Result<Vec<Track>>;
            async fn get_playlists(&self) -> Result<Vec<Playlist>>;
            async fn get_artist(&self, artist_id: &str) -> Result<Option<Artist>>;
            async fn get_album(&self, album_id: &str) -> Result<Option<Album>>;
            async fn get_track(&self, track_id: &str) -> Result<Option<Track>>;
            async fn get_playlist(&self, playlist_id: &str) -> Result<Option<Playlist>>;
            async fn get_album_tracks(&self, album_id: &str) -> Result<Vec<Track>>;
            async fn get_playlist_tracks(&self, playlist_id: &str, limit: u32, offset: u32) -> Result<Vec<Track>>;
            async fn get_artist_albums(&self, artist_id: &str, limit: u32, offset: u32) -> Result<Vec<Album>>;
            async fn get_artist_toptracks(&self, artist_id: &str) -> Result<Vec<Track>>;
            async fn add_library(&self, item_id: &str, media_type: MediaType) -> Result<bool>;
            async fn remove_library(&self, item_id: &str, media_type: MediaType) -> Result<bool>;
            async fn add_playlist_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<bool>;
            async fn remove_playlist_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<bool>;
            async fn get_stream_details(&self, track_id: &str) -> Result<Option<StreamDetails>>;
        }
    }

    #[tokio::test]
    async fn test_get_library_dispatches_by_media_type() {
        let mut provider = MockProvider::new();
        provider
            .expect_get_library_artists()
            .times(1)
            .returning(|| Ok(vec![Artist::new("qobuz", "1", "Nina Simone")]));
        provider.expect_get_library_albums().never();

        let results = provider.get_library(MediaType::Artist).await.unwrap();

        assert_eq!(results.artists.len(), 1);
        assert_eq!(
            results.artists[0].provider_ids,
            vec![ProviderMapping::new("qobuz", "1")]
        );
        assert!(results.albums.is_empty());
        assert!(results.tracks.is_empty());
        assert!(results.playlists.is_empty());
    }

    #[tokio::test]
    async fn test_get_library_propagates_errors() {
        let mut provider = MockProvider::new();
        provider.expect_get_playlists().returning(|| {
            Err(crate::LibraryError::Unsupported("playlists".to_string()))
        });

        assert!(provider.get_library(MediaType::Playlist).await.is_err());
    }
}
