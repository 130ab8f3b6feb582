use color_eyre::eyre::Result;

/// Decoupled representation of a Spotify track from the API.
#[derive(Debug, Clone)]
pub struct SpotifyApiTrack {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album_name: String,
    pub isrc: Option<String>,
}

/// Port trait wrapping the Spotify API capabilities used by business logic.
///
/// Implementations live in `spotify_rs::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SpotifyClient: Send + Sync {
    /// Every track of a playlist, following pagination to the end.
    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<SpotifyApiTrack>>;

    /// The UPC of an album, if Spotify knows one.
    async fn album_upc(&self, album_id: &str) -> Result<Option<String>>;
}
