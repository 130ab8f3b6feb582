/// Failures surfaced by the Deezer client.
///
/// Callers branch on the variant: an `Authentication` failure is recoverable while
/// searching for a working ARL, and `NonStreamable` is recoverable per track while
/// resolving ISRCs. Everything else is fatal for the operation that raised it.
#[derive(Debug, thiserror::Error)]
pub enum DeezerError {
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Not streamable: {0}")]
    NonStreamable(String),
    #[error("Deezer API error: {0}")]
    Api(String),
    #[error("Failed to send http request: {0}")]
    Http(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decrypt media: {0}")]
    Decryption(String),
    #[error("Download database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// A Deezer track id together with the id of the album it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedPair {
    pub track_id: String,
    pub album_id: String,
}

/// An album that has not been fetched from Deezer yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAlbum {
    pub id: String,
}

/// A track listed on a resolved album, not yet resolved into something downloadable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTrack {
    pub id: String,
    pub album_id: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedAlbum {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub tracks: Vec<PendingTrack>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMeta {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub disc_number: u32,
    pub track_number: u32,
}

/// A track that resolved to a downloadable media source.
///
/// The three phases always run in order: `preprocess`, `download`, `postprocess`.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DownloadableTrack: Send + Sync {
    fn meta(&self) -> &TrackMeta;

    async fn preprocess(&mut self) -> Result<(), DeezerError>;

    async fn download(&mut self) -> Result<(), DeezerError>;

    async fn postprocess(&mut self) -> Result<(), DeezerError>;
}

/// Port trait wrapping the Deezer capabilities used by business logic.
///
/// Implementations live in `deezer::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DeezerClient: Send + Sync {
    async fn login(&self) -> Result<(), DeezerError>;

    /// Release the session held by this client.
    async fn close(&self);

    /// Look a track up by its ISRC.
    async fn get_track(&self, isrc: &str) -> Result<ResolvedPair, DeezerError>;

    /// Look an album up by its UPC, returning the Deezer album id.
    async fn get_album_by_upc(&self, upc: &str) -> Result<String, DeezerError>;

    async fn resolve_album(&self, album: &PendingAlbum) -> Result<ResolvedAlbum, DeezerError>;

    /// `Ok(None)` means the track exists but there is nothing to download for it.
    async fn resolve_track(
        &self,
        track: &PendingTrack,
    ) -> Result<Option<Box<dyn DownloadableTrack>>, DeezerError>;
}
