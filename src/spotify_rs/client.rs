use std::num::NonZeroU32;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use color_eyre::Result;
use color_eyre::eyre::Context;
use governor::{
    Quota, RateLimiter, clock::DefaultClock, state::InMemoryState, state::direct::NotKeyed,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::ports::spotify::{SpotifyApiTrack, SpotifyClient};
use crate::spotify_rs::auth::{ClientTokenError, request_client_token};
use crate::spotify_rs::types::{Page, PlaylistTrackObject, SpotifyAlbum, SpotifyTrack};

const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";

const REQUESTS_PER_SECOND: NonZeroU32 = NonZeroU32::new(10).unwrap();

// Refresh the token this long before Spotify says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug, thiserror::Error)]
pub enum SpotifyRequestError {
    #[error("Failed to get Spotify token: {0}")]
    Token(#[from] ClientTokenError),
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(reqwest::Error),
    #[error("Spotify responded with status {status}")]
    UnsuccessfulStatus { status: StatusCode },
    #[error("Failed to parse response: {0}")]
    FailedToParseResponse(reqwest::Error),
}

impl SpotifyRequestError {
    fn is_transient(&self) -> bool {
        match self {
            Self::FailedToSendRequest(_) => true,
            Self::UnsuccessfulStatus { status } => {
                *status == StatusCode::TOO_MANY_REQUESTS
                    || *status == StatusCode::UNAUTHORIZED
                    || status.is_server_error()
            }
            Self::Token(_) | Self::FailedToParseResponse(_) => false,
        }
    }
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Spotify Web API client authenticated with the client credentials flow
pub struct SpotifyApiClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
    rate_limiter: DirectRateLimiter,
}

impl SpotifyApiClient {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id,
            client_secret,
            token: Mutex::new(None),
            rate_limiter: RateLimiter::direct(Quota::per_second(REQUESTS_PER_SECOND)),
        }
    }

    async fn access_token(&self) -> Result<String, SpotifyRequestError> {
        let mut token = self.token.lock().await;

        if let Some(cached) = token.as_ref().filter(|t| Instant::now() < t.expires_at) {
            return Ok(cached.access_token.clone());
        }

        log::debug!("Requesting new Spotify access token");
        let response =
            request_client_token(&self.client, &self.client_id, &self.client_secret).await?;
        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);

        *token = Some(CachedToken {
            access_token: response.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(response.access_token)
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &str) -> Result<T, SpotifyRequestError> {
        self.rate_limiter.until_ready().await;

        let access_token = self.access_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(SpotifyRequestError::FailedToSendRequest)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.token.lock().await.take();
        }
        if !status.is_success() {
            return Err(SpotifyRequestError::UnsuccessfulStatus { status });
        }

        response
            .json()
            .await
            .map_err(SpotifyRequestError::FailedToParseResponse)
    }

    /// GET a JSON document, retrying rate limiting and server errors with backoff
    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, SpotifyRequestError> {
        (|| self.get_once(url))
            .retry(ExponentialBuilder::default().with_max_times(4))
            .when(SpotifyRequestError::is_transient)
            .notify(|error, delay| {
                log::warn!(
                    "Spotify request to {} failed ({}), retrying in {}",
                    url,
                    error,
                    humantime::format_duration(delay)
                );
            })
            .await
    }

    /// Get all tracks in a playlist
    pub async fn get_playlist_tracks(&self, playlist_id: &str) -> Result<Vec<SpotifyTrack>> {
        let mut all_tracks = Vec::new();
        let mut next_url = Some(format!(
            "{}/playlists/{}/tracks?limit=100",
            SPOTIFY_API_URL, playlist_id
        ));

        while let Some(url) = next_url {
            let page: Page<PlaylistTrackObject> = self
                .get(&url)
                .await
                .wrap_err_with(|| format!("Failed to fetch tracks of playlist {}", playlist_id))?;

            all_tracks.extend(page.items.into_iter().filter_map(|item| item.track));
            next_url = page.next;
        }

        log::debug!(
            "Fetched {} tracks from playlist {}",
            all_tracks.len(),
            playlist_id
        );
        Ok(all_tracks)
    }

    pub async fn get_album(&self, album_id: &str) -> Result<SpotifyAlbum> {
        self.get(&format!("{}/albums/{}", SPOTIFY_API_URL, album_id))
            .await
            .wrap_err_with(|| format!("Failed to fetch album {}", album_id))
    }
}

#[async_trait::async_trait]
impl SpotifyClient for SpotifyApiClient {
    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<SpotifyApiTrack>> {
        let tracks = self.get_playlist_tracks(playlist_id).await?;
        Ok(tracks.into_iter().map(SpotifyApiTrack::from).collect())
    }

    async fn album_upc(&self, album_id: &str) -> Result<Option<String>> {
        let album = self.get_album(album_id).await?;
        log::debug!("Spotify album {} ({}) has UPC {:?}", album_id, album.name, album.upc());
        Ok(album.upc().map(str::to_string))
    }
}
