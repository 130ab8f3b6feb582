use std::time::Duration;

use crate::spotify_rs::types::SpotifyTokenResponse;

pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

#[derive(Debug, thiserror::Error)]
pub enum ClientTokenError {
    #[error("Spotify rejected the client credentials: {reason}")]
    InvalidCredentials { reason: String },
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(reqwest::Error),
    #[error("Failed to parse response: {0}")]
    FailedToParseResponse(reqwest::Error),
}

/// Request an app token with the client credentials flow
/// https://developer.spotify.com/documentation/web-api/tutorials/client-credentials-flow
pub async fn request_client_token(
    client: &reqwest::Client,
    client_id: &str,
    client_secret: &str,
) -> Result<SpotifyTokenResponse, ClientTokenError> {
    let response = client
        .post(SPOTIFY_TOKEN_URL)
        .form(&[("grant_type", "client_credentials")])
        .basic_auth(client_id, Some(client_secret))
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(ClientTokenError::FailedToSendRequest)?;

    if !response.status().is_success() {
        return Err(ClientTokenError::InvalidCredentials {
            reason: response
                .text()
                .await
                .unwrap_or("Failed to get error text".to_string()),
        });
    }

    response
        .json()
        .await
        .map_err(ClientTokenError::FailedToParseResponse)
}
