//! Deezer's public REST API. Needs no authentication.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::ports::deezer::{DeezerError, PendingTrack, ResolvedAlbum, ResolvedPair};

pub const DEEZER_API_URL: &str = "https://api.deezer.com";

// Deezer answers unknown ISRCs, UPCs and ids with this error code.
const NO_DATA_CODE: u32 = 800;

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: u32,
}

/// Every endpoint replies either with the document or with `{"error": {...}}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiResponse<T> {
    Error { error: ApiErrorBody },
    Ok(T),
}

impl<T> ApiResponse<T> {
    pub fn into_result(self, what: &str) -> Result<T, DeezerError> {
        match self {
            ApiResponse::Ok(value) => Ok(value),
            ApiResponse::Error { error } if error.code == NO_DATA_CODE => Err(
                DeezerError::NonStreamable(format!("{}: {}", what, error.message)),
            ),
            ApiResponse::Error { error } => Err(DeezerError::Api(format!(
                "{}: {} ({}, code {})",
                what, error.message, error.kind, error.code
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiId {
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub struct ApiTrack {
    pub id: u64,
    pub album: ApiId,
}

#[derive(Debug, Deserialize)]
pub struct ApiArtist {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiTrackList {
    pub data: Vec<ApiId>,
}

#[derive(Debug, Deserialize)]
pub struct ApiAlbum {
    pub id: u64,
    pub title: String,
    pub artist: ApiArtist,
    pub tracks: ApiTrackList,
}

impl From<ApiAlbum> for ResolvedAlbum {
    fn from(album: ApiAlbum) -> Self {
        let album_id = album.id.to_string();
        let tracks = album
            .tracks
            .data
            .into_iter()
            .map(|track| PendingTrack {
                id: track.id.to_string(),
                album_id: album_id.clone(),
            })
            .collect();

        Self {
            id: album_id,
            title: album.title,
            artist: album.artist.name,
            tracks,
        }
    }
}

async fn get<T: DeserializeOwned>(
    client: &reqwest::Client,
    path: &str,
    what: &str,
) -> Result<T, DeezerError> {
    let response: ApiResponse<T> = client
        .get(format!("{}/{}", DEEZER_API_URL, path))
        .timeout(Duration::from_secs(10))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    response.into_result(what)
}

pub async fn track_by_isrc(
    client: &reqwest::Client,
    isrc: &str,
) -> Result<ResolvedPair, DeezerError> {
    let track: ApiTrack = get(
        client,
        &format!("track/isrc:{}", urlencoding::encode(isrc)),
        &format!("track with isrc {}", isrc),
    )
    .await?;

    Ok(ResolvedPair {
        track_id: track.id.to_string(),
        album_id: track.album.id.to_string(),
    })
}

pub async fn album_id_by_upc(client: &reqwest::Client, upc: &str) -> Result<String, DeezerError> {
    let album: ApiId = get(
        client,
        &format!("album/upc:{}", urlencoding::encode(upc)),
        &format!("album with upc {}", upc),
    )
    .await?;

    Ok(album.id.to_string())
}

pub async fn album(client: &reqwest::Client, album_id: &str) -> Result<ApiAlbum, DeezerError> {
    get(
        client,
        &format!("album/{}", urlencoding::encode(album_id)),
        &format!("album {}", album_id),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_response() {
        let response: ApiResponse<ApiTrack> = serde_json::from_str(
            r#"{"id": 3135556, "title": "Harder, Better, Faster, Stronger", "isrc": "GBDUW0000059",
                "album": {"id": 302127, "title": "Discovery"}}"#,
        )
        .unwrap();

        let track = response.into_result("track").unwrap();
        assert_eq!(track.id, 3135556);
        assert_eq!(track.album.id, 302127);
    }

    #[test]
    fn test_no_data_is_not_streamable() {
        let response: ApiResponse<ApiTrack> = serde_json::from_str(
            r#"{"error": {"type": "DataException", "message": "no data", "code": 800}}"#,
        )
        .unwrap();

        let error = response.into_result("track with isrc X").unwrap_err();
        assert!(matches!(error, DeezerError::NonStreamable(_)));
    }

    #[test]
    fn test_other_errors_are_fatal() {
        let response: ApiResponse<ApiTrack> = serde_json::from_str(
            r#"{"error": {"type": "Exception", "message": "Quota limit exceeded", "code": 4}}"#,
        )
        .unwrap();

        let error = response.into_result("track").unwrap_err();
        assert!(matches!(error, DeezerError::Api(_)));
        assert!(error.to_string().contains("Quota limit exceeded"));
    }

    #[test]
    fn test_album_into_resolved_album() {
        let response: ApiResponse<ApiAlbum> = serde_json::from_str(
            r#"{"id": 302127, "title": "Discovery", "artist": {"id": 27, "name": "Daft Punk"},
                "tracks": {"data": [{"id": 3135553}, {"id": 3135554}]}}"#,
        )
        .unwrap();

        let album: ResolvedAlbum = response.into_result("album").unwrap().into();
        assert_eq!(album.id, "302127");
        assert_eq!(album.artist, "Daft Punk");
        assert_eq!(
            album.tracks,
            vec![
                PendingTrack {
                    id: "3135553".into(),
                    album_id: "302127".into()
                },
                PendingTrack {
                    id: "3135554".into(),
                    album_id: "302127".into()
                },
            ]
        );
    }
}
