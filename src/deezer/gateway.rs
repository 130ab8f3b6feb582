//! Deezer's private gateway, authenticated by the `arl` cookie.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::deezer::Quality;
use crate::ports::deezer::{DeezerError, TrackMeta};

pub const GATEWAY_URL: &str = "https://www.deezer.com/ajax/gw-light.php";
pub const MEDIA_URL: &str = "https://media.deezer.com/v1/get_url";

/// Tokens handed out by a successful login
#[derive(Debug, Clone)]
pub struct GatewaySession {
    pub user_id: u64,
    pub api_token: String,
    pub license_token: String,
}

#[derive(Debug, Deserialize)]
struct GatewayResponse<T> {
    #[serde(default)]
    error: Value,
    results: Option<T>,
}

fn has_error(error: &Value) -> bool {
    match error {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        _ => true,
    }
}

async fn call<T: DeserializeOwned>(
    client: &reqwest::Client,
    method: &str,
    api_token: &str,
    body: Value,
) -> Result<T, DeezerError> {
    let response: GatewayResponse<T> = client
        .post(GATEWAY_URL)
        .query(&[
            ("method", method),
            ("input", "3"),
            ("api_version", "1.0"),
            ("api_token", api_token),
        ])
        .json(&body)
        .timeout(Duration::from_secs(10))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    if has_error(&response.error) {
        return Err(DeezerError::Api(format!(
            "{} failed: {}",
            method, response.error
        )));
    }

    response
        .results
        .ok_or_else(|| DeezerError::Api(format!("{} returned no results", method)))
}

#[derive(Debug, Deserialize)]
struct UserData {
    #[serde(rename = "USER")]
    user: User,
    #[serde(rename = "checkForm")]
    check_form: String,
}

#[derive(Debug, Deserialize)]
struct User {
    #[serde(rename = "USER_ID")]
    user_id: Value,
    #[serde(rename = "OPTIONS", default)]
    options: UserOptions,
}

#[derive(Debug, Default, Deserialize)]
struct UserOptions {
    #[serde(default)]
    license_token: String,
}

fn parse_number(value: &Value) -> u64 {
    match value {
        Value::Number(number) => number.as_u64().unwrap_or(0),
        Value::String(text) => text.parse().unwrap_or(0),
        _ => 0,
    }
}

/// Log in with the `arl` cookie already held by `client`.
///
/// Deezer does not reject a bad ARL outright; it answers with an anonymous user
/// (id 0), which is reported as an authentication failure.
pub async fn login(client: &reqwest::Client) -> Result<GatewaySession, DeezerError> {
    let data: UserData = call(client, "deezer.getUserData", "null", json!({})).await?;

    let user_id = parse_number(&data.user.user_id);
    if user_id == 0 {
        return Err(DeezerError::Authentication(
            "ARL was not accepted by Deezer".to_string(),
        ));
    }

    Ok(GatewaySession {
        user_id,
        api_token: data.check_form,
        license_token: data.user.options.license_token,
    })
}

#[derive(Debug, Deserialize)]
pub struct SongData {
    #[serde(rename = "SNG_ID")]
    pub id: Value,
    #[serde(rename = "SNG_TITLE")]
    pub title: String,
    #[serde(rename = "ART_NAME")]
    pub artist: String,
    #[serde(rename = "ALB_TITLE")]
    pub album: String,
    #[serde(rename = "DISK_NUMBER", default)]
    pub disc_number: Value,
    #[serde(rename = "TRACK_NUMBER", default)]
    pub track_number: Value,
    #[serde(rename = "TRACK_TOKEN")]
    pub track_token: String,
}

impl SongData {
    pub fn meta(&self) -> TrackMeta {
        TrackMeta {
            id: match &self.id {
                Value::String(id) => id.clone(),
                other => other.to_string(),
            },
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
            disc_number: parse_number(&self.disc_number).max(1) as u32,
            track_number: parse_number(&self.track_number) as u32,
        }
    }
}

pub async fn song_data(
    client: &reqwest::Client,
    session: &GatewaySession,
    track_id: &str,
) -> Result<SongData, DeezerError> {
    call(
        client,
        "song.getData",
        &session.api_token,
        json!({ "SNG_ID": track_id }),
    )
    .await
}

/// Where a track's media can be fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    pub url: String,
    pub format: String,
}

impl MediaSource {
    pub fn extension(&self) -> &'static str {
        if self.format == "FLAC" { "flac" } else { "mp3" }
    }
}

#[derive(Debug, Serialize)]
struct MediaFormat<'a> {
    cipher: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    #[serde(default)]
    data: Vec<MediaEntry>,
}

#[derive(Debug, Deserialize)]
struct MediaEntry {
    #[serde(default)]
    media: Vec<Media>,
}

#[derive(Debug, Deserialize)]
struct Media {
    format: String,
    #[serde(default)]
    sources: Vec<Source>,
}

#[derive(Debug, Deserialize)]
struct Source {
    url: String,
}

fn first_source(response: MediaResponse) -> Option<MediaSource> {
    let media = response.data.into_iter().next()?.media.into_iter().next()?;
    let source = media.sources.into_iter().next()?;
    Some(MediaSource {
        url: source.url,
        format: media.format,
    })
}

/// Ask for a media url in the best available format. `None` when Deezer has no
/// media for the track at any of the requested qualities.
pub async fn media_source(
    client: &reqwest::Client,
    session: &GatewaySession,
    track_token: &str,
    quality: Quality,
) -> Result<Option<MediaSource>, DeezerError> {
    let formats: Vec<MediaFormat> = quality
        .formats()
        .iter()
        .map(|format| MediaFormat {
            cipher: "BF_CBC_STRIPE",
            format,
        })
        .collect();

    let response: MediaResponse = client
        .post(MEDIA_URL)
        .json(&json!({
            "license_token": session.license_token,
            "media": [{ "type": "FULL", "formats": formats }],
            "track_tokens": [track_token],
        }))
        .timeout(Duration::from_secs(10))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(first_source(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_user_id() {
        let data: GatewayResponse<UserData> = serde_json::from_str(
            r#"{"error": [], "results": {"USER": {"USER_ID": 0}, "checkForm": "abc"}}"#,
        )
        .unwrap();

        assert!(!has_error(&data.error));
        assert_eq!(parse_number(&data.results.unwrap().user.user_id), 0);
    }

    #[test]
    fn test_logged_in_user() {
        let data: GatewayResponse<UserData> = serde_json::from_str(
            r#"{"error": {}, "results": {"USER": {"USER_ID": "1234",
                "OPTIONS": {"license_token": "lic"}}, "checkForm": "token"}}"#,
        )
        .unwrap();

        let results = data.results.unwrap();
        assert_eq!(parse_number(&results.user.user_id), 1234);
        assert_eq!(results.check_form, "token");
        assert_eq!(results.user.options.license_token, "lic");
    }

    #[test]
    fn test_gateway_error_detected() {
        let data: GatewayResponse<Value> = serde_json::from_str(
            r#"{"error": {"VALID_TOKEN_REQUIRED": "Invalid CSRF token"}, "results": {}}"#,
        )
        .unwrap();

        assert!(has_error(&data.error));
    }

    #[test]
    fn test_song_meta() {
        let song: SongData = serde_json::from_str(
            r#"{"SNG_ID": "3135556", "SNG_TITLE": "Harder, Better, Faster, Stronger",
                "ART_NAME": "Daft Punk", "ALB_TITLE": "Discovery", "DISK_NUMBER": "2", "TRACK_NUMBER": "4",
                "TRACK_TOKEN": "tok"}"#,
        )
        .unwrap();

        let meta = song.meta();
        assert_eq!(meta.id, "3135556");
        assert_eq!(meta.disc_number, 2);
        assert_eq!(meta.track_number, 4);
        assert_eq!(meta.artist, "Daft Punk");
    }

    #[test]
    fn test_missing_disc_number_means_first_disc() {
        let song: SongData = serde_json::from_str(
            r#"{"SNG_ID": 1, "SNG_TITLE": "Intro", "ART_NAME": "A", "ALB_TITLE": "B",
                "TRACK_NUMBER": 1, "TRACK_TOKEN": "tok"}"#,
        )
        .unwrap();

        assert_eq!(song.meta().disc_number, 1);
    }

    #[test]
    fn test_first_source() {
        let response: MediaResponse = serde_json::from_str(
            r#"{"data": [{"media": [{"media_type": "FULL", "cipher": {"type": "BF_CBC_STRIPE"},
                "format": "MP3_320", "sources": [{"url": "https://cdn/a", "provider": "ak"},
                {"url": "https://cdn/b", "provider": "ec"}]}]}]}"#,
        )
        .unwrap();

        let source = first_source(response).unwrap();
        assert_eq!(source.url, "https://cdn/a");
        assert_eq!(source.extension(), "mp3");
    }

    #[test]
    fn test_no_media() {
        let response: MediaResponse = serde_json::from_str(
            r#"{"data": [{"errors": [{"code": 2002, "message": "Track token has no sufficient rights on requested media"}]}]}"#,
        )
        .unwrap();

        assert_eq!(first_source(response), None);
    }
}
