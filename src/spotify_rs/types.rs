use serde::Deserialize;

use crate::ports::spotify::SpotifyApiTrack;

/// Spotify client-credentials token response
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

/// Spotify track from API
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    /// Local files in a playlist have no id
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    pub album: SpotifyAlbumRef,
    pub external_ids: Option<SpotifyExternalIds>,
}

impl SpotifyTrack {
    pub fn isrc(&self) -> Option<&str> {
        self.external_ids.as_ref()?.isrc.as_deref()
    }
}

impl From<SpotifyTrack> for SpotifyApiTrack {
    fn from(track: SpotifyTrack) -> Self {
        let isrc = track.isrc().map(str::to_string);
        Self {
            id: track.id.unwrap_or_default(),
            name: track.name,
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            album_name: track.album.name,
            isrc,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

/// The album as embedded in a track object
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbumRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    pub name: String,
    pub external_ids: Option<SpotifyExternalIds>,
}

impl SpotifyAlbum {
    pub fn upc(&self) -> Option<&str> {
        self.external_ids.as_ref()?.upc.as_deref()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyExternalIds {
    pub isrc: Option<String>,
    pub upc: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistTrackObject {
    pub track: Option<SpotifyTrack>,
}

/// One page of a paginated Spotify listing
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYLIST_PAGE: &str = r#"{
        "items": [
            {
                "track": {
                    "id": "4uLU6hMCjMI75M1A2tKUQC",
                    "name": "Never Gonna Give You Up",
                    "artists": [{"id": "0gxyHStUsqpMadRV0Di1Qt", "name": "Rick Astley"}],
                    "album": {"id": "6N9PS4QXF1D0OWPk0Sxtb4", "name": "Whenever You Need Somebody"},
                    "external_ids": {"isrc": "GBARL9300135"}
                }
            },
            {"track": null},
            {
                "track": {
                    "id": null,
                    "name": "local file",
                    "artists": [],
                    "album": {"name": "local"},
                    "external_ids": {}
                }
            }
        ],
        "next": "https://api.spotify.com/v1/playlists/abc/tracks?offset=100&limit=100"
    }"#;

    #[test]
    fn test_deserialize_playlist_page() {
        let page: Page<PlaylistTrackObject> = serde_json::from_str(PLAYLIST_PAGE).unwrap();

        assert_eq!(page.items.len(), 3);
        assert!(page.items[1].track.is_none());
        assert!(page.next.is_some());

        let first = page.items[0].track.clone().unwrap();
        assert_eq!(first.isrc(), Some("GBARL9300135"));

        let local = page.items[2].track.clone().unwrap();
        assert_eq!(local.isrc(), None);
    }

    #[test]
    fn test_track_into_port_type() {
        let page: Page<PlaylistTrackObject> = serde_json::from_str(PLAYLIST_PAGE).unwrap();
        let track: SpotifyApiTrack = page.items[0].track.clone().unwrap().into();

        assert_eq!(track.id, "4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(track.artists, vec!["Rick Astley"]);
        assert_eq!(track.album_name, "Whenever You Need Somebody");
        assert_eq!(track.isrc.as_deref(), Some("GBARL9300135"));
    }

    #[test]
    fn test_album_upc() {
        let album: SpotifyAlbum = serde_json::from_str(
            r#"{"id": "a1", "name": "Album", "external_ids": {"upc": "00602537817016"}}"#,
        )
        .unwrap();
        assert_eq!(album.upc(), Some("00602537817016"));

        let album: SpotifyAlbum =
            serde_json::from_str(r#"{"id": "a2", "name": "No ids"}"#).unwrap();
        assert_eq!(album.upc(), None);
    }
}
