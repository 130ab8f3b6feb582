use std::sync::Arc;

use reqwest::cookie::Jar;
use tokio::sync::Mutex;

use crate::database::DownloadDatabase;
use crate::deezer::gateway::{self, GatewaySession};
use crate::deezer::media::DeezerTrack;
use crate::deezer::{DeezerConfig, api};
use crate::ports::deezer::{
    DeezerClient, DeezerError, DownloadableTrack, PendingAlbum, PendingTrack, ResolvedAlbum,
    ResolvedPair,
};
use crate::services::arl::Arl;

const DEEZER_URL: &str = "https://www.deezer.com";

/// One Deezer session, bound to a single ARL.
///
/// The session holds gateway tokens between `login` and `close`. Public API lookups
/// work without them.
pub struct DeezerSession {
    http: reqwest::Client,
    config: DeezerConfig,
    database: Arc<DownloadDatabase>,
    session: Mutex<Option<GatewaySession>>,
}

impl DeezerSession {
    pub fn connect(
        arl: &Arl,
        config: DeezerConfig,
        database: Arc<DownloadDatabase>,
    ) -> Result<Self, DeezerError> {
        let url = DEEZER_URL
            .parse::<reqwest::Url>()
            .map_err(|e| DeezerError::Api(format!("Invalid Deezer url: {}", e)))?;

        let jar = Jar::default();
        jar.add_cookie_str(
            &format!("arl={}; Domain=.deezer.com; Path=/; Secure", arl.as_str()),
            &url,
        );

        let http = reqwest::Client::builder()
            .cookie_provider(Arc::new(jar))
            .build()?;

        Ok(Self {
            http,
            config,
            database,
            session: Mutex::new(None),
        })
    }

    async fn gateway_session(&self) -> Result<GatewaySession, DeezerError> {
        self.session
            .lock()
            .await
            .clone()
            .ok_or_else(|| DeezerError::Authentication("Deezer session is not logged in".into()))
    }
}

#[async_trait::async_trait]
impl DeezerClient for DeezerSession {
    async fn login(&self) -> Result<(), DeezerError> {
        let session = gateway::login(&self.http).await?;
        log::info!("Logged into Deezer as user {}", session.user_id);
        *self.session.lock().await = Some(session);
        Ok(())
    }

    async fn close(&self) {
        if self.session.lock().await.take().is_some() {
            log::debug!("Closed Deezer session");
        }
    }

    async fn get_track(&self, isrc: &str) -> Result<ResolvedPair, DeezerError> {
        api::track_by_isrc(&self.http, isrc).await
    }

    async fn get_album_by_upc(&self, upc: &str) -> Result<String, DeezerError> {
        api::album_id_by_upc(&self.http, upc).await
    }

    async fn resolve_album(&self, album: &PendingAlbum) -> Result<ResolvedAlbum, DeezerError> {
        let resolved: ResolvedAlbum = api::album(&self.http, &album.id).await?.into();
        log::debug!(
            "Resolved album {} - {} with {} tracks",
            resolved.artist,
            resolved.title,
            resolved.tracks.len()
        );
        Ok(resolved)
    }

    async fn resolve_track(
        &self,
        track: &PendingTrack,
    ) -> Result<Option<Box<dyn DownloadableTrack>>, DeezerError> {
        if self.database.is_downloaded(&track.id).await? {
            log::debug!("Track {} is already downloaded", track.id);
            return Ok(None);
        }

        let session = self.gateway_session().await?;
        let song = gateway::song_data(&self.http, &session, &track.id).await?;

        let source =
            gateway::media_source(&self.http, &session, &song.track_token, self.config.quality)
                .await?;
        let Some(source) = source else {
            log::warn!(
                "No media available for track {} - {} ({})",
                song.artist,
                song.title,
                track.id
            );
            return Ok(None);
        };

        let media: Box<dyn DownloadableTrack> = Box::new(DeezerTrack::new(
            self.http.clone(),
            self.database.clone(),
            &self.config.download_folder,
            song.meta(),
            source,
        ));
        Ok(Some(media))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::deezer::Quality;
    use crate::test_utils::test_download_db;

    fn config() -> DeezerConfig {
        DeezerConfig {
            download_folder: std::env::temp_dir(),
            quality: Quality::Flac,
        }
    }

    #[tokio::test]
    async fn test_already_downloaded_track_resolves_to_nothing() {
        let database = test_download_db().await;
        database.mark_downloaded("42").await.unwrap();

        let client = DeezerSession::connect(&Arl::new("a".repeat(192)), config(), database)
            .unwrap();
        let track = PendingTrack {
            id: "42".into(),
            album_id: "1".into(),
        };

        assert!(client.resolve_track(&track).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_track_requires_login() {
        let database = test_download_db().await;
        let client = DeezerSession::connect(&Arl::new("a".repeat(192)), config(), database)
            .unwrap();
        let track = PendingTrack {
            id: "42".into(),
            album_id: "1".into(),
        };

        let result = client.resolve_track(&track).await;

        assert!(matches!(result, Err(DeezerError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_close_without_login_is_harmless() {
        let database = test_download_db().await;
        let client = DeezerSession::connect(&Arl::new("a".repeat(192)), config(), database)
            .unwrap();

        client.close().await;
        client.close().await;

        assert!(client.session.lock().await.is_none());
    }
}
