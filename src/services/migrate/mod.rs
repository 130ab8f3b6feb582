pub mod album_filter;
pub mod download;
pub mod resolve;

use color_eyre::eyre::{Result, WrapErr};
use futures::future::join_all;

use crate::ports::deezer::{DeezerClient, DeezerError};
use crate::ports::spotify::SpotifyClient;
use crate::rate_limit::AdmissionLimiter;

pub use album_filter::{AlbumFilter, AlbumFilters, build_album_filters};
pub use download::{AlbumReport, TrackOutcome, download_album, download_track};
pub use resolve::{TrackResolution, resolve_track, resolve_tracks, resolve_upcs};

/// Spotify ids requested for one run.
#[derive(Debug, Clone, Default)]
pub struct MigrationPlan {
    /// Playlists whose tracks are downloaded individually.
    pub playlists: Vec<String>,
    /// Albums downloaded whole.
    pub albums: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MigrationReport {
    /// ISRCs Deezer could not match.
    pub not_streamable: Vec<String>,
    pub albums: Vec<AlbumReport>,
    /// Albums that could not be resolved, so none of their tracks were attempted.
    pub failed_albums: Vec<(String, DeezerError)>,
}

impl MigrationReport {
    pub fn downloaded(&self) -> usize {
        self.albums.iter().map(|a| a.downloaded.len()).sum()
    }

    pub fn unavailable(&self) -> usize {
        self.albums.iter().map(|a| a.unavailable.len()).sum()
    }

    pub fn failed_tracks(&self) -> usize {
        self.albums.iter().map(|a| a.failed.len()).sum()
    }

    /// Number of download tasks that ended in an error.
    pub fn failures(&self) -> usize {
        self.failed_tracks() + self.failed_albums.len()
    }
}

/// Moves Spotify playlists and albums into Deezer downloads.
///
/// One `AdmissionLimiter` gates every Deezer lookup and download of the run.
pub struct Migrator<'a, D: ?Sized, S: ?Sized> {
    deezer: &'a D,
    spotify: &'a S,
    limiter: &'a AdmissionLimiter,
}

impl<'a, D, S> Migrator<'a, D, S>
where
    D: DeezerClient + ?Sized,
    S: SpotifyClient + ?Sized,
{
    pub fn new(deezer: &'a D, spotify: &'a S, limiter: &'a AdmissionLimiter) -> Self {
        Self {
            deezer,
            spotify,
            limiter,
        }
    }

    pub async fn run(&self, plan: &MigrationPlan) -> Result<MigrationReport> {
        let isrcs = self.collect_playlist_isrcs(&plan.playlists).await?;
        let upcs = self.collect_album_upcs(&plan.albums).await?;

        let album_ids = resolve_upcs(self.deezer, &upcs, self.limiter)
            .await
            .wrap_err("Failed to look up albums on Deezer")?;
        let resolution = resolve_tracks(self.deezer, &isrcs, self.limiter)
            .await
            .wrap_err("Failed to look up playlist tracks on Deezer")?;

        let filters = build_album_filters(resolution.resolved, album_ids);
        log::info!("Downloading {} albums", filters.len());
        for (album_id, filter) in filters.iter() {
            log::debug!("Album {}: {}", album_id, filter);
        }

        let mut report = self.download_albums(filters).await;
        report.not_streamable = resolution.not_streamable;
        Ok(report)
    }

    async fn collect_playlist_isrcs(&self, playlist_ids: &[String]) -> Result<Vec<String>> {
        let mut isrcs = Vec::new();
        for playlist_id in playlist_ids {
            log::debug!("Fetching Spotify playlist {}", playlist_id);
            let tracks = self
                .spotify
                .playlist_tracks(playlist_id)
                .await
                .wrap_err_with(|| format!("Failed to fetch Spotify playlist {}", playlist_id))?;

            let total = tracks.len();
            let before = isrcs.len();
            isrcs.extend(tracks.into_iter().filter_map(|track| {
                if track.isrc.is_none() {
                    log::debug!("Skipping '{} - {}': no ISRC", track.artists.join(", "), track.name);
                }
                track.isrc
            }));

            log::info!(
                "Playlist {}: {} tracks, {} with an ISRC",
                playlist_id,
                total,
                isrcs.len() - before
            );
        }
        Ok(isrcs)
    }

    async fn collect_album_upcs(&self, album_ids: &[String]) -> Result<Vec<String>> {
        let mut upcs = Vec::with_capacity(album_ids.len());
        for album_id in album_ids {
            let upc = self
                .spotify
                .album_upc(album_id)
                .await
                .wrap_err_with(|| format!("Failed to fetch Spotify album {}", album_id))?;

            match upc {
                Some(upc) => upcs.push(upc),
                None => log::warn!("Spotify album {} has no UPC, skipping", album_id),
            }
        }
        Ok(upcs)
    }

    async fn download_albums(&self, filters: AlbumFilters) -> MigrationReport {
        let downloads = filters.into_iter().map(|(album_id, filter)| async move {
            let result = download_album(self.deezer, &album_id, &filter, self.limiter).await;
            (album_id, result)
        });
        let results = join_all(downloads).await;

        let mut report = MigrationReport::default();
        for (album_id, result) in results {
            match result {
                Ok(album) => report.albums.push(album),
                Err(error) => {
                    log::error!("Failed to download album {}: {}", album_id, error);
                    report.failed_albums.push((album_id, error));
                }
            }
        }
        report
    }
}
