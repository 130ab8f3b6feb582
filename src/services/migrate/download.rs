use futures::future::join_all;

use crate::ports::deezer::{DeezerClient, DeezerError, PendingAlbum, PendingTrack};
use crate::rate_limit::AdmissionLimiter;

use super::album_filter::AlbumFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    Downloaded,
    /// The track resolved to nothing, e.g. it is already downloaded or has no media.
    Unavailable,
}

/// What happened to each selected track of one album.
#[derive(Debug)]
pub struct AlbumReport {
    pub album_id: String,
    pub title: String,
    pub downloaded: Vec<String>,
    pub unavailable: Vec<String>,
    pub failed: Vec<(String, DeezerError)>,
}

impl AlbumReport {
    fn new(album_id: &str, title: &str) -> Self {
        Self {
            album_id: album_id.to_string(),
            title: title.to_string(),
            downloaded: Vec::new(),
            unavailable: Vec::new(),
            failed: Vec::new(),
        }
    }
}

/// Resolve one track and run its download phases.
pub async fn download_track<C>(
    client: &C,
    track: &PendingTrack,
    limiter: &AdmissionLimiter,
) -> Result<TrackOutcome, DeezerError>
where
    C: DeezerClient + ?Sized,
{
    log::debug!("Resolving track {}", track.id);

    let Some(mut media) = limiter.gated(client.resolve_track(track)).await? else {
        log::debug!("Track {} resolved to nothing, skipping", track.id);
        return Ok(TrackOutcome::Unavailable);
    };

    let meta = media.meta().clone();
    log::info!("Downloading track {} - {}", meta.artist, meta.title);

    media.preprocess().await?;
    media.download().await?;
    media.postprocess().await?;

    log::debug!("Finished track {}", meta.id);
    Ok(TrackOutcome::Downloaded)
}

/// Resolve an album and download the tracks its filter selects, all concurrently.
///
/// A failing track is recorded in the report and does not stop its siblings. Only a
/// failure to resolve the album itself is returned as an error.
pub async fn download_album<C>(
    client: &C,
    album_id: &str,
    filter: &AlbumFilter,
    limiter: &AdmissionLimiter,
) -> Result<AlbumReport, DeezerError>
where
    C: DeezerClient + ?Sized,
{
    log::debug!("Resolving album {} ({})", album_id, filter);

    let pending = PendingAlbum {
        id: album_id.to_string(),
    };
    let album = limiter.gated(client.resolve_album(&pending)).await?;

    let selected: Vec<&PendingTrack> = album
        .tracks
        .iter()
        .filter(|track| filter.selects(&track.id))
        .collect();

    log::info!(
        "Downloading album {} - {} ({} of {} tracks)",
        album.artist,
        album.title,
        selected.len(),
        album.tracks.len()
    );

    let downloads = selected.into_iter().map(|track| async move {
        let outcome = download_track(client, track, limiter).await;
        (track, outcome)
    });
    let outcomes = join_all(downloads).await;

    let mut report = AlbumReport::new(&album.id, &album.title);
    for (track, outcome) in outcomes {
        match outcome {
            Ok(TrackOutcome::Downloaded) => report.downloaded.push(track.id.clone()),
            Ok(TrackOutcome::Unavailable) => report.unavailable.push(track.id.clone()),
            Err(error) => {
                log::error!("Failed to download track {}: {}", track.id, error);
                report.failed.push((track.id.clone(), error));
            }
        }
    }

    Ok(report)
}
