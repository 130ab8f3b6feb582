use futures::future::join_all;

use crate::ports::deezer::{DeezerClient, DeezerError, ResolvedPair};
use crate::rate_limit::AdmissionLimiter;

/// Result of resolving a batch of ISRCs. Always well-defined, even when some lookups
/// found nothing.
#[derive(Debug, Default)]
pub struct TrackResolution {
    pub resolved: Vec<ResolvedPair>,
    pub not_streamable: Vec<String>,
}

/// Map one ISRC to its Deezer track and album ids.
pub async fn resolve_track<C>(
    client: &C,
    isrc: &str,
    limiter: &AdmissionLimiter,
) -> Result<ResolvedPair, DeezerError>
where
    C: DeezerClient + ?Sized,
{
    limiter.gated(client.get_track(isrc)).await
}

/// Resolve every ISRC concurrently.
///
/// A not-streamable track is logged and left out; the rest of the batch still resolves.
/// Any other failure is returned once the whole batch has settled.
pub async fn resolve_tracks<C>(
    client: &C,
    isrcs: &[String],
    limiter: &AdmissionLimiter,
) -> Result<TrackResolution, DeezerError>
where
    C: DeezerClient + ?Sized,
{
    log::debug!("Resolving {} tracks on Deezer", isrcs.len());

    let lookups = isrcs.iter().map(|isrc| async move {
        let result = resolve_track(client, isrc, limiter).await;
        (isrc, result)
    });
    let results = join_all(lookups).await;

    let mut resolution = TrackResolution::default();
    let mut fatal = None;
    for (isrc, result) in results {
        match result {
            Ok(pair) => resolution.resolved.push(pair),
            Err(DeezerError::NonStreamable(reason)) => {
                log::warn!("Failed to find track on Deezer: isrc {} ({})", isrc, reason);
                resolution.not_streamable.push(isrc.clone());
            }
            Err(error) => {
                log::error!("Track lookup failed for isrc {}: {}", isrc, error);
                fatal.get_or_insert(error);
            }
        }
    }

    if let Some(error) = fatal {
        return Err(error);
    }

    log::info!(
        "Resolved {} of {} tracks on Deezer",
        resolution.resolved.len(),
        isrcs.len()
    );
    Ok(resolution)
}

/// Map album UPCs to Deezer album ids concurrently. UPCs Deezer does not know are
/// logged and skipped.
pub async fn resolve_upcs<C>(
    client: &C,
    upcs: &[String],
    limiter: &AdmissionLimiter,
) -> Result<Vec<String>, DeezerError>
where
    C: DeezerClient + ?Sized,
{
    let lookups = upcs.iter().map(|upc| async move {
        let result = limiter.gated(client.get_album_by_upc(upc)).await;
        (upc, result)
    });
    let results = join_all(lookups).await;

    let mut album_ids = Vec::with_capacity(upcs.len());
    let mut fatal = None;
    for (upc, result) in results {
        match result {
            Ok(album_id) => album_ids.push(album_id),
            Err(DeezerError::NonStreamable(reason)) => {
                log::warn!("Failed to find album on Deezer: upc {} ({})", upc, reason);
            }
            Err(error) => {
                log::error!("Album lookup failed for upc {}: {}", upc, error);
                fatal.get_or_insert(error);
            }
        }
    }

    match fatal {
        Some(error) => Err(error),
        None => Ok(album_ids),
    }
}
