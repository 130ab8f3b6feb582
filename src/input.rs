use std::path::Path;

use color_eyre::{Result, eyre::Context};
use url::Url;

/// Reduce a Spotify reference to its bare id.
///
/// Accepts a bare id, a `spotify:<kind>:<id>` URI or an
/// `https://open.spotify.com/<kind>/<id>` URL. Anything else is returned trimmed
/// and unchanged.
pub fn parse_spotify_id(reference: &str) -> String {
    let reference = reference.trim();

    if let Some(rest) = reference.strip_prefix("spotify:") {
        if let Some(id) = rest.rsplit(':').next() {
            return id.to_string();
        }
    }

    if let Ok(url) = Url::parse(reference) {
        if url.host_str() == Some("open.spotify.com") {
            if let Some(id) = url
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            {
                return id.to_string();
            }
        }
    }

    reference.to_string()
}

/// Read one Spotify reference per line, skipping blank lines
pub fn read_ids_from_file(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .context(format!("Failed to read id list: {}", path.display()))?;

    let ids: Vec<String> = contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_spotify_id)
        .collect();

    log::debug!("Read {} ids from {}", ids.len(), path.display());
    Ok(ids)
}
