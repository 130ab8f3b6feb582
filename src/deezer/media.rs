use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::database::DownloadDatabase;
use crate::deezer::crypto::StripeDecryptor;
use crate::deezer::gateway::MediaSource;
use crate::ports::deezer::{DeezerError, DownloadableTrack, TrackMeta};

/// Replace characters that are not allowed in file names
pub fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `<folder>/<Artist> - <Album>/[<D>-]<NN>. <Title> [<id>].<ext>`
///
/// The disc prefix is only written past the first disc. The track id keeps
/// different tracks that share a title and position apart.
pub fn track_path(folder: &Path, meta: &TrackMeta, extension: &str) -> PathBuf {
    let album_dir = sanitize(&format!("{} - {}", meta.artist, meta.album));
    let position = if meta.disc_number > 1 {
        format!("{}-{:02}", meta.disc_number, meta.track_number)
    } else {
        format!("{:02}", meta.track_number)
    };
    let file_name = format!(
        "{}. {} [{}].{}",
        position,
        sanitize(&meta.title),
        sanitize(&meta.id),
        extension
    );
    folder.join(album_dir).join(file_name)
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut partial = destination.as_os_str().to_owned();
    partial.push(".part");
    PathBuf::from(partial)
}

/// A Deezer track with a known media source, ready to be written to disk.
pub struct DeezerTrack {
    http: reqwest::Client,
    database: Arc<DownloadDatabase>,
    meta: TrackMeta,
    source: MediaSource,
    destination: PathBuf,
}

impl DeezerTrack {
    pub fn new(
        http: reqwest::Client,
        database: Arc<DownloadDatabase>,
        folder: &Path,
        meta: TrackMeta,
        source: MediaSource,
    ) -> Self {
        let destination = track_path(folder, &meta, source.extension());
        Self {
            http,
            database,
            meta,
            source,
            destination,
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    async fn record_failure(&self, error: &DeezerError) {
        let recorded = self
            .database
            .mark_failed("track", &self.meta.id, &error.to_string())
            .await;
        if let Err(db_error) = recorded {
            log::error!(
                "Failed to record failed download of track {}: {}",
                self.meta.id,
                db_error
            );
        }

        match self.database.failure_count(&self.meta.id).await {
            Ok(failures) => log::warn!(
                "Download of track {} failed ({} attempts so far): {}",
                self.meta.id,
                failures,
                error
            ),
            Err(_) => log::warn!("Download of track {} failed: {}", self.meta.id, error),
        }
    }

    async fn fetch_to(&self, partial: &Path) -> Result<u64, DeezerError> {
        let response = self
            .http
            .get(&self.source.url)
            .send()
            .await?
            .error_for_status()?;

        let mut file = tokio::fs::File::create(partial).await?;
        let mut stream = response.bytes_stream();
        let mut decryptor = StripeDecryptor::new(&self.meta.id);
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let plain = decryptor.update(&chunk?)?;
            file.write_all(&plain).await?;
            written += plain.len() as u64;
        }
        let tail = decryptor.finish();
        file.write_all(&tail).await?;
        written += tail.len() as u64;
        file.flush().await?;

        Ok(written)
    }
}

#[async_trait::async_trait]
impl DownloadableTrack for DeezerTrack {
    fn meta(&self) -> &TrackMeta {
        &self.meta
    }

    async fn preprocess(&mut self) -> Result<(), DeezerError> {
        if let Some(parent) = self.destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn download(&mut self) -> Result<(), DeezerError> {
        let partial = partial_path(&self.destination);

        match self.fetch_to(&partial).await {
            Ok(bytes) => {
                log::debug!(
                    "Fetched {} bytes of {} for track {}",
                    bytes,
                    self.source.format,
                    self.meta.id
                );
                Ok(())
            }
            Err(error) => {
                if let Err(remove_error) = tokio::fs::remove_file(&partial).await {
                    log::debug!(
                        "No partial file to remove at {}: {}",
                        partial.display(),
                        remove_error
                    );
                }
                self.record_failure(&error).await;
                Err(error)
            }
        }
    }

    async fn postprocess(&mut self) -> Result<(), DeezerError> {
        tokio::fs::rename(partial_path(&self.destination), &self.destination).await?;
        self.database.mark_downloaded(&self.meta.id).await?;
        log::debug!("Saved track to: {}", self.destination().display());
        Ok(())
    }
}
