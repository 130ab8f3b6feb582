use color_eyre::{Result, eyre::Context};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ActiveValue, ColumnTrait, ConnectOptions,
    ConnectionTrait, Database as SeaDatabase, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter,
};
use std::path::Path;
use std::time::Duration;

use crate::entities;

const DOWNLOADS_FILE: &str = "downloads.sl3";
const FAILED_FILE: &str = "failed.sl3";

const DOWNLOADS_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS downloads (
    id TEXT PRIMARY KEY NOT NULL,
    created_at INTEGER NOT NULL
)";

const FAILED_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS failed_downloads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    media_type TEXT NOT NULL,
    item_id TEXT NOT NULL,
    reason TEXT NOT NULL,
    created_at INTEGER NOT NULL
)";

/// The two download databases: tracks already downloaded, and downloads that failed.
pub struct DownloadDatabase {
    pub(crate) downloads: DatabaseConnection,
    pub(crate) failed: DatabaseConnection,
}

impl DownloadDatabase {
    /// Open or create both databases inside the download folder
    pub async fn open(folder: &Path) -> Result<Self> {
        log::debug!("Opening download databases in: {}", folder.display());

        std::fs::create_dir_all(folder).context(format!(
            "Failed to create download directory: {}",
            folder.display()
        ))?;

        let downloads = connect(&folder.join(DOWNLOADS_FILE)).await?;
        let failed = connect(&folder.join(FAILED_FILE)).await?;

        let database = Self::from_connections(downloads, failed)
            .await
            .context("Failed to create download database tables")?;

        log::info!("Download databases ready in: {}", folder.display());
        Ok(database)
    }

    pub(crate) async fn from_connections(
        downloads: DatabaseConnection,
        failed: DatabaseConnection,
    ) -> Result<Self, DbErr> {
        downloads.execute_unprepared(DOWNLOADS_SCHEMA).await?;
        failed.execute_unprepared(FAILED_SCHEMA).await?;
        Ok(Self { downloads, failed })
    }

    pub async fn is_downloaded(&self, track_id: &str) -> Result<bool, DbErr> {
        let found = entities::download::Entity::find_by_id(track_id.to_string())
            .one(&self.downloads)
            .await?;
        Ok(found.is_some())
    }

    pub async fn mark_downloaded(&self, track_id: &str) -> Result<(), DbErr> {
        if self.is_downloaded(track_id).await? {
            return Ok(());
        }

        let model = entities::download::ActiveModel {
            id: ActiveValue::Set(track_id.to_string()),
            created_at: ActiveValue::Set(chrono::Utc::now().timestamp()),
        };
        model.insert(&self.downloads).await?;
        log::debug!("Recorded download of track {}", track_id);
        Ok(())
    }

    pub async fn mark_failed(
        &self,
        media_type: &str,
        item_id: &str,
        reason: &str,
    ) -> Result<(), DbErr> {
        let model = entities::failed_download::ActiveModel {
            media_type: ActiveValue::Set(media_type.to_string()),
            item_id: ActiveValue::Set(item_id.to_string()),
            reason: ActiveValue::Set(reason.to_string()),
            ..entities::failed_download::ActiveModel::new()
        };
        model.insert(&self.failed).await?;
        log::debug!("Recorded failed {} download: {}", media_type, item_id);
        Ok(())
    }

    pub async fn failure_count(&self, item_id: &str) -> Result<u64, DbErr> {
        entities::failed_download::Entity::find()
            .filter(entities::failed_download::Column::ItemId.eq(item_id))
            .count(&self.failed)
            .await
    }
}

/// sqlite url for a file path. The path is percent-encoded so `?`, `#` and `%` in
/// folder names reach sqlite unchanged.
fn sqlite_url(path: &Path) -> String {
    format!(
        "sqlite://{}?mode=rwc",
        urlencoding::encode(&path.to_string_lossy())
    )
}

async fn connect(path: &Path) -> Result<DatabaseConnection> {
    let url = sqlite_url(path);

    let mut opt = ConnectOptions::new(url);
    opt.max_connections(5)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    SeaDatabase::connect(opt)
        .await
        .context(format!("Failed to open database: {}", path.display()))
}
