use std::sync::Arc;

use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection};

use crate::database::DownloadDatabase;

async fn memory_connection() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:?mode=rwc");
    // Every pooled connection would otherwise get its own empty in-memory database.
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    SeaDatabase::connect(opt).await.unwrap()
}

pub async fn test_download_db() -> Arc<DownloadDatabase> {
    let downloads = memory_connection().await;
    let failed = memory_connection().await;

    let db = DownloadDatabase::from_connections(downloads, failed)
        .await
        .unwrap_or_else(|e| panic!("Failed to create download tables: {}", e));

    Arc::new(db)
}
