pub mod download;
pub mod failed_download;
