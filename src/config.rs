use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::{Result, eyre::Context, eyre::eyre};
use serde::{Deserialize, Serialize};

use crate::deezer::{DeezerConfig, Quality};
use crate::services::arl::source::{ARL_LIST_URL, DEFAULT_FETCH_TIMEOUT};

const SPOTIFY_CLIENT_ID_ENV: &str = "SPOTIPY_CLIENT_ID";
const SPOTIFY_CLIENT_SECRET_ENV: &str = "SPOTIPY_CLIENT_SECRET";

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    downloads: DownloadsConfig,
    #[serde(default)]
    arl: ArlConfig,
    #[serde(default)]
    rate_limit: RateLimitConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spotify: Option<SpotifyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadsConfig {
    pub folder: String,
    #[serde(default)]
    pub quality: Quality,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArlConfig {
    #[serde(default = "default_list_url")]
    pub list_url: String,
    #[serde(default = "default_fetch_timeout", with = "humantime_duration")]
    pub fetch_timeout: Duration,
}

impl Default for ArlConfig {
    fn default() -> Self {
        Self {
            list_url: default_list_url(),
            fetch_timeout: default_fetch_timeout(),
        }
    }
}

fn default_list_url() -> String {
    ARL_LIST_URL.to_string()
}

fn default_fetch_timeout() -> Duration {
    DEFAULT_FETCH_TIMEOUT
}

/// How many Deezer requests may start within one window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_per_window")]
    pub max_per_window: NonZeroU32,
    #[serde(default = "default_window", with = "humantime_duration")]
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_per_window: default_max_per_window(),
            window: default_window(),
        }
    }
}

fn default_max_per_window() -> NonZeroU32 {
    NonZeroU32::new(20).unwrap_or(NonZeroU32::MIN)
}

fn default_window() -> Duration {
    Duration::from_secs(1)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
}

mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let value = String::deserialize(deserializer)?;
        humantime::parse_duration(&value).map_err(serde::de::Error::custom)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            downloads: DownloadsConfig {
                folder: "~/Music/spotirip".to_string(),
                quality: Quality::default(),
            },
            arl: ArlConfig::default(),
            rate_limit: RateLimitConfig::default(),
            spotify: None,
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&contents)
            .context(format!("Failed to parse config file: {}", path.display()))
    }

    fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.rate_limit.window.is_zero() {
            return Err(eyre!("rate_limit.window must be longer than zero"));
        }
        if self.downloads.folder.trim().is_empty() {
            return Err(eyre!("downloads.folder must not be empty"));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("spotirip").join("config.toml"))
    }

    /// Load config from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path().ok_or(eyre!("Config file not found"))?;

        Self::from_file(&config_path)
    }

    /// Write a default config file, unless one already exists
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().ok_or(eyre!("No config directory on this system"))?;
        Self::default().write_if_missing(&path)?;
        Ok(path)
    }

    fn write_if_missing(&self, path: &Path) -> Result<()> {
        if path.exists() {
            log::info!("Config already exists at: {}", path.display());
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .context(format!("Failed to write config file: {}", path.display()))?;
        log::info!("Wrote default config to: {}", path.display());
        Ok(())
    }

    /// Expand ~ to home directory
    fn expand_path(&self, path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Get expanded download folder
    pub fn download_folder(&self) -> PathBuf {
        self.expand_path(&self.downloads.folder)
    }

    pub fn deezer_config(&self) -> DeezerConfig {
        DeezerConfig {
            download_folder: self.download_folder(),
            quality: self.downloads.quality,
        }
    }

    pub fn arl(&self) -> &ArlConfig {
        &self.arl
    }

    pub fn rate_limit(&self) -> &RateLimitConfig {
        &self.rate_limit
    }

    /// Get Spotify credentials, falling back to environment variables
    pub fn spotify_config(&self) -> Result<SpotifyConfig> {
        if let Some(ref spotify) = self.spotify {
            return Ok(spotify.clone());
        }

        let client_id = std::env::var(SPOTIFY_CLIENT_ID_ENV).context(format!(
            "No [spotify] section in config and {} is not set",
            SPOTIFY_CLIENT_ID_ENV
        ))?;
        let client_secret = std::env::var(SPOTIFY_CLIENT_SECRET_ENV).context(format!(
            "No [spotify] section in config and {} is not set",
            SPOTIFY_CLIENT_SECRET_ENV
        ))?;

        Ok(SpotifyConfig {
            client_id,
            client_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [downloads]
            folder = "/music"
            "#,
        )
        .unwrap();

        assert_eq!(config.download_folder(), PathBuf::from("/music"));
        assert_eq!(config.downloads.quality, Quality::Flac);
        assert_eq!(config.arl().list_url, ARL_LIST_URL);
        assert_eq!(config.arl().fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.rate_limit().max_per_window.get(), 20);
        assert_eq!(config.rate_limit().window, Duration::from_secs(1));
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r#"
            [downloads]
            folder = "/music"
            quality = 1

            [arl]
            list_url = "https://example.org/arls"
            fetch_timeout = "30s"

            [rate_limit]
            max_per_window = 5
            window = "2s 500ms"

            [spotify]
            client_id = "id"
            client_secret = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.deezer_config().quality, Quality::Mp3_320);
        assert_eq!(config.arl().fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.rate_limit().max_per_window.get(), 5);
        assert_eq!(config.rate_limit().window, Duration::from_millis(2500));
        assert_eq!(config.spotify_config().unwrap().client_id, "id");
    }

    #[test]
    fn test_zero_rate_limit_is_rejected() {
        let result = Config::from_toml(
            r#"
            [downloads]
            folder = "/music"

            [rate_limit]
            max_per_window = 0
            "#,
        );
        tokio_test::assert_err!(result);

        let result = Config::from_toml(
            r#"
            [downloads]
            folder = "/music"

            [rate_limit]
            window = "0s"
            "#,
        );
        tokio_test::assert_err!(result);
    }

    #[test]
    fn test_invalid_quality_is_rejected() {
        let result = Config::from_toml(
            r#"
            [downloads]
            folder = "/music"
            quality = 7
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_expand_home() {
        let config = Config::default();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.download_folder(), home.join("Music/spotirip"));
        }
    }

    #[test]
    fn test_write_default_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spotirip").join("config.toml");

        Config::default().write_if_missing(&path).unwrap();
        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.downloads.folder, "~/Music/spotirip");
        assert_eq!(config.rate_limit().max_per_window.get(), 20);
    }

    #[test]
    fn test_write_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[downloads]\nfolder = \"/keep\"\n").unwrap();

        Config::default().write_if_missing(&path).unwrap();

        assert_eq!(
            Config::from_file(&path).unwrap().download_folder(),
            PathBuf::from("/keep")
        );
    }
}
