pub mod api;
pub mod client;
pub mod crypto;
pub mod gateway;
pub mod media;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use client::DeezerSession;

/// Audio quality to request from Deezer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Quality {
    Mp3_128,
    Mp3_320,
    #[default]
    Flac,
}

impl Quality {
    /// Media formats to ask for, best first. Deezer serves the first one available.
    pub fn formats(self) -> &'static [&'static str] {
        match self {
            Quality::Mp3_128 => &["MP3_128"],
            Quality::Mp3_320 => &["MP3_320", "MP3_128"],
            Quality::Flac => &["FLAC", "MP3_320", "MP3_128"],
        }
    }
}

impl TryFrom<u8> for Quality {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Quality::Mp3_128),
            1 => Ok(Quality::Mp3_320),
            2 => Ok(Quality::Flac),
            other => Err(format!(
                "Invalid quality {}, expected 0 (MP3 128), 1 (MP3 320) or 2 (FLAC)",
                other
            )),
        }
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        match quality {
            Quality::Mp3_128 => 0,
            Quality::Mp3_320 => 1,
            Quality::Flac => 2,
        }
    }
}

/// Settings every Deezer session is built with
#[derive(Debug, Clone)]
pub struct DeezerConfig {
    pub download_folder: PathBuf,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_from_number() {
        assert_eq!(Quality::try_from(0), Ok(Quality::Mp3_128));
        assert_eq!(Quality::try_from(2), Ok(Quality::Flac));
        assert!(Quality::try_from(3).is_err());
    }

    #[test]
    fn test_formats_fall_back_to_lower_quality() {
        assert_eq!(Quality::Flac.formats()[0], "FLAC");
        assert_eq!(Quality::Mp3_320.formats(), &["MP3_320", "MP3_128"]);
        assert_eq!(Quality::default(), Quality::Flac);
    }
}
