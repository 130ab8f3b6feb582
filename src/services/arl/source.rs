use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use super::Arl;

pub const ARL_LIST_URL: &str = "https://rentry.org/firehawk52";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

static ARL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[a-z0-9]{192}").expect("ARL pattern is a valid regex"));

#[derive(Debug, thiserror::Error)]
pub enum ArlRetrievalError {
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(reqwest::Error),
    #[error("Failed to retrieve ARLs: {status}")]
    UnsuccessfulStatus { status: reqwest::StatusCode },
    #[error("Failed to read response body: {0}")]
    FailedToReadBody(reqwest::Error),
    #[error("ARL list is not valid UTF-8: {0}")]
    InvalidBody(#[from] std::string::FromUtf8Error),
}

/// The public document candidate ARLs are scraped from.
pub struct ArlSource {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl ArlSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout,
        }
    }

    /// Fetch the document once and return every ARL-shaped token in document order.
    ///
    /// An empty list is not an error here; the failover loop reports exhaustion.
    pub async fn fetch_candidates(&self) -> Result<Vec<Arl>, ArlRetrievalError> {
        log::debug!("Fetching ARL list from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(ArlRetrievalError::FailedToSendRequest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArlRetrievalError::UnsuccessfulStatus { status });
        }

        let body = response
            .bytes()
            .await
            .map_err(ArlRetrievalError::FailedToReadBody)?;
        let body = String::from_utf8(body.to_vec())?;

        let candidates = extract_candidates(&body);
        log::info!("Found {} candidate ARLs", candidates.len());
        Ok(candidates)
    }
}

impl Default for ArlSource {
    fn default() -> Self {
        Self::new(ARL_LIST_URL, DEFAULT_FETCH_TIMEOUT)
    }
}

/// Every non-overlapping 192-character lower-case alphanumeric run, leftmost first.
pub fn extract_candidates(body: &str) -> Vec<Arl> {
    ARL_PATTERN
        .find_iter(body)
        .map(|m| Arl::new(m.as_str()))
        .collect()
}
