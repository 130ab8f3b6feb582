use crate::ports::deezer::{DeezerClient, DeezerError};

use super::Arl;

/// Environment variable holding an ARL to try before any scraped one.
pub const ARL_ENV: &str = "SPOTIRIP_ARL";

/// Outcome of searching for a working ARL.
pub enum ArlSearch<C> {
    /// The first candidate that authenticated, with its logged-in client.
    Found { arl: Arl, client: C },
    NotFound,
}

enum Attempt<C> {
    Authenticated(C),
    Rejected,
}

/// The ARL from `SPOTIRIP_ARL`, if set to something non-blank.
pub fn env_override() -> Option<Arl> {
    parse_override(std::env::var(ARL_ENV).ok())
}

fn parse_override(value: Option<String>) -> Option<Arl> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(Arl::new)
}

/// Order candidates are tried in: the override first, then the fetched ARLs from the
/// last one listed to the first.
pub fn trial_order(fetched: Vec<Arl>, env_override: Option<Arl>) -> Vec<Arl> {
    let mut arls = fetched;
    if let Some(arl) = env_override {
        arls.push(arl);
    }
    arls.reverse();
    arls
}

async fn try_candidate<C: DeezerClient>(client: C) -> Result<Attempt<C>, DeezerError> {
    match client.login().await {
        Ok(()) => Ok(Attempt::Authenticated(client)),
        Err(DeezerError::Authentication(reason)) => {
            log::debug!("ARL rejected: {}", reason);
            client.close().await;
            Ok(Attempt::Rejected)
        }
        Err(error) => {
            client.close().await;
            Err(error)
        }
    }
}

/// Try each candidate in order, one login at a time, until one authenticates.
///
/// `connect` builds an unauthenticated client for a candidate. Rejected candidates have
/// their session closed before the next is tried; the winning client is returned open.
/// Errors other than an authentication failure stop the search and propagate.
pub async fn find_working_arl<C, F>(
    candidates: Vec<Arl>,
    mut connect: F,
) -> Result<ArlSearch<C>, DeezerError>
where
    C: DeezerClient,
    F: FnMut(&Arl) -> Result<C, DeezerError>,
{
    for arl in candidates {
        log::info!("Trying ARL: {}", arl);
        let client = connect(&arl)?;

        match try_candidate(client).await? {
            Attempt::Authenticated(client) => {
                log::info!("Logged into Deezer with ARL: {}", arl);
                return Ok(ArlSearch::Found { arl, client });
            }
            Attempt::Rejected => continue,
        }
    }

    log::warn!("No working ARL found");
    Ok(ArlSearch::NotFound)
}
