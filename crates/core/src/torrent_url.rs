//! Torrent link handling: magnet detection, indexer host rewriting and
//! manual redirect tracing.
//!
//! Jackett hands out download links pointing at whatever host it believes it
//! runs on. Those links are rewritten to the configured Jackett host and then
//! followed by hand, because a redirect may land on a `magnet:` URI that an
//! HTTP client cannot follow.

use std::time::Duration;

use reqwest::{header::LOCATION, redirect::Policy, Client};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Maximum number of redirects followed before giving up.
pub const MAX_REDIRECTS: usize = 5;

#[derive(Debug, Error)]
pub enum TorrentUrlError {
    #[error("Invalid torrent url: {0}")]
    InvalidUrl(String),

    #[error("Too many redirects resolving {0}")]
    TooManyRedirects(String),

    #[error("Redirect without a Location header from {0}")]
    MissingLocation(String),

    #[error("Unexpected HTTP {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub fn is_magnet_url(link: &str) -> bool {
    link.trim_start().to_ascii_lowercase().starts_with("magnet:")
}

/// Point a non-magnet link at the given indexer host and port.
///
/// Magnet URIs are returned untouched.
pub fn swap_jackett_host(link: &str, host: &str, port: u16) -> Result<String, TorrentUrlError> {
    if is_magnet_url(link) {
        return Ok(link.to_string());
    }

    let mut url = Url::parse(link).map_err(|e| TorrentUrlError::InvalidUrl(format!("{link}: {e}")))?;
    url.set_host(Some(host))
        .map_err(|e| TorrentUrlError::InvalidUrl(format!("{host}: {e}")))?;
    url.set_port(Some(port))
        .map_err(|_| TorrentUrlError::InvalidUrl(format!("cannot set port on {link}")))?;
    Ok(url.to_string())
}

/// Resolves a torrent link to what the download daemon should fetch.
pub struct TorrentUrlTracer {
    client: Client,
    max_redirects: usize,
}

impl TorrentUrlTracer {
    pub fn new(timeout: Duration) -> Result<Self, TorrentUrlError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            max_redirects: MAX_REDIRECTS,
        })
    }

    /// Follow redirects by hand. A redirect to a magnet URI returns that URI,
    /// a 2xx response returns the last URL, anything else fails.
    pub async fn trace(&self, link: &str) -> Result<String, TorrentUrlError> {
        let mut current = link.to_string();

        for _ in 0..=self.max_redirects {
            if is_magnet_url(&current) {
                return Ok(current);
            }

            let response = self.client.get(&current).send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(current);
            }

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| TorrentUrlError::MissingLocation(current.clone()))?;
                let next = resolve_location(&current, location)?;
                debug!(from = %current, to = %next, "Following torrent redirect");
                current = next;
                continue;
            }

            return Err(TorrentUrlError::UnexpectedStatus {
                status: status.as_u16(),
                url: current,
            });
        }

        Err(TorrentUrlError::TooManyRedirects(link.to_string()))
    }
}

/// Resolve a `Location` header against the URL that returned it.
fn resolve_location(base: &str, location: &str) -> Result<String, TorrentUrlError> {
    if is_magnet_url(location) {
        return Ok(location.to_string());
    }
    let base = Url::parse(base).map_err(|e| TorrentUrlError::InvalidUrl(e.to_string()))?;
    base.join(location)
        .map(|u| u.to_string())
        .map_err(|e| TorrentUrlError::InvalidUrl(format!("{location}: {e}")))
}
