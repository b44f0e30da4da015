//! Types for torrent client operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::torrent_url::is_magnet_url;

/// Download-daemon torrent id.
pub type TorrentId = i64;

/// Errors that can occur during torrent client operations.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Torrent not found: {0}")]
    TorrentNotFound(String),

    #[error("Invalid torrent data: {0}")]
    InvalidTorrent(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Torrent client not configured: {0}")]
    NotConfigured(String),
}

/// State of a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    /// Stopped by the user or added paused.
    Paused,
    /// Waiting for or running a local data check.
    Checking,
    /// Queued for download.
    Queued,
    Downloading,
    /// Queued for seeding or seeding.
    Seeding,
    Unknown,
}

impl TorrentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentState::Paused => "paused",
            TorrentState::Checking => "checking",
            TorrentState::Queued => "queued",
            TorrentState::Downloading => "downloading",
            TorrentState::Seeding => "seeding",
            TorrentState::Unknown => "unknown",
        }
    }
}

/// Information about a torrent held by the download daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentInfo {
    pub id: TorrentId,
    /// Info hash (lowercase hex).
    pub hash: String,
    pub name: String,
    pub state: TorrentState,
    /// Download progress (0.0 - 1.0).
    pub progress: f64,
    pub size_bytes: u64,
    pub downloaded_bytes: u64,
    pub uploaded_bytes: u64,
    /// Current download speed in bytes/second.
    pub download_speed: u64,
    /// Current upload speed in bytes/second.
    pub upload_speed: u64,
    pub ratio: f64,
    /// ETA in seconds (None if unknown or complete).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<String>,
    /// Error reported by the daemon for this torrent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TorrentInfo {
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }
}

/// Where the torrent metadata comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TorrentSource {
    Magnet(String),
    /// URL of a .torrent file the daemon downloads itself.
    Url(String),
}

/// Request to add a new torrent.
#[derive(Debug, Clone, PartialEq)]
pub struct AddTorrentRequest {
    pub source: TorrentSource,
    /// Optional download directory override.
    pub download_dir: Option<String>,
    /// Start paused.
    pub paused: bool,
}

impl AddTorrentRequest {
    pub fn magnet(uri: impl Into<String>) -> Self {
        Self::new(TorrentSource::Magnet(uri.into()))
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self::new(TorrentSource::Url(url.into()))
    }

    /// Magnet request for magnet URIs, URL request for anything else.
    pub fn from_link(link: impl Into<String>) -> Self {
        let link = link.into();
        if is_magnet_url(&link) {
            Self::magnet(link)
        } else {
            Self::url(link)
        }
    }

    fn new(source: TorrentSource) -> Self {
        Self {
            source,
            download_dir: None,
            paused: false,
        }
    }

    pub fn with_download_dir(mut self, dir: impl Into<String>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    pub fn with_paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }
}

/// Result of adding a torrent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddTorrentResult {
    pub id: TorrentId,
    /// Info hash of the added torrent.
    pub hash: String,
    /// Name of the torrent (may be the magnet's display name initially).
    pub name: String,
    /// The daemon already had this torrent.
    #[serde(default)]
    pub duplicate: bool,
}

/// Trait for download daemon backends.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    async fn add_torrent(
        &self,
        request: AddTorrentRequest,
    ) -> Result<AddTorrentResult, TorrentClientError>;

    /// Remove torrents, optionally deleting their downloaded data.
    async fn remove_torrents(
        &self,
        ids: &[TorrentId],
        delete_data: bool,
    ) -> Result<(), TorrentClientError>;

    async fn get_torrent(&self, id: TorrentId) -> Result<TorrentInfo, TorrentClientError>;

    /// Torrents with the given ids. An empty slice lists every torrent.
    async fn get_torrents(&self, ids: &[TorrentId])
        -> Result<Vec<TorrentInfo>, TorrentClientError>;

    /// Check that the daemon is reachable and accepts our credentials.
    async fn verify(&self) -> Result<(), TorrentClientError>;
}
