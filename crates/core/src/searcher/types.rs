//! Types for the torrent search system.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::MediaType;

/// Query parameters for a torrent search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text search query.
    pub query: String,
    /// Optional: limit to one content category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<SearchCategory>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: SearchCategory) -> Self {
        self.category = Some(category);
        self
    }
}

/// Content category for filtering search results.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SearchCategory {
    Movies,
    Tv,
}

impl From<MediaType> for SearchCategory {
    fn from(media_type: MediaType) -> Self {
        match media_type {
            MediaType::Movie => SearchCategory::Movies,
            MediaType::Tv => SearchCategory::Tv,
        }
    }
}

/// A single indexer listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentResult {
    pub title: String,
    /// Which indexer returned this result.
    pub indexer: String,
    /// Info hash (lowercase hex), when the indexer reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnet_uri: Option<String>,
    /// .torrent download link, usually proxied through the indexer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub size_bytes: u64,
    pub seeders: u32,
    pub leechers: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details_url: Option<String>,
}

impl TorrentResult {
    /// Magnet URI if present, otherwise the download link.
    pub fn download_link(&self) -> Option<&str> {
        self.magnet_uri
            .as_deref()
            .filter(|m| !m.is_empty())
            .or_else(|| self.link.as_deref().filter(|l| !l.is_empty()))
    }
}

/// Search result with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The search query that was executed.
    pub query: SearchQuery,
    /// Results ordered by seeders, highest first.
    pub results: Vec<TorrentResult>,
    /// How long the search took in milliseconds.
    pub duration_ms: u64,
}

/// Errors that can occur during search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search backend connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Search backend API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Search backend not configured: {0}")]
    NotConfigured(String),
}

/// Trait for torrent search backends.
#[async_trait]
pub trait Searcher: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Execute a search across the backend's indexers.
    async fn search(&self, query: &SearchQuery) -> Result<SearchResult, SearchError>;

    /// Check that the backend is reachable and accepts our credentials.
    async fn verify(&self) -> Result<(), SearchError>;
}
