//! Media metadata catalog (TMDB).

mod tmdb;
mod types;

pub use tmdb::{TmdbClient, TmdbConfig};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when querying the metadata catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// Resource not found (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing or rejected API key).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

/// Movie and TV metadata lookups.
#[async_trait]
pub trait MediaCatalog: Send + Sync {
    async fn search_movies(&self, query: &str) -> Result<SearchPage<TmdbMovie>, CatalogError>;

    async fn search_tv(&self, query: &str) -> Result<SearchPage<TmdbSeries>, CatalogError>;

    async fn get_movie(&self, tmdb_id: i64) -> Result<TmdbMovie, CatalogError>;

    async fn get_tv(&self, tmdb_id: i64) -> Result<TmdbSeries, CatalogError>;

    async fn get_tv_season(&self, tmdb_id: i64, season: u32) -> Result<TmdbSeason, CatalogError>;

    /// The API configuration document (image base URLs, sizes).
    async fn configuration(&self) -> Result<serde_json::Value, CatalogError>;
}
