//! TMDB (The Movie Database) API client.
//!
//! Uses the v3 API with the `api_key` query parameter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{SearchPage, TmdbMovie, TmdbSeason, TmdbSeries};
use super::{CatalogError, MediaCatalog};

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// TMDB API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    pub api_key: String,
    /// Base URL (default: https://api.themoviedb.org/3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl TmdbConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// TMDB API client.
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    pub fn new(config: TmdbConfig) -> Result<Self, CatalogError> {
        if config.api_key.is_empty() {
            return Err(CatalogError::NotConfigured(
                "TMDB API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
        })
    }

    /// GET `path` and decode the JSON body. `what` names the resource in
    /// `NotFound` errors.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        what: impl FnOnce() -> String,
    ) -> Result<T, CatalogError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED => {
                return Err(CatalogError::NotConfigured(
                    "Invalid TMDB API key".to_string(),
                ))
            }
            StatusCode::NOT_FOUND => return Err(CatalogError::NotFound(what())),
            StatusCode::TOO_MANY_REQUESTS => return Err(CatalogError::RateLimitExceeded),
            _ => {}
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::ParseError(format!("{path}: {e}")))
    }
}

#[async_trait]
impl MediaCatalog for TmdbClient {
    async fn search_movies(&self, query: &str) -> Result<SearchPage<TmdbMovie>, CatalogError> {
        debug!(query, "TMDB movie search");
        self.get_json("/search/movie", &[("query", query)], || {
            format!("movie search '{query}'")
        })
        .await
    }

    async fn search_tv(&self, query: &str) -> Result<SearchPage<TmdbSeries>, CatalogError> {
        debug!(query, "TMDB TV search");
        self.get_json("/search/tv", &[("query", query)], || {
            format!("tv search '{query}'")
        })
        .await
    }

    async fn get_movie(&self, tmdb_id: i64) -> Result<TmdbMovie, CatalogError> {
        debug!(tmdb_id, "TMDB get movie");
        self.get_json(&format!("/movie/{tmdb_id}"), &[], || {
            format!("Movie ID {tmdb_id}")
        })
        .await
    }

    async fn get_tv(&self, tmdb_id: i64) -> Result<TmdbSeries, CatalogError> {
        debug!(tmdb_id, "TMDB get TV");
        self.get_json(&format!("/tv/{tmdb_id}"), &[], || {
            format!("TV series ID {tmdb_id}")
        })
        .await
    }

    async fn get_tv_season(&self, tmdb_id: i64, season: u32) -> Result<TmdbSeason, CatalogError> {
        debug!(tmdb_id, season, "TMDB get season");
        self.get_json(&format!("/tv/{tmdb_id}/season/{season}"), &[], || {
            format!("TV series {tmdb_id} season {season}")
        })
        .await
    }

    async fn configuration(&self) -> Result<serde_json::Value, CatalogError> {
        self.get_json("/configuration", &[], || "configuration".to_string())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_api_key() {
        let result = TmdbClient::new(TmdbConfig::new(""));
        assert!(matches!(result, Err(CatalogError::NotConfigured(_))));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let mut config = TmdbConfig::new("key");
        config.base_url = Some("http://localhost:9999/3/".to_string());
        let client = TmdbClient::new(config).unwrap();
        assert_eq!(client.base_url, "http://localhost:9999/3");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_http_error() {
        let mut config = TmdbConfig::new("key");
        config.base_url = Some("http://127.0.0.1:1".to_string());
        config.timeout_secs = 2;
        let client = TmdbClient::new(config).unwrap();

        let result = client.configuration().await;
        assert!(matches!(result, Err(CatalogError::HttpError(_))));
    }
}
