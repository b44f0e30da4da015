//! Jackett search backend implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use super::{SearchCategory, SearchError, SearchQuery, SearchResult, Searcher, TorrentResult};

/// Jackett connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JackettConfig {
    /// Jackett server URL (e.g., "http://localhost:9117")
    pub url: String,
    pub api_key: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

impl JackettConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Jackett search backend, querying the aggregate `all` indexer.
pub struct JackettSearcher {
    client: Client,
    config: JackettConfig,
}

impl JackettSearcher {
    pub fn new(config: JackettConfig) -> Result<Self, SearchError> {
        if config.api_key.is_empty() {
            return Err(SearchError::NotConfigured(
                "Jackett API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| SearchError::ConnectionFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    /// Build the Jackett API URL for a search.
    fn build_search_url(&self, query: &SearchQuery) -> String {
        let mut url = format!(
            "{}/api/v2.0/indexers/all/results?apikey={}&Query={}",
            self.base_url(),
            urlencoding::encode(&self.config.api_key),
            urlencoding::encode(&query.query)
        );

        if let Some(category) = &query.category {
            url.push_str(&format!("&Category[]={}", category_to_jackett_id(category)));
        }

        url
    }

    fn build_caps_url(&self) -> String {
        format!(
            "{}/api/v2.0/indexers/all/results/torznab/api?apikey={}&t=caps",
            self.base_url(),
            urlencoding::encode(&self.config.api_key)
        )
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, SearchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::Timeout
            } else if e.is_connect() {
                SearchError::ConnectionFailed(e.to_string())
            } else {
                SearchError::ApiError(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl Searcher for JackettSearcher {
    fn name(&self) -> &str {
        "jackett"
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResult, SearchError> {
        let start = Instant::now();
        debug!(query = %query.query, category = ?query.category, "Searching Jackett");

        let response = self.get(&self.build_search_url(query)).await?;
        let jackett_response: JackettResponse = response
            .json()
            .await
            .map_err(|e| SearchError::ApiError(format!("Failed to parse response: {}", e)))?;

        let mut results: Vec<TorrentResult> = jackett_response
            .Results
            .into_iter()
            .map(TorrentResult::from)
            .collect();
        results.sort_by(|a, b| b.seeders.cmp(&a.seeders));

        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(results = results.len(), duration_ms, "Jackett search complete");

        Ok(SearchResult {
            query: query.clone(),
            results,
            duration_ms,
        })
    }

    async fn verify(&self) -> Result<(), SearchError> {
        self.get(&self.build_caps_url()).await?;
        Ok(())
    }
}

/// Map our categories to Jackett (Newznab) category IDs.
fn category_to_jackett_id(category: &SearchCategory) -> u32 {
    match category {
        SearchCategory::Movies => 2000,
        SearchCategory::Tv => 5000,
    }
}

/// Parse Jackett's date format.
fn parse_jackett_date(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(date_str, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

// Jackett API response types
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResponse {
    Results: Vec<JackettResult>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResult {
    Title: String,
    Tracker: Option<String>,
    MagnetUri: Option<String>,
    Link: Option<String>,
    InfoHash: Option<String>,
    Size: Option<i64>,
    Seeders: Option<i32>,
    Peers: Option<i32>,
    CategoryDesc: Option<String>,
    PublishDate: Option<String>,
    Details: Option<String>,
}

impl From<JackettResult> for TorrentResult {
    fn from(r: JackettResult) -> Self {
        let seeders = r.Seeders.unwrap_or(0).max(0);
        Self {
            title: r.Title,
            indexer: r.Tracker.unwrap_or_else(|| "jackett".to_string()),
            info_hash: r.InfoHash.map(|h| h.to_lowercase()),
            magnet_uri: r.MagnetUri,
            link: r.Link,
            size_bytes: r.Size.unwrap_or(0).max(0) as u64,
            seeders: seeders as u32,
            leechers: r.Peers.unwrap_or(0).saturating_sub(seeders).max(0) as u32,
            category: r.CategoryDesc,
            publish_date: r.PublishDate.and_then(|d| parse_jackett_date(&d)),
            details_url: r.Details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn searcher() -> JackettSearcher {
        JackettSearcher::new(JackettConfig::new("http://jackett:9117/", "key with space")).unwrap()
    }

    #[test]
    fn test_requires_api_key() {
        let result = JackettSearcher::new(JackettConfig::new("http://jackett:9117", ""));
        assert!(matches!(result, Err(SearchError::NotConfigured(_))));
    }

    #[test]
    fn test_build_search_url() {
        let query = SearchQuery::new("the matrix 1999").with_category(SearchCategory::Movies);
        let url = searcher().build_search_url(&query);
        assert_eq!(
            url,
            "http://jackett:9117/api/v2.0/indexers/all/results?apikey=key%20with%20space&Query=the%20matrix%201999&Category[]=2000"
        );
    }

    #[test]
    fn test_build_caps_url() {
        assert_eq!(
            searcher().build_caps_url(),
            "http://jackett:9117/api/v2.0/indexers/all/results/torznab/api?apikey=key%20with%20space&t=caps"
        );
    }

    #[test]
    fn test_result_conversion() {
        let raw: JackettResponse = serde_json::from_value(serde_json::json!({
            "Results": [{
                "Title": "Show.S01E02.720p",
                "Tracker": "1337x",
                "MagnetUri": null,
                "Link": "http://jackett:9117/dl/1337x/?jackett_apikey=k&path=abc",
                "InfoHash": "ABCDEF",
                "Size": 1024,
                "Seeders": 12,
                "Peers": 20,
                "CategoryDesc": "TV/HD",
                "PublishDate": "2024-06-15T10:30:00",
                "Details": null
            }]
        }))
        .unwrap();

        let result = TorrentResult::from(raw.Results.into_iter().next().unwrap());
        assert_eq!(result.indexer, "1337x");
        assert_eq!(result.info_hash.as_deref(), Some("abcdef"));
        assert_eq!(result.seeders, 12);
        assert_eq!(result.leechers, 8);
        assert_eq!(result.publish_date.unwrap().year(), 2024);
        assert!(result.download_link().unwrap().starts_with("http://jackett"));
    }

    #[test]
    fn test_parse_jackett_date_invalid() {
        assert!(parse_jackett_date("invalid").is_none());
        assert!(parse_jackett_date("2024-06-15T10:30:00+02:00").is_some());
    }

    #[tokio::test]
    async fn test_unreachable_backend_fails() {
        let mut config = JackettConfig::new("http://127.0.0.1:1", "key");
        config.timeout_secs = 2;
        let searcher = JackettSearcher::new(config).unwrap();
        assert!(searcher.verify().await.is_err());
    }
}
