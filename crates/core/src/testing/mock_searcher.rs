//! Mock searcher for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::searcher::{SearchError, SearchQuery, SearchResult, Searcher, TorrentResult};

/// Mock implementation of the Searcher trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable search results
/// - Track search queries for assertions
/// - Simulate failures
///
/// # Example
///
/// ```rust,ignore
/// use marquee_core::testing::{MockSearcher, fixtures};
///
/// let searcher = MockSearcher::new();
/// searcher.set_results(vec![
///     fixtures::torrent_result("The.Matrix.1999.1080p", "abc123", 50),
/// ]).await;
///
/// let result = searcher.search(&SearchQuery::new("the matrix")).await?;
/// assert_eq!(result.results.len(), 1);
/// assert_eq!(searcher.search_count().await, 1);
/// ```
#[derive(Debug)]
pub struct MockSearcher {
    /// Configured results to return.
    results: Arc<RwLock<Vec<TorrentResult>>>,
    /// Recorded search queries.
    searches: Arc<RwLock<Vec<SearchQuery>>>,
    /// If set, the next search will fail with this error.
    next_error: Arc<RwLock<Option<SearchError>>>,
    /// If set, `verify` fails with this message.
    verify_error: Arc<RwLock<Option<String>>>,
}

impl Default for MockSearcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSearcher {
    /// Create a new mock searcher with empty results.
    pub fn new() -> Self {
        Self {
            results: Arc::new(RwLock::new(Vec::new())),
            searches: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            verify_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Set the results to return for subsequent searches.
    pub async fn set_results(&self, results: Vec<TorrentResult>) {
        *self.results.write().await = results;
    }

    /// Get recorded search queries.
    pub async fn recorded_searches(&self) -> Vec<SearchQuery> {
        self.searches.read().await.clone()
    }

    /// Get the number of searches performed.
    pub async fn search_count(&self) -> usize {
        self.searches.read().await.len()
    }

    /// Configure the next search to fail with the given error.
    pub async fn set_next_error(&self, error: SearchError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_verify_error(&self, message: impl Into<String>) {
        *self.verify_error.write().await = Some(message.into());
    }
}

#[async_trait]
impl Searcher for MockSearcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResult, SearchError> {
        self.searches.write().await.push(query.clone());

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let mut results = self.results.read().await.clone();
        results.sort_by(|a, b| b.seeders.cmp(&a.seeders));

        Ok(SearchResult {
            query: query.clone(),
            results,
            duration_ms: 1,
        })
    }

    async fn verify(&self) -> Result<(), SearchError> {
        match self.verify_error.read().await.clone() {
            Some(message) => Err(SearchError::ApiError(message)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_returns_configured_results() {
        let searcher = MockSearcher::new();
        searcher
            .set_results(vec![
                fixtures::torrent_result("Heat.1995.720p", "aaa", 5),
                fixtures::torrent_result("Heat.1995.1080p", "bbb", 50),
            ])
            .await;

        let result = searcher.search(&SearchQuery::new("heat")).await.unwrap();
        assert_eq!(result.results[0].seeders, 50);
        assert_eq!(searcher.recorded_searches().await[0].query, "heat");
    }

    #[tokio::test]
    async fn test_error_injection() {
        let searcher = MockSearcher::new();
        searcher
            .set_next_error(SearchError::ConnectionFailed("refused".to_string()))
            .await;

        assert!(searcher.search(&SearchQuery::new("x")).await.is_err());
        assert!(searcher.search(&SearchQuery::new("x")).await.is_ok());
        assert_eq!(searcher.search_count().await, 2);

        searcher.set_verify_error("bad api key").await;
        assert!(searcher.verify().await.is_err());
    }
}
