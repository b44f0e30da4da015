//! Mock media catalog for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::media::{
    CatalogError, MediaCatalog, SearchPage, TmdbMovie, TmdbSeason, TmdbSeries,
};

/// A recorded catalog query for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCatalogQuery {
    SearchMovies { query: String },
    SearchTv { query: String },
    GetMovie { tmdb_id: i64 },
    GetTv { tmdb_id: i64 },
    GetTvSeason { tmdb_id: i64, season: u32 },
    Configuration,
}

/// Mock implementation of the MediaCatalog trait.
///
/// Searches match on a case-insensitive substring of the title or name.
///
/// # Example
///
/// ```rust,ignore
/// use marquee_core::testing::{MockMediaCatalog, fixtures};
///
/// let catalog = MockMediaCatalog::new();
/// catalog.add_season(1399, fixtures::tmdb_season(1, 10)).await;
///
/// let season = catalog.get_tv_season(1399, 1).await?;
/// assert_eq!(season.episodes.len(), 10);
/// ```
#[derive(Debug)]
pub struct MockMediaCatalog {
    movies: Arc<RwLock<HashMap<i64, TmdbMovie>>>,
    series: Arc<RwLock<HashMap<i64, TmdbSeries>>>,
    /// Seasons by (series id, season number).
    seasons: Arc<RwLock<HashMap<(i64, u32), TmdbSeason>>>,
    configuration: Arc<RwLock<serde_json::Value>>,
    queries: Arc<RwLock<Vec<RecordedCatalogQuery>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<CatalogError>>>,
}

impl Default for MockMediaCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMediaCatalog {
    pub fn new() -> Self {
        Self {
            movies: Arc::new(RwLock::new(HashMap::new())),
            series: Arc::new(RwLock::new(HashMap::new())),
            seasons: Arc::new(RwLock::new(HashMap::new())),
            configuration: Arc::new(RwLock::new(serde_json::json!({
                "images": {"secure_base_url": "https://image.tmdb.org/t/p/"}
            }))),
            queries: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn add_movie(&self, movie: TmdbMovie) {
        self.movies.write().await.insert(movie.id, movie);
    }

    pub async fn add_series(&self, series: TmdbSeries) {
        self.series.write().await.insert(series.id, series);
    }

    pub async fn add_season(&self, series_id: i64, season: TmdbSeason) {
        self.seasons
            .write()
            .await
            .insert((series_id, season.season_number), season);
    }

    pub async fn set_configuration(&self, configuration: serde_json::Value) {
        *self.configuration.write().await = configuration;
    }

    pub async fn recorded_queries(&self) -> Vec<RecordedCatalogQuery> {
        self.queries.read().await.clone()
    }

    pub async fn clear_recorded(&self) {
        self.queries.write().await.clear();
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: CatalogError) {
        *self.next_error.write().await = Some(error);
    }

    async fn record(&self, query: RecordedCatalogQuery) -> Result<(), CatalogError> {
        self.queries.write().await.push(query);
        match self.next_error.write().await.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MediaCatalog for MockMediaCatalog {
    async fn search_movies(&self, query: &str) -> Result<SearchPage<TmdbMovie>, CatalogError> {
        self.record(RecordedCatalogQuery::SearchMovies {
            query: query.to_string(),
        })
        .await?;

        let needle = query.to_lowercase();
        let mut results: Vec<TmdbMovie> = self
            .movies
            .read()
            .await
            .values()
            .filter(|m| m.title.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        results.sort_by_key(|m| m.id);
        Ok(SearchPage::single(results))
    }

    async fn search_tv(&self, query: &str) -> Result<SearchPage<TmdbSeries>, CatalogError> {
        self.record(RecordedCatalogQuery::SearchTv {
            query: query.to_string(),
        })
        .await?;

        let needle = query.to_lowercase();
        let mut results: Vec<TmdbSeries> = self
            .series
            .read()
            .await
            .values()
            .filter(|s| s.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        results.sort_by_key(|s| s.id);
        Ok(SearchPage::single(results))
    }

    async fn get_movie(&self, tmdb_id: i64) -> Result<TmdbMovie, CatalogError> {
        self.record(RecordedCatalogQuery::GetMovie { tmdb_id }).await?;
        self.movies
            .read()
            .await
            .get(&tmdb_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("movie {tmdb_id}")))
    }

    async fn get_tv(&self, tmdb_id: i64) -> Result<TmdbSeries, CatalogError> {
        self.record(RecordedCatalogQuery::GetTv { tmdb_id }).await?;
        self.series
            .read()
            .await
            .get(&tmdb_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("tv {tmdb_id}")))
    }

    async fn get_tv_season(&self, tmdb_id: i64, season: u32) -> Result<TmdbSeason, CatalogError> {
        self.record(RecordedCatalogQuery::GetTvSeason { tmdb_id, season })
            .await?;
        self.seasons
            .read()
            .await
            .get(&(tmdb_id, season))
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("tv {tmdb_id} season {season}")))
    }

    async fn configuration(&self) -> Result<serde_json::Value, CatalogError> {
        self.record(RecordedCatalogQuery::Configuration).await?;
        Ok(self.configuration.read().await.clone())
    }
}
