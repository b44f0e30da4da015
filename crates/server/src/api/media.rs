//! Catalog and indexer search handlers. All three routes sit behind the
//! response cache.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use marquee_core::media::{MediaType, SearchPage, TmdbMovie, TmdbSeries};
use marquee_core::searcher::{SearchQuery, TorrentResult};
use marquee_core::Settings;

use super::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
}

impl SearchParams {
    fn media_type(&self, default: MediaType) -> Result<MediaType, ApiError> {
        match self.media_type.as_deref() {
            None | Some("") => Ok(default),
            Some(value) => {
                MediaType::from_str(value).map_err(|message| ApiError::field("media_type", message))
            }
        }
    }

    fn query(&self) -> Result<&str, ApiError> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ApiError::field("q", "This field is required."))
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MediaSearchResponse {
    Movies(SearchPage<TmdbMovie>),
    Series(SearchPage<TmdbSeries>),
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MediaDetailResponse {
    Movie(TmdbMovie),
    Series(TmdbSeries),
}

fn current_settings(state: &AppState) -> Result<Settings, ApiError> {
    state
        .settings()
        .get()?
        .ok_or_else(ApiError::missing_settings)
}

/// GET /api/search/media?q=&media_type=
pub async fn search_media(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<MediaSearchResponse>, ApiError> {
    let media_type = params.media_type(MediaType::Tv)?;
    let query = params.query()?;

    let settings = current_settings(&state)?;
    let catalog = state.clients().catalog(&settings)?;

    let response = match media_type {
        MediaType::Movie => MediaSearchResponse::Movies(catalog.search_movies(query).await?),
        MediaType::Tv => MediaSearchResponse::Series(catalog.search_tv(query).await?),
    };
    Ok(Json(response))
}

/// GET /api/search/media/{media_type}/{media_id}
///
/// TV lookups fetch every season so each season summary carries its episodes.
pub async fn media_detail(
    State(state): State<Arc<AppState>>,
    Path((media_type, media_id)): Path<(String, i64)>,
) -> Result<Json<MediaDetailResponse>, ApiError> {
    let media_type = MediaType::from_str(&media_type)
        .map_err(|message| ApiError::field("media_type", message))?;

    let settings = current_settings(&state)?;
    let catalog = state.clients().catalog(&settings)?;

    match media_type {
        MediaType::Movie => Ok(Json(MediaDetailResponse::Movie(
            catalog.get_movie(media_id).await?,
        ))),
        MediaType::Tv => {
            let mut series = catalog.get_tv(media_id).await?;
            let seasons = try_join_all(
                series
                    .seasons
                    .iter()
                    .map(|summary| catalog.get_tv_season(series.id, summary.season_number)),
            )
            .await?;

            for (summary, season) in series.seasons.iter_mut().zip(seasons) {
                summary.episodes = Some(season.episodes);
            }
            debug!(id = series.id, seasons = series.seasons.len(), "Loaded tv detail");
            Ok(Json(MediaDetailResponse::Series(series)))
        }
    }
}

/// GET /api/search/torrents?q=&media_type=
///
/// Indexer failures are returned as a 500 with the indexer's message.
pub async fn search_torrents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<TorrentResult>>, ApiError> {
    let media_type = params.media_type(MediaType::Movie)?;
    let query = SearchQuery::new(params.query()?).with_category(media_type.into());

    let settings = current_settings(&state)?;
    let searcher = state
        .clients()
        .searcher(&settings)
        .map_err(|e| ApiError::ServerError(e.to_string()))?;

    let result = searcher.search(&query).await.map_err(|e| {
        error!(query = %query.query, error = %e, "Torrent search failed");
        ApiError::ServerError(e.to_string())
    })?;

    let mut results = result.results;
    results.sort_by(|a, b| b.seeders.cmp(&a.seeders));
    Ok(Json(results))
}
