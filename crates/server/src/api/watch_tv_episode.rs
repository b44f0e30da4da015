//! TV episode watch API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use marquee_core::watch::{EpisodeFilter, NewWatchTvEpisode, WatchTarget, WatchTvEpisode};
use marquee_core::{Identity, StoreError, Task};

use super::error::ApiError;
use super::extract::ApiJson;
use super::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct EpisodeListParams {
    #[serde(default)]
    pub watch_tv_show: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWatchTvEpisodeRequest {
    #[serde(default)]
    pub watch_tv_show: Option<i64>,
    #[serde(default)]
    pub tmdb_episode_id: Option<i64>,
    #[serde(default)]
    pub season_number: Option<u32>,
    #[serde(default)]
    pub episode_number: Option<u32>,
}

impl CreateWatchTvEpisodeRequest {
    fn validate(self, user: &str) -> Result<NewWatchTvEpisode, ApiError> {
        match (
            self.watch_tv_show,
            self.tmdb_episode_id,
            self.season_number,
            self.episode_number,
        ) {
            (Some(watch_tv_show), Some(tmdb_episode_id), Some(season_number), Some(episode_number)) => {
                Ok(NewWatchTvEpisode {
                    user: user.to_string(),
                    watch_tv_show,
                    tmdb_episode_id,
                    season_number,
                    episode_number,
                })
            }
            (show, episode_id, season, episode) => {
                let mut errors = Map::new();
                let required = [
                    ("watch_tv_show", show.is_none()),
                    ("tmdb_episode_id", episode_id.is_none()),
                    ("season_number", season.is_none()),
                    ("episode_number", episode.is_none()),
                ];
                for (field, missing) in required {
                    if missing {
                        errors.insert(field.into(), Value::from(vec!["This field is required."]));
                    }
                }
                Err(ApiError::Validation(Value::Object(errors)))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateWatchTvEpisodeRequest {
    #[serde(default)]
    pub collected: Option<bool>,
}

fn not_found(id: i64) -> ApiError {
    ApiError::not_found(WatchTarget::Episode(id).to_string())
}

fn load_owned(
    state: &AppState,
    identity: &Identity,
    id: i64,
) -> Result<WatchTvEpisode, ApiError> {
    state
        .watches()
        .get_episode(id)?
        .filter(|episode| identity.can_modify(&episode.user))
        .ok_or_else(|| not_found(id))
}

/// GET /api/watch-tv-episode[?watch_tv_show=<id>]
pub async fn list_episodes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EpisodeListParams>,
) -> Result<Json<Vec<WatchTvEpisode>>, ApiError> {
    let mut filter = EpisodeFilter::new();
    if let Some(show) = params.watch_tv_show {
        filter = filter.with_show(show);
    }
    Ok(Json(state.watches().list_episodes(&filter)?))
}

/// GET /api/watch-tv-episode/{id}
pub async fn get_episode(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<WatchTvEpisode>, ApiError> {
    state
        .watches()
        .get_episode(id)?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// POST /api/watch-tv-episode
pub async fn create_episode(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    ApiJson(request): ApiJson<CreateWatchTvEpisodeRequest>,
) -> Result<(StatusCode, Json<WatchTvEpisode>), ApiError> {
    let new_episode = request.validate(&identity.user_id)?;

    let watches = state.watches();
    let show = watches
        .get_show(new_episode.watch_tv_show)?
        .filter(|show| identity.can_modify(&show.user))
        .ok_or_else(|| {
            ApiError::field(
                "watch_tv_show",
                format!("Invalid pk \"{}\" - object does not exist.", new_episode.watch_tv_show),
            )
        })?;

    let episode = watches.create_episode(new_episode).map_err(|e| match e {
        StoreError::Conflict(_) => ApiError::field(
            "non_field_errors",
            "The fields watch_tv_show, season_number, episode_number must make a unique set.",
        ),
        other => other.into(),
    })?;
    info!(
        id = episode.id,
        show = %show.name,
        season = episode.season_number,
        episode = episode.episode_number,
        "Created tv episode watch"
    );

    state.tasks().enqueue(Task::WatchTvEpisode {
        watch_tv_episode_id: episode.id,
    })?;

    Ok((StatusCode::CREATED, Json(episode)))
}

/// PUT|PATCH /api/watch-tv-episode/{id}
pub async fn update_episode(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<UpdateWatchTvEpisodeRequest>,
) -> Result<Json<WatchTvEpisode>, ApiError> {
    let episode = load_owned(&state, &identity, id)?;
    match request.collected {
        Some(collected) => Ok(Json(state.watches().set_episode_collected(id, collected)?)),
        None => Ok(Json(episode)),
    }
}

/// DELETE /api/watch-tv-episode/{id}
pub async fn delete_episode(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    load_owned(&state, &identity, id)?;
    state.watches().delete_episode(id)?;
    info!(id, "Deleted tv episode watch");
    Ok(StatusCode::NO_CONTENT)
}
