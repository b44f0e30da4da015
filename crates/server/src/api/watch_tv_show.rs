//! TV show watch API handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use marquee_core::watch::{
    EpisodeFilter, NewWatchTvEpisode, NewWatchTvShow, WatchTvEpisode, WatchTvShow, WatchUpdate,
};
use marquee_core::{Identity, Task};

use super::error::ApiError;
use super::extract::ApiJson;
use super::middleware::CurrentUser;
use crate::state::AppState;

const SEASON_NUMBER: &str = "season_number";

#[derive(Debug, Deserialize)]
pub struct CreateWatchTvShowRequest {
    #[serde(default)]
    pub tmdb_show_id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub poster_image_url: Option<String>,
}

impl CreateWatchTvShowRequest {
    fn validate(self, user: &str) -> Result<NewWatchTvShow, ApiError> {
        let mut errors = Map::new();
        let name = self.name.filter(|n| !n.trim().is_empty());
        if self.tmdb_show_id.is_none() {
            errors.insert("tmdb_show_id".into(), Value::from(vec!["This field is required."]));
        }
        if name.is_none() {
            errors.insert("name".into(), Value::from(vec!["This field is required."]));
        }

        match (self.tmdb_show_id, name) {
            (Some(tmdb_show_id), Some(name)) => Ok(NewWatchTvShow {
                user: user.to_string(),
                tmdb_show_id,
                name,
                poster_image_url: self.poster_image_url,
            }),
            _ => Err(ApiError::Validation(Value::Object(errors))),
        }
    }
}

fn not_found(id: i64) -> ApiError {
    ApiError::not_found(format!("watch tv show {id}"))
}

fn load_owned(state: &AppState, identity: &Identity, id: i64) -> Result<WatchTvShow, ApiError> {
    state
        .watches()
        .get_show(id)?
        .filter(|show| identity.can_modify(&show.user))
        .ok_or_else(|| not_found(id))
}

/// GET /api/watch-tv-show
pub async fn list_shows(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<WatchTvShow>>, ApiError> {
    Ok(Json(state.watches().list_shows()?))
}

/// GET /api/watch-tv-show/{id}
pub async fn get_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<WatchTvShow>, ApiError> {
    state
        .watches()
        .get_show(id)?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// POST /api/watch-tv-show
///
/// Following a show does not download anything by itself; episodes and
/// seasons are requested separately.
pub async fn create_show(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    ApiJson(request): ApiJson<CreateWatchTvShowRequest>,
) -> Result<(StatusCode, Json<WatchTvShow>), ApiError> {
    let new_show = request.validate(&identity.user_id)?;
    let show = state.watches().create_show(new_show)?;
    info!(id = show.id, name = %show.name, user = %show.user, "Created tv show watch");
    Ok((StatusCode::CREATED, Json(show)))
}

/// PUT|PATCH /api/watch-tv-show/{id}
pub async fn update_show(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
    ApiJson(update): ApiJson<WatchUpdate>,
) -> Result<Json<WatchTvShow>, ApiError> {
    load_owned(&state, &identity, id)?;
    Ok(Json(state.watches().update_show(id, update)?))
}

/// DELETE /api/watch-tv-show/{id}
///
/// Removes the show together with all of its episode watches.
pub async fn delete_show(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    load_owned(&state, &identity, id)?;
    state.watches().delete_show(id)?;
    info!(id, "Deleted tv show watch");
    Ok(StatusCode::NO_CONTENT)
}

/// Read `season_number` from the query string, or from a JSON body when the
/// query string is empty.
fn season_number(query: &HashMap<String, String>, body: &Bytes) -> Result<u32, ApiError> {
    let value = if !query.is_empty() {
        query.get(SEASON_NUMBER).map(|v| Value::String(v.clone()))
    } else if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<Value>(body)
            .map_err(|_| ApiError::field("non_field_errors", "Invalid JSON body"))?
            .get(SEASON_NUMBER)
            .cloned()
    };

    let invalid = || ApiError::field(SEASON_NUMBER, "A valid integer is required.");
    match value {
        None | Some(Value::Null) => Err(ApiError::field(SEASON_NUMBER, "This field is required")),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(invalid),
        Some(Value::String(s)) => s.trim().parse::<u32>().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

/// GET|POST /api/watch-tv-show/{id}/entire-season
///
/// Create a watch for every episode of the season (existing ones are kept),
/// then queue a single season-pack search.
pub async fn watch_entire_season(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Json<Vec<WatchTvEpisode>>, ApiError> {
    let show = load_owned(&state, &identity, id)?;
    let season_number = season_number(&query, &body)?;

    let settings = state
        .settings()
        .get()?
        .ok_or_else(ApiError::missing_settings)?;
    let catalog = state.clients().catalog(&settings)?;
    let season = catalog.get_tv_season(show.tmdb_show_id, season_number).await?;

    let watches = state.watches();
    let mut created = 0usize;
    for episode in &season.episodes {
        let (_, inserted) = watches.get_or_create_episode(NewWatchTvEpisode {
            user: identity.user_id.clone(),
            watch_tv_show: show.id,
            tmdb_episode_id: episode.id,
            season_number,
            episode_number: episode.episode_number,
        })?;
        if inserted {
            created += 1;
        }
    }
    info!(
        show = %show.name,
        season = season_number,
        episodes = season.episodes.len(),
        created,
        "Watching entire season"
    );

    state.tasks().enqueue(Task::WatchTvShowSeason {
        watch_tv_show_id: show.id,
        season_number,
    })?;

    Ok(Json(
        watches.list_episodes(&EpisodeFilter::new().with_show(show.id))?,
    ))
}
