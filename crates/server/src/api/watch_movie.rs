//! Movie watch API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use marquee_core::watch::{NewWatchMovie, WatchMovie, WatchTarget, WatchUpdate};
use marquee_core::{Identity, Task};

use super::error::ApiError;
use super::extract::ApiJson;
use super::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateWatchMovieRequest {
    #[serde(default)]
    pub tmdb_movie_id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub poster_image_url: Option<String>,
}

impl CreateWatchMovieRequest {
    fn validate(self, user: &str) -> Result<NewWatchMovie, ApiError> {
        let mut errors = Map::new();
        let name = self.name.filter(|n| !n.trim().is_empty());
        if self.tmdb_movie_id.is_none() {
            errors.insert("tmdb_movie_id".into(), Value::from(vec!["This field is required."]));
        }
        if name.is_none() {
            errors.insert("name".into(), Value::from(vec!["This field is required."]));
        }

        match (self.tmdb_movie_id, name) {
            (Some(tmdb_movie_id), Some(name)) => Ok(NewWatchMovie {
                user: user.to_string(),
                tmdb_movie_id,
                name,
                poster_image_url: self.poster_image_url,
            }),
            _ => Err(ApiError::Validation(Value::Object(errors))),
        }
    }
}

/// Load a movie watch the caller may modify. Records owned by someone else
/// are reported as missing.
fn load_owned(state: &AppState, identity: &Identity, id: i64) -> Result<WatchMovie, ApiError> {
    state
        .watches()
        .get_movie(id)?
        .filter(|movie| identity.can_modify(&movie.user))
        .ok_or_else(|| ApiError::not_found(WatchTarget::Movie(id).to_string()))
}

/// GET /api/watch-movie
pub async fn list_movies(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<WatchMovie>>, ApiError> {
    Ok(Json(state.watches().list_movies()?))
}

/// GET /api/watch-movie/{id}
pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<WatchMovie>, ApiError> {
    state
        .watches()
        .get_movie(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(WatchTarget::Movie(id).to_string()))
}

/// POST /api/watch-movie
///
/// Persist the watch and queue its first download attempt.
pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    ApiJson(request): ApiJson<CreateWatchMovieRequest>,
) -> Result<(StatusCode, Json<WatchMovie>), ApiError> {
    let new_movie = request.validate(&identity.user_id)?;
    let movie = state.watches().create_movie(new_movie)?;
    info!(id = movie.id, name = %movie.name, user = %movie.user, "Created movie watch");

    state.tasks().enqueue(Task::WatchMovie {
        watch_movie_id: movie.id,
    })?;

    Ok((StatusCode::CREATED, Json(movie)))
}

/// PUT|PATCH /api/watch-movie/{id}
pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
    ApiJson(update): ApiJson<WatchUpdate>,
) -> Result<Json<WatchMovie>, ApiError> {
    load_owned(&state, &identity, id)?;
    Ok(Json(state.watches().update_movie(id, update)?))
}

/// DELETE /api/watch-movie/{id}
pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    load_owned(&state, &identity, id)?;
    state.watches().delete_movie(id)?;
    info!(id, "Deleted movie watch");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/watch-movie/{id}/blacklist-auto-retry
///
/// Blacklist the current torrent, clear it from the watch, queue a new
/// search and remove the old torrent and its data from Transmission.
pub async fn blacklist_auto_retry(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<WatchMovie>, ApiError> {
    let movie = load_owned(&state, &identity, id)?;

    let torrent_client = match movie.torrent_id {
        Some(_) => {
            let settings = state
                .settings()
                .get()?
                .ok_or_else(ApiError::missing_settings)?;
            Some(state.clients().torrent_client(&settings)?)
        }
        None => None,
    };

    let watches = state.watches();
    if let Some(ref hash) = movie.torrent_hash {
        let (_, created) = watches.blacklist(hash)?;
        info!(hash = %hash, created, "Blacklisted torrent");
    }

    watches.assign_torrent(WatchTarget::Movie(id), None)?;

    state.tasks().enqueue(Task::WatchMovie { watch_movie_id: id })?;

    if let (Some(client), Some(torrent_id)) = (torrent_client, movie.torrent_id) {
        info!(torrent_id, "Removing blacklisted torrent");
        client.remove_torrents(&[torrent_id], true).await?;
    }

    let updated = watches
        .get_movie(id)?
        .ok_or_else(|| ApiError::not_found(WatchTarget::Movie(id).to_string()))?;
    Ok(Json(updated))
}
