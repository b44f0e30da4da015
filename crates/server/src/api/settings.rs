//! Settings API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use marquee_core::config::MAX_AGE_HOURS;
use marquee_core::{Identity, Settings, SettingsInput, Task};

use super::error::ApiError;
use super::extract::ApiJson;
use super::middleware::CurrentUser;
use crate::state::AppState;

// ============================================================================
// Views
// ============================================================================

/// What a non-staff caller may see: the TMDB configuration used to build
/// image URLs, nothing about hosts or credentials.
#[derive(Debug, Serialize)]
pub struct PartialSettingsView {
    pub id: i64,
    pub tmdb_configuration: Option<serde_json::Value>,
    pub tmdb_configuration_date: Option<DateTime<Utc>>,
}

impl From<Settings> for PartialSettingsView {
    fn from(settings: Settings) -> Self {
        Self {
            id: settings.id,
            tmdb_configuration: settings.tmdb_configuration,
            tmdb_configuration_date: settings.tmdb_configuration_date,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SettingsView {
    Full(Settings),
    Partial(PartialSettingsView),
}

impl SettingsView {
    pub fn for_identity(settings: Settings, identity: &Identity) -> Self {
        if identity.is_staff {
            SettingsView::Full(settings)
        } else {
            SettingsView::Partial(settings.into())
        }
    }
}

fn require_staff(identity: &Identity) -> Result<(), ApiError> {
    if identity.is_staff {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/settings
///
/// Also queues a refresh of the cached TMDB configuration when it is stale.
pub async fn list_settings(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Vec<SettingsView>>, ApiError> {
    let settings = state.settings().get()?;

    if let Some(ref current) = settings {
        let hours = state
            .config()
            .tasks
            .tmdb_configuration_max_age_hours
            .min(MAX_AGE_HOURS);
        let max_age = chrono::Duration::hours(hours as i64);
        if current.needs_tmdb_configuration(Utc::now(), max_age) {
            match state.tasks().enqueue(Task::RefreshTmdbConfiguration) {
                Ok(handle) => info!(task_id = handle.id, "Queued TMDB configuration refresh"),
                Err(e) => warn!(error = %e, "Failed to queue TMDB configuration refresh"),
            }
        }
    }

    Ok(Json(
        settings
            .into_iter()
            .map(|s| SettingsView::for_identity(s, &identity))
            .collect(),
    ))
}

/// GET /api/settings/{id}
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<SettingsView>, ApiError> {
    let settings = state
        .settings()
        .get_by_id(id)?
        .ok_or_else(|| ApiError::not_found(format!("settings {id}")))?;
    Ok(Json(SettingsView::for_identity(settings, &identity)))
}

/// POST /api/settings (staff only)
pub async fn create_settings(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    ApiJson(input): ApiJson<SettingsInput>,
) -> Result<(StatusCode, Json<Settings>), ApiError> {
    require_staff(&identity)?;
    let settings = state.settings().create(input)?;
    info!(user = %identity.user_id, "Created settings");
    Ok((StatusCode::CREATED, Json(settings)))
}

/// PUT /api/settings/{id} (staff only)
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
    ApiJson(input): ApiJson<SettingsInput>,
) -> Result<Json<Settings>, ApiError> {
    require_staff(&identity)?;
    let settings = state.settings().update(id, input)?;
    info!(user = %identity.user_id, "Updated settings");
    Ok(Json(settings))
}

/// GET /api/settings/{id}/verify
///
/// Check Jackett, TMDB and Transmission in that order. The first failure is
/// reported as a validation error.
pub async fn verify_settings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let settings = state
        .settings()
        .get_by_id(id)?
        .ok_or_else(|| ApiError::not_found(format!("settings {id}")))?;

    verify_all(&state, &settings).await.map_err(|message| {
        warn!(error = %message, "Settings verification failed");
        ApiError::messages([message])
    })?;

    Ok(StatusCode::OK)
}

async fn verify_all(state: &AppState, settings: &Settings) -> Result<(), String> {
    let clients = state.clients();

    let searcher = clients
        .searcher(settings)
        .map_err(|e| format!("Could not connect to Jackett: {e}"))?;
    searcher
        .verify()
        .await
        .map_err(|e| format!("Could not connect to Jackett: {e}"))?;

    let catalog = clients
        .catalog(settings)
        .map_err(|e| format!("Could not connect to TMDB: {e}"))?;
    catalog
        .configuration()
        .await
        .map_err(|e| format!("Could not connect to TMDB: {e}"))?;

    let torrent_client = clients
        .torrent_client(settings)
        .map_err(|e| format!("Could not connect to Transmission: {e}"))?;
    torrent_client
        .verify()
        .await
        .map_err(|e| format!("Could not connect to Transmission: {e}"))?;

    Ok(())
}
