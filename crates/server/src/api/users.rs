//! The current user. Callers only ever see their own record.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use marquee_core::{Identity, User};

use super::error::ApiError;
use super::middleware::CurrentUser;
use crate::state::AppState;

fn own_record(state: &AppState, identity: &Identity) -> Result<Option<User>, ApiError> {
    Ok(state.users().get_by_username(&identity.user_id)?)
}

/// GET /api/user
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Vec<User>>, ApiError> {
    let user = own_record(&state, &identity)?;
    Ok(Json(user.into_iter().collect()))
}

/// GET /api/user/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    own_record(&state, &identity)?
        .filter(|user| user.id == id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("user {id}")))
}
