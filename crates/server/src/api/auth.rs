//! Token login.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use marquee_core::users::login as issue_token;

use super::error::ApiError;
use super::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// POST /api/auth
///
/// Exchange a username and password for an API token. Every login issues a
/// new token and invalidates the previous one.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let mut missing = Map::new();
    let username = request.username.filter(|u| !u.is_empty());
    let password = request.password.filter(|p| !p.is_empty());
    if username.is_none() {
        missing.insert("username".into(), Value::from(vec!["This field is required."]));
    }
    if password.is_none() {
        missing.insert("password".into(), Value::from(vec!["This field is required."]));
    }
    let (Some(username), Some(password)) = (username, password) else {
        return Err(ApiError::Validation(Value::Object(missing)));
    };

    let (user, token) = issue_token(state.users(), &username, &password)?;
    info!(username = %user.username, "Issued API token");

    Ok(Json(TokenResponse { token }))
}
