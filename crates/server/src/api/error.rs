//! HTTP error type shared by every handler.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use marquee_core::media::CatalogError;
use marquee_core::torrent_client::TorrentClientError;
use marquee_core::users::CredentialError;
use marquee_core::{StoreError, TaskError};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Rejected input. The value is returned verbatim as the response body,
    /// either a map of field to messages or a list of messages.
    #[error("Validation failed: {0}")]
    Validation(Value),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Unauthorized")]
    Unauthorized,

    /// A collaborator failed; its message is exposed to the client.
    #[error("{0}")]
    ServerError(String),

    /// Anything else. Logged, never exposed.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// `{"<field>": ["<message>"]}`
    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let message: String = message.into();
        ApiError::Validation(json!({ name: [message] }))
    }

    /// `["<message>", ...]`
    pub fn messages<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<String> = messages.into_iter().map(Into::into).collect();
        ApiError::Validation(json!(list))
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(what.into())
    }

    /// The settings record is required by every route that talks to a
    /// collaborator.
    pub fn missing_settings() -> Self {
        ApiError::field("non_field_errors", "Settings have not been configured")
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::Validation(body) => {
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, "not_found".to_string(), Some(what)),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "forbidden".to_string(),
                Some("You do not have permission to perform this action.".to_string()),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized".to_string(),
                Some("Authentication credentials were not provided.".to_string()),
            ),
            ApiError::ServerError(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, message, None)
            }
            ApiError::Internal(details) => {
                tracing::error!("Internal error: {}", details);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error".to_string(),
                    None,
                )
            }
        };

        (status, Json(ErrorResponse { error, message })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::Conflict(message) => ApiError::field("non_field_errors", message),
            StoreError::Database(details) => ApiError::Internal(details),
        }
    }
}

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::Store(e) => e.into(),
            TaskError::MissingSettings => ApiError::missing_settings(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::InvalidCredentials => {
                ApiError::field("non_field_errors", err.to_string())
            }
            CredentialError::Store(e) => e.into(),
            CredentialError::Hashing(details) => ApiError::Internal(details),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(what) => ApiError::NotFound(what),
            other => ApiError::ServerError(other.to_string()),
        }
    }
}

impl From<TorrentClientError> for ApiError {
    fn from(err: TorrentClientError) -> Self {
        ApiError::ServerError(err.to_string())
    }
}
