//! Request body extraction with field-scoped errors.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use super::error::ApiError;

const DATA_ERROR_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// `Json<T>` whose rejections come back as validation errors, e.g.
/// `{"tmdb_movie_id": ["invalid type: string \"abc\", expected i64 ..."]}`.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(rejection.into()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                let text = err.body_text();
                let detail = text.strip_prefix(DATA_ERROR_PREFIX).unwrap_or(&text);
                match field_and_message(detail) {
                    Some((field, message)) => ApiError::field(field, message),
                    None => ApiError::field("non_field_errors", detail),
                }
            }
            JsonRejection::JsonSyntaxError(err) => ApiError::field(
                "non_field_errors",
                format!("JSON parse error - {}", err.body_text()),
            ),
            other => ApiError::field("non_field_errors", other.body_text()),
        }
    }
}

/// Split `"<path>: <message>"`. The path names the offending field; nested
/// paths such as `a.b` or `items[0]` keep their first segment.
fn field_and_message(detail: &str) -> Option<(&str, &str)> {
    let (path, message) = detail.split_once(": ")?;
    let field = path
        .split(['.', '['])
        .next()
        .filter(|f| !f.is_empty() && f.chars().all(|c| c.is_alphanumeric() || c == '_'))?;
    Some((field, message))
}
