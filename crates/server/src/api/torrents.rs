//! Manual torrent download and download-daemon status handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, RawQuery, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use marquee_core::torrent_client::{AddTorrentRequest, TorrentClientError, TorrentId, TorrentInfo};
use marquee_core::torrent_url::{is_magnet_url, swap_jackett_host, TorrentUrlTracer};
use marquee_core::Settings;

use super::error::ApiError;
use super::extract::ApiJson;
use crate::state::AppState;

const TRACE_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DownloadTorrentRequest {
    #[serde(default)]
    pub torrent: Option<String>,
}

/// Download outcome. Failures to resolve the link are reported here with a
/// 200 status rather than as an HTTP error.
#[derive(Debug, Serialize)]
pub struct DownloadTorrentResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl DownloadTorrentResponse {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
            error_detail: None,
        }
    }

    fn failed(error: &str, detail: Option<String>) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            error_detail: detail,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CurrentTorrentsResponse {
    One(TorrentInfo),
    Many(Vec<TorrentInfo>),
}

fn current_settings(state: &AppState) -> Result<Settings, ApiError> {
    state
        .settings()
        .get()?
        .ok_or_else(ApiError::missing_settings)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/download/torrents
///
/// Resolve an indexer link to something Transmission can fetch and add it
/// paused, for the user to start manually.
pub async fn download_torrent(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<DownloadTorrentRequest>,
) -> Result<Json<DownloadTorrentResponse>, ApiError> {
    let Some(link) = request.torrent.filter(|t| !t.trim().is_empty()) else {
        return Ok(Json(DownloadTorrentResponse::failed(
            "Missing torrent link",
            None,
        )));
    };

    let settings = current_settings(&state)?;

    let resolved = match resolve_link(&link, &settings).await {
        Ok(resolved) => resolved,
        Err(detail) => {
            warn!(link = %link, error = %detail, "Failed to resolve torrent link");
            return Ok(Json(DownloadTorrentResponse::failed(
                "An unknown error occurred",
                Some(detail),
            )));
        }
    };

    info!(torrent = %resolved, "Adding torrent");
    let client = state.clients().torrent_client(&settings)?;
    client
        .add_torrent(AddTorrentRequest::from_link(resolved).with_paused(true))
        .await?;

    Ok(Json(DownloadTorrentResponse::ok()))
}

async fn resolve_link(link: &str, settings: &Settings) -> Result<String, String> {
    let link = if is_magnet_url(link) {
        link.to_string()
    } else {
        swap_jackett_host(link, &settings.jackett_host, settings.jackett_port)
            .map_err(|e| e.to_string())?
    };

    let tracer = TorrentUrlTracer::new(TRACE_TIMEOUT).map_err(|e| e.to_string())?;
    tracer.trace(&link).await.map_err(|e| e.to_string())
}

/// Parse repeated `ids` query parameters (`?ids=1&ids=2`).
fn parse_ids(query: Option<&str>) -> Result<Vec<TorrentId>, ApiError> {
    let Some(query) = query else {
        return Ok(Vec::new());
    };

    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key == "ids")
        .map(|(_, value)| {
            value
                .trim()
                .parse::<TorrentId>()
                .map_err(|_| ApiError::field("ids", format!("\"{value}\" is not a valid torrent id")))
        })
        .collect()
}

fn daemon_error(e: TorrentClientError) -> ApiError {
    error!(error = %e, "Failed to fetch torrents");
    ApiError::field("torrent_id", e.to_string())
}

/// GET /api/current/torrents?ids=1&ids=2
///
/// Without `ids` every torrent known to Transmission is returned.
pub async fn current_torrents(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<CurrentTorrentsResponse>, ApiError> {
    let ids = parse_ids(query.as_deref())?;
    let settings = current_settings(&state)?;

    let client = state
        .clients()
        .torrent_client(&settings)
        .map_err(daemon_error)?;
    let torrents = client.get_torrents(&ids).await.map_err(daemon_error)?;

    Ok(Json(CurrentTorrentsResponse::Many(torrents)))
}

/// GET /api/current/torrents/{torrent_id}
pub async fn current_torrent(
    State(state): State<Arc<AppState>>,
    Path(torrent_id): Path<TorrentId>,
) -> Result<Json<CurrentTorrentsResponse>, ApiError> {
    let settings = current_settings(&state)?;

    let client = state
        .clients()
        .torrent_client(&settings)
        .map_err(daemon_error)?;
    let torrent = client.get_torrent(torrent_id).await.map_err(daemon_error)?;

    Ok(Json(CurrentTorrentsResponse::One(torrent)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repeated_ids() {
        assert_eq!(parse_ids(Some("ids=1&ids=2")).unwrap(), vec![1, 2]);
        assert_eq!(parse_ids(Some("other=x&ids=7")).unwrap(), vec![7]);
        assert!(parse_ids(None).unwrap().is_empty());
    }

    #[test]
    fn test_parse_invalid_id() {
        assert!(matches!(
            parse_ids(Some("ids=abc")),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_download_response_shape() {
        let body = serde_json::to_value(DownloadTorrentResponse::ok()).unwrap();
        assert_eq!(body, serde_json::json!({"success": true}));

        let body = serde_json::to_value(DownloadTorrentResponse::failed(
            "An unknown error occurred",
            Some("connection refused".into()),
        ))
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "error": "An unknown error occurred",
                "error_detail": "connection refused"
            })
        );
    }
}
