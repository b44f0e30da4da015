//! Transmission RPC client implementation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{
    AddTorrentRequest, AddTorrentResult, TorrentClient, TorrentClientError, TorrentId,
    TorrentInfo, TorrentSource, TorrentState,
};

const SESSION_HEADER: &str = "X-Transmission-Session-Id";

const TORRENT_FIELDS: &[&str] = &[
    "id",
    "hashString",
    "name",
    "status",
    "percentDone",
    "totalSize",
    "downloadedEver",
    "uploadedEver",
    "rateDownload",
    "rateUpload",
    "uploadRatio",
    "eta",
    "addedDate",
    "doneDate",
    "downloadDir",
    "errorString",
];

/// Transmission connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransmissionConfig {
    /// Full RPC endpoint, e.g. "http://localhost:9091/transmission/rpc".
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

impl TransmissionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: String::new(),
            password: String::new(),
            timeout_secs: default_timeout(),
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }
}

/// Transmission client implementation.
pub struct TransmissionClient {
    client: Client,
    config: TransmissionConfig,
    /// CSRF session id handed out by the daemon (refreshed on 409).
    session_id: RwLock<Option<String>>,
}

impl TransmissionClient {
    pub fn new(config: TransmissionConfig) -> Result<Self, TorrentClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| TorrentClientError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            config,
            session_id: RwLock::new(None),
        })
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, TorrentClientError> {
        let mut request = self.client.post(&self.config.url).json(body);
        if !self.config.username.is_empty() {
            request = request.basic_auth(&self.config.username, Some(&self.config.password));
        }
        if let Some(session_id) = self.session_id.read().await.as_deref() {
            request = request.header(SESSION_HEADER, session_id);
        }

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                TorrentClientError::Timeout
            } else if e.is_connect() {
                TorrentClientError::ConnectionFailed(e.to_string())
            } else {
                TorrentClientError::ApiError(e.to_string())
            }
        })
    }

    /// Call an RPC method and decode its `arguments`.
    async fn rpc<T: DeserializeOwned>(
        &self,
        method: &str,
        arguments: Value,
    ) -> Result<T, TorrentClientError> {
        let body = json!({ "method": method, "arguments": arguments });

        let mut response = self.send(&body).await?;
        if response.status() == StatusCode::CONFLICT {
            // Session id missing or expired, retry with the one the daemon handed out
            let session_id = response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| {
                    TorrentClientError::ApiError("409 without a session id".to_string())
                })?;
            debug!("Transmission session id refreshed");
            *self.session_id.write().await = Some(session_id);
            response = self.send(&body).await?;
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(TorrentClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TorrentClientError::ApiError(format!(
                "HTTP {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let rpc: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse response: {}", e)))?;

        if rpc.result != "success" {
            warn!(method, result = %rpc.result, "Transmission RPC failed");
            return Err(TorrentClientError::ApiError(rpc.result));
        }

        rpc.arguments
            .ok_or_else(|| TorrentClientError::ApiError(format!("{method}: missing arguments")))
    }

    async fn fetch_torrents(
        &self,
        ids: Option<&[TorrentId]>,
    ) -> Result<Vec<TorrentInfo>, TorrentClientError> {
        let mut arguments = json!({ "fields": TORRENT_FIELDS });
        if let Some(ids) = ids {
            arguments["ids"] = json!(ids);
        }

        let result: TorrentGetArguments = self.rpc("torrent-get", arguments).await?;
        Ok(result
            .torrents
            .into_iter()
            .map(TransmissionTorrent::into_torrent_info)
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: String,
    arguments: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TorrentAddArguments {
    #[serde(rename = "torrent-added")]
    added: Option<AddedTorrent>,
    #[serde(rename = "torrent-duplicate")]
    duplicate: Option<AddedTorrent>,
}

#[derive(Debug, Deserialize)]
struct AddedTorrent {
    id: TorrentId,
    #[serde(rename = "hashString")]
    hash_string: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TorrentGetArguments {
    torrents: Vec<TransmissionTorrent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransmissionTorrent {
    id: TorrentId,
    hash_string: String,
    name: String,
    status: i64,
    percent_done: f64,
    total_size: i64,
    downloaded_ever: i64,
    uploaded_ever: i64,
    rate_download: i64,
    rate_upload: i64,
    upload_ratio: f64,
    eta: i64,
    added_date: i64,
    done_date: i64,
    download_dir: Option<String>,
    error_string: Option<String>,
}

impl TransmissionTorrent {
    fn into_torrent_info(self) -> TorrentInfo {
        TorrentInfo {
            id: self.id,
            hash: self.hash_string.to_lowercase(),
            name: self.name,
            state: parse_status(self.status),
            progress: self.percent_done,
            size_bytes: self.total_size.max(0) as u64,
            downloaded_bytes: self.downloaded_ever.max(0) as u64,
            uploaded_bytes: self.uploaded_ever.max(0) as u64,
            download_speed: self.rate_download.max(0) as u64,
            upload_speed: self.rate_upload.max(0) as u64,
            // -1 and -2 mean "not available" and "infinite"
            ratio: self.upload_ratio.max(0.0),
            eta_secs: (self.eta >= 0).then_some(self.eta as u64),
            added_at: timestamp_to_datetime(self.added_date),
            completed_at: timestamp_to_datetime(self.done_date),
            download_dir: self.download_dir,
            error: self.error_string.filter(|e| !e.is_empty()),
        }
    }
}

/// Map Transmission's numeric status to our state.
fn parse_status(status: i64) -> TorrentState {
    match status {
        0 => TorrentState::Paused,
        1 | 2 => TorrentState::Checking,
        3 => TorrentState::Queued,
        4 => TorrentState::Downloading,
        5 | 6 => TorrentState::Seeding,
        _ => TorrentState::Unknown,
    }
}

/// Convert Unix timestamp to DateTime; Transmission uses 0 for "never".
fn timestamp_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    if ts <= 0 {
        None
    } else {
        Utc.timestamp_opt(ts, 0).single()
    }
}

#[async_trait]
impl TorrentClient for TransmissionClient {
    fn name(&self) -> &str {
        "transmission"
    }

    async fn add_torrent(
        &self,
        request: AddTorrentRequest,
    ) -> Result<AddTorrentResult, TorrentClientError> {
        let filename = match &request.source {
            TorrentSource::Magnet(uri) => uri,
            TorrentSource::Url(url) => url,
        };
        if filename.is_empty() {
            return Err(TorrentClientError::InvalidTorrent(
                "empty torrent link".to_string(),
            ));
        }

        let mut arguments = json!({ "filename": filename, "paused": request.paused });
        if let Some(dir) = &request.download_dir {
            arguments["download-dir"] = json!(dir);
        }

        debug!(paused = request.paused, download_dir = ?request.download_dir, "Adding torrent");
        let result: TorrentAddArguments = self.rpc("torrent-add", arguments).await?;

        let (torrent, duplicate) = match (result.added, result.duplicate) {
            (Some(t), _) => (t, false),
            (None, Some(t)) => (t, true),
            (None, None) => {
                return Err(TorrentClientError::InvalidTorrent(
                    "daemon did not report the added torrent".to_string(),
                ))
            }
        };

        Ok(AddTorrentResult {
            id: torrent.id,
            hash: torrent.hash_string.to_lowercase(),
            name: torrent.name,
            duplicate,
        })
    }

    async fn remove_torrents(
        &self,
        ids: &[TorrentId],
        delete_data: bool,
    ) -> Result<(), TorrentClientError> {
        if ids.is_empty() {
            return Ok(());
        }

        let _: Value = self
            .rpc(
                "torrent-remove",
                json!({ "ids": ids, "delete-local-data": delete_data }),
            )
            .await?;
        Ok(())
    }

    async fn get_torrent(&self, id: TorrentId) -> Result<TorrentInfo, TorrentClientError> {
        self.fetch_torrents(Some(&[id]))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TorrentClientError::TorrentNotFound(id.to_string()))
    }

    async fn get_torrents(
        &self,
        ids: &[TorrentId],
    ) -> Result<Vec<TorrentInfo>, TorrentClientError> {
        if ids.is_empty() {
            self.fetch_torrents(None).await
        } else {
            self.fetch_torrents(Some(ids)).await
        }
    }

    async fn verify(&self) -> Result<(), TorrentClientError> {
        let _: Value = self.rpc("session-get", json!({})).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status(0), TorrentState::Paused);
        assert_eq!(parse_status(2), TorrentState::Checking);
        assert_eq!(parse_status(3), TorrentState::Queued);
        assert_eq!(parse_status(4), TorrentState::Downloading);
        assert_eq!(parse_status(6), TorrentState::Seeding);
        assert_eq!(parse_status(42), TorrentState::Unknown);
    }

    #[test]
    fn test_timestamp_to_datetime() {
        assert!(timestamp_to_datetime(0).is_none());
        assert_eq!(
            timestamp_to_datetime(1_700_000_000).unwrap().timestamp(),
            1_700_000_000
        );
    }

    #[test]
    fn test_torrent_get_conversion() {
        let args: TorrentGetArguments = serde_json::from_value(json!({
            "torrents": [{
                "id": 3,
                "hashString": "ABCDEF0123",
                "name": "Movie.2020.1080p",
                "status": 4,
                "percentDone": 0.5,
                "totalSize": 1000,
                "downloadedEver": 500,
                "uploadedEver": 10,
                "rateDownload": 100,
                "rateUpload": 5,
                "uploadRatio": -1.0,
                "eta": -1,
                "addedDate": 1700000000,
                "doneDate": 0,
                "downloadDir": "/downloads/movies",
                "errorString": ""
            }]
        }))
        .unwrap();

        let info = args.torrents.into_iter().next().unwrap().into_torrent_info();
        assert_eq!(info.id, 3);
        assert_eq!(info.hash, "abcdef0123");
        assert_eq!(info.state, TorrentState::Downloading);
        assert_eq!(info.ratio, 0.0);
        assert!(info.eta_secs.is_none());
        assert!(info.completed_at.is_none());
        assert!(info.error.is_none());
        assert!(!info.is_complete());
    }

    #[test]
    fn test_torrent_add_response() {
        let args: TorrentAddArguments = serde_json::from_value(json!({
            "torrent-duplicate": {"id": 9, "hashString": "abc", "name": "dup"}
        }))
        .unwrap();
        assert!(args.added.is_none());
        assert_eq!(args.duplicate.unwrap().id, 9);
    }

    #[tokio::test]
    async fn test_unreachable_daemon() {
        let mut config = TransmissionConfig::new("http://127.0.0.1:1/transmission/rpc");
        config.timeout_secs = 2;
        let client = TransmissionClient::new(config).unwrap();
        assert!(client.verify().await.is_err());
    }
}
