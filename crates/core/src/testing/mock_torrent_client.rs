//! Mock torrent client for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::selection::magnet_hash;
use crate::torrent_client::{
    AddTorrentRequest, AddTorrentResult, TorrentClient, TorrentClientError, TorrentId,
    TorrentInfo, TorrentSource, TorrentState,
};

/// A recorded `remove_torrents` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRemove {
    pub ids: Vec<TorrentId>,
    pub delete_data: bool,
}

/// Mock implementation of the TorrentClient trait.
///
/// Keeps torrents in memory keyed by daemon id. Ids are assigned from 1.
///
/// # Example
///
/// ```rust,ignore
/// use marquee_core::testing::MockTorrentClient;
///
/// let client = MockTorrentClient::new();
/// let added = client.add_torrent(AddTorrentRequest::magnet("magnet:?xt=urn:btih:abc")).await?;
/// client.set_progress(added.id, 1.0).await;
/// assert!(client.get_torrent(added.id).await?.is_complete());
/// ```
#[derive(Debug)]
pub struct MockTorrentClient {
    torrents: Arc<RwLock<BTreeMap<TorrentId, TorrentInfo>>>,
    /// Recorded add requests.
    added: Arc<RwLock<Vec<AddTorrentRequest>>>,
    removed: Arc<RwLock<Vec<RecordedRemove>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<TorrentClientError>>>,
    verify_error: Arc<RwLock<Option<String>>>,
    next_id: Arc<RwLock<TorrentId>>,
}

impl Default for MockTorrentClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTorrentClient {
    pub fn new() -> Self {
        Self {
            torrents: Arc::new(RwLock::new(BTreeMap::new())),
            added: Arc::new(RwLock::new(Vec::new())),
            removed: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            verify_error: Arc::new(RwLock::new(None)),
            next_id: Arc::new(RwLock::new(1)),
        }
    }

    pub async fn added_torrents(&self) -> Vec<AddTorrentRequest> {
        self.added.read().await.clone()
    }

    pub async fn removed_torrents(&self) -> Vec<RecordedRemove> {
        self.removed.read().await.clone()
    }

    /// Insert a torrent as if the daemon already had it.
    pub async fn add_mock_torrent(&self, info: TorrentInfo) {
        let mut torrents = self.torrents.write().await;
        let mut next_id = self.next_id.write().await;
        *next_id = (*next_id).max(info.id + 1);
        torrents.insert(info.id, info);
    }

    pub async fn set_progress(&self, id: TorrentId, progress: f64) {
        if let Some(torrent) = self.torrents.write().await.get_mut(&id) {
            torrent.progress = progress;
            if progress >= 1.0 {
                torrent.state = TorrentState::Seeding;
                torrent.completed_at = Some(Utc::now());
                torrent.eta_secs = None;
            }
        }
    }

    pub async fn has_torrent(&self, id: TorrentId) -> bool {
        self.torrents.read().await.contains_key(&id)
    }

    pub async fn torrent_count(&self) -> usize {
        self.torrents.read().await.len()
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: TorrentClientError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_verify_error(&self, message: impl Into<String>) {
        *self.verify_error.write().await = Some(message.into());
    }

    async fn take_error(&self) -> Option<TorrentClientError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn add_torrent(
        &self,
        request: AddTorrentRequest,
    ) -> Result<AddTorrentResult, TorrentClientError> {
        self.added.write().await.push(request.clone());

        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        let (hash, name) = match &request.source {
            TorrentSource::Magnet(uri) => {
                let hash = magnet_hash(uri).ok_or_else(|| {
                    TorrentClientError::InvalidTorrent(format!("no info hash in {uri}"))
                })?;
                (hash.clone(), hash)
            }
            TorrentSource::Url(url) => {
                let name = url.rsplit('/').next().unwrap_or(url).to_string();
                (format!("{:040x}", self.torrents.read().await.len() + 1), name)
            }
        };

        let mut torrents = self.torrents.write().await;
        if let Some(existing) = torrents.values().find(|t| t.hash == hash) {
            return Ok(AddTorrentResult {
                id: existing.id,
                hash: existing.hash.clone(),
                name: existing.name.clone(),
                duplicate: true,
            });
        }

        let mut next_id = self.next_id.write().await;
        let id = *next_id;
        *next_id += 1;

        torrents.insert(
            id,
            TorrentInfo {
                id,
                hash: hash.clone(),
                name: name.clone(),
                state: if request.paused {
                    TorrentState::Paused
                } else {
                    TorrentState::Downloading
                },
                progress: 0.0,
                size_bytes: 1024 * 1024 * 700,
                downloaded_bytes: 0,
                uploaded_bytes: 0,
                download_speed: 0,
                upload_speed: 0,
                ratio: 0.0,
                eta_secs: None,
                added_at: Some(Utc::now()),
                completed_at: None,
                download_dir: request.download_dir.clone(),
                error: None,
            },
        );

        Ok(AddTorrentResult {
            id,
            hash,
            name,
            duplicate: false,
        })
    }

    async fn remove_torrents(
        &self,
        ids: &[TorrentId],
        delete_data: bool,
    ) -> Result<(), TorrentClientError> {
        self.removed.write().await.push(RecordedRemove {
            ids: ids.to_vec(),
            delete_data,
        });

        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        let mut torrents = self.torrents.write().await;
        for id in ids {
            torrents.remove(id);
        }
        Ok(())
    }

    async fn get_torrent(&self, id: TorrentId) -> Result<TorrentInfo, TorrentClientError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        self.torrents
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| TorrentClientError::TorrentNotFound(id.to_string()))
    }

    async fn get_torrents(
        &self,
        ids: &[TorrentId],
    ) -> Result<Vec<TorrentInfo>, TorrentClientError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        let torrents = self.torrents.read().await;
        Ok(torrents
            .values()
            .filter(|t| ids.is_empty() || ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn verify(&self) -> Result<(), TorrentClientError> {
        match self.verify_error.read().await.clone() {
            Some(message) => Err(TorrentClientError::ConnectionFailed(message)),
            None => Ok(()),
        }
    }
}
