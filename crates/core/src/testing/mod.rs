//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every external service
//! trait, so handlers and the task runner can be tested without TMDB,
//! Jackett or Transmission.
//!
//! # Example
//!
//! ```rust,ignore
//! use marquee_core::testing::{fixtures, MockClientFactory};
//!
//! let clients = MockClientFactory::new();
//! clients.searcher.set_results(vec![
//!     fixtures::torrent_result("The.Matrix.1999.1080p", "abc123", 50),
//! ]).await;
//! clients.torrent_client.set_progress(1, 1.0).await;
//!
//! // Use in AppState...
//! ```

mod mock_catalog;
mod mock_searcher;
mod mock_task_queue;
mod mock_torrent_client;

pub use mock_catalog::{MockMediaCatalog, RecordedCatalogQuery};
pub use mock_searcher::MockSearcher;
pub use mock_task_queue::MockTaskQueue;
pub use mock_torrent_client::{MockTorrentClient, RecordedRemove};

use std::sync::Arc;

use crate::clients::ClientFactory;
use crate::media::{CatalogError, MediaCatalog};
use crate::searcher::{SearchError, Searcher};
use crate::settings::Settings;
use crate::torrent_client::{TorrentClient, TorrentClientError};

/// Hands out the same mock clients regardless of the settings.
#[derive(Debug, Clone, Default)]
pub struct MockClientFactory {
    pub catalog: Arc<MockMediaCatalog>,
    pub searcher: Arc<MockSearcher>,
    pub torrent_client: Arc<MockTorrentClient>,
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientFactory for MockClientFactory {
    fn catalog(&self, _settings: &Settings) -> Result<Arc<dyn MediaCatalog>, CatalogError> {
        Ok(self.catalog.clone())
    }

    fn searcher(&self, _settings: &Settings) -> Result<Arc<dyn Searcher>, SearchError> {
        Ok(self.searcher.clone())
    }

    fn torrent_client(
        &self,
        _settings: &Settings,
    ) -> Result<Arc<dyn TorrentClient>, TorrentClientError> {
        Ok(self.torrent_client.clone())
    }
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;

    use crate::media::{TmdbEpisode, TmdbMovie, TmdbSeason, TmdbSeasonSummary, TmdbSeries};
    use crate::searcher::TorrentResult;
    use crate::settings::SettingsInput;
    use crate::torrent_client::{TorrentInfo, TorrentState};

    /// Settings with every token filled in.
    pub fn settings_input() -> SettingsInput {
        SettingsInput {
            jackett_token: "jackett-token".to_string(),
            transmission_user: "transmission".to_string(),
            transmission_pass: "secret".to_string(),
            tmdb_token: "tmdb-token".to_string(),
            ..SettingsInput::default()
        }
    }

    /// A magnet-only indexer result.
    pub fn torrent_result(title: &str, info_hash: &str, seeders: u32) -> TorrentResult {
        TorrentResult {
            title: title.to_string(),
            indexer: "mock-indexer".to_string(),
            info_hash: Some(info_hash.to_lowercase()),
            magnet_uri: Some(format!("magnet:?xt=urn:btih:{}", info_hash)),
            link: None,
            size_bytes: 1024 * 1024 * 1024 * 2, // 2 GB
            seeders,
            leechers: seeders / 4,
            category: None,
            publish_date: None,
            details_url: None,
        }
    }

    pub fn tmdb_movie(id: i64, title: &str) -> TmdbMovie {
        TmdbMovie {
            id,
            title: title.to_string(),
            original_title: None,
            release_date: Some("1999-03-31".to_string()),
            overview: Some(format!("A movie about {}.", title.to_lowercase())),
            poster_path: Some("/poster.jpg".to_string()),
            backdrop_path: None,
            genres: Vec::new(),
            vote_average: Some(7.5),
            runtime: Some(120),
        }
    }

    /// A series whose seasons hold ten episodes each.
    pub fn tmdb_series(id: i64, name: &str, seasons: u32) -> TmdbSeries {
        TmdbSeries {
            id,
            name: name.to_string(),
            original_name: None,
            first_air_date: Some("2020-01-01".to_string()),
            overview: Some(format!("A TV series about {}.", name.to_lowercase())),
            poster_path: Some("/poster.jpg".to_string()),
            backdrop_path: None,
            number_of_seasons: Some(seasons),
            number_of_episodes: Some(seasons * 10),
            seasons: (1..=seasons)
                .map(|s| TmdbSeasonSummary {
                    id: Some(id * 100 + s as i64),
                    season_number: s,
                    name: Some(format!("Season {}", s)),
                    episode_count: Some(10),
                    air_date: None,
                    poster_path: None,
                    episodes: None,
                })
                .collect(),
            genres: Vec::new(),
            vote_average: Some(8.0),
        }
    }

    /// A season with episode ids `season * 1000 + episode`.
    pub fn tmdb_season(season_number: u32, episodes: u32) -> TmdbSeason {
        TmdbSeason {
            id: Some(season_number as i64),
            season_number,
            name: Some(format!("Season {}", season_number)),
            overview: None,
            air_date: None,
            poster_path: None,
            episodes: (1..=episodes)
                .map(|e| TmdbEpisode {
                    id: (season_number * 1000 + e) as i64,
                    episode_number: e,
                    season_number: Some(season_number),
                    name: format!("Episode {}", e),
                    overview: None,
                    air_date: None,
                    still_path: None,
                    vote_average: None,
                    runtime: Some(45),
                })
                .collect(),
        }
    }

    pub fn torrent_info(id: i64, hash: &str, progress: f64) -> TorrentInfo {
        TorrentInfo {
            id,
            hash: hash.to_string(),
            name: format!("torrent-{id}"),
            state: if progress >= 1.0 {
                TorrentState::Seeding
            } else {
                TorrentState::Downloading
            },
            progress,
            size_bytes: 1000,
            downloaded_bytes: (1000.0 * progress) as u64,
            uploaded_bytes: 0,
            download_speed: 0,
            upload_speed: 0,
            ratio: 0.0,
            eta_secs: None,
            added_at: Some(Utc::now()),
            completed_at: None,
            download_dir: None,
            error: None,
        }
    }
}
