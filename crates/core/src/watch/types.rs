use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's request to acquire a movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchMovie {
    pub id: i64,
    pub user: String,
    pub tmdb_movie_id: i64,
    pub name: String,
    pub poster_image_url: Option<String>,
    pub torrent_id: Option<i64>,
    pub torrent_hash: Option<String>,
    pub torrent_name: Option<String>,
    pub collected: bool,
    pub collected_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A user's interest in a TV show. Owns episode watches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchTvShow {
    pub id: i64,
    pub user: String,
    pub tmdb_show_id: i64,
    pub name: String,
    pub poster_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A user's request to acquire a single episode of a watched show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchTvEpisode {
    pub id: i64,
    pub user: String,
    pub watch_tv_show: i64,
    pub tmdb_episode_id: i64,
    pub season_number: u32,
    pub episode_number: u32,
    pub torrent_id: Option<i64>,
    pub torrent_hash: Option<String>,
    pub torrent_name: Option<String>,
    pub collected: bool,
    pub collected_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Hash of a torrent that must never be selected again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWatchMovie {
    pub user: String,
    pub tmdb_movie_id: i64,
    pub name: String,
    pub poster_image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewWatchTvShow {
    pub user: String,
    pub tmdb_show_id: i64,
    pub name: String,
    pub poster_image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewWatchTvEpisode {
    pub user: String,
    pub watch_tv_show: i64,
    pub tmdb_episode_id: i64,
    pub season_number: u32,
    pub episode_number: u32,
}

/// Partial update for movie and show watches. `None` leaves a field as is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchUpdate {
    pub name: Option<String>,
    pub poster_image_url: Option<String>,
    pub collected: Option<bool>,
}

/// The download-daemon torrent assigned to a watch.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentAssignment {
    pub torrent_id: i64,
    pub torrent_hash: String,
    pub torrent_name: String,
}

/// A watch record that can carry a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchTarget {
    Movie(i64),
    Episode(i64),
}

impl WatchTarget {
    pub(crate) fn table(&self) -> &'static str {
        match self {
            WatchTarget::Movie(_) => "watch_movies",
            WatchTarget::Episode(_) => "watch_tv_episodes",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            WatchTarget::Movie(id) | WatchTarget::Episode(id) => *id,
        }
    }
}

impl std::fmt::Display for WatchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchTarget::Movie(id) => write!(f, "watch movie {id}"),
            WatchTarget::Episode(id) => write!(f, "watch tv episode {id}"),
        }
    }
}

/// Filter for episode listings.
#[derive(Debug, Clone, Default)]
pub struct EpisodeFilter {
    pub watch_tv_show: Option<i64>,
    pub season_number: Option<u32>,
    pub collected: Option<bool>,
}

impl EpisodeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_show(mut self, watch_tv_show: i64) -> Self {
        self.watch_tv_show = Some(watch_tv_show);
        self
    }

    pub fn with_season(mut self, season_number: u32) -> Self {
        self.season_number = Some(season_number);
        self
    }

    pub fn with_collected(mut self, collected: bool) -> Self {
        self.collected = Some(collected);
        self
    }
}
