use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::{
    BlacklistEntry, EpisodeFilter, NewWatchMovie, NewWatchTvEpisode, NewWatchTvShow,
    TorrentAssignment, WatchMovie, WatchTarget, WatchTvEpisode, WatchTvShow, WatchUpdate,
};
use crate::db::StoreError;

/// Persistence for watch requests and the torrent blacklist.
pub trait WatchStore: Send + Sync {
    // Movies

    fn create_movie(&self, movie: NewWatchMovie) -> Result<WatchMovie, StoreError>;

    fn get_movie(&self, id: i64) -> Result<Option<WatchMovie>, StoreError>;

    /// All movie watches, newest first.
    fn list_movies(&self) -> Result<Vec<WatchMovie>, StoreError>;

    fn update_movie(&self, id: i64, update: WatchUpdate) -> Result<WatchMovie, StoreError>;

    fn delete_movie(&self, id: i64) -> Result<(), StoreError>;

    // Shows

    fn create_show(&self, show: NewWatchTvShow) -> Result<WatchTvShow, StoreError>;

    fn get_show(&self, id: i64) -> Result<Option<WatchTvShow>, StoreError>;

    fn list_shows(&self) -> Result<Vec<WatchTvShow>, StoreError>;

    fn update_show(&self, id: i64, update: WatchUpdate) -> Result<WatchTvShow, StoreError>;

    /// Delete the show and all of its episode watches.
    fn delete_show(&self, id: i64) -> Result<(), StoreError>;

    // Episodes

    /// Create an episode watch. Fails with `Conflict` when the show already
    /// has a watch for that season and episode.
    fn create_episode(&self, episode: NewWatchTvEpisode) -> Result<WatchTvEpisode, StoreError>;

    /// Create the episode watch unless one exists for the same show, season
    /// and episode. Returns the stored row and whether it was inserted.
    fn get_or_create_episode(
        &self,
        episode: NewWatchTvEpisode,
    ) -> Result<(WatchTvEpisode, bool), StoreError>;

    fn get_episode(&self, id: i64) -> Result<Option<WatchTvEpisode>, StoreError>;

    /// Episode watches ordered by show, season and episode.
    fn list_episodes(&self, filter: &EpisodeFilter) -> Result<Vec<WatchTvEpisode>, StoreError>;

    fn set_episode_collected(&self, id: i64, collected: bool)
        -> Result<WatchTvEpisode, StoreError>;

    fn delete_episode(&self, id: i64) -> Result<(), StoreError>;

    // Torrent bookkeeping shared by movies and episodes

    /// Assign a torrent, or clear the torrent fields with `None`.
    fn assign_torrent(
        &self,
        target: WatchTarget,
        assignment: Option<TorrentAssignment>,
    ) -> Result<(), StoreError>;

    fn mark_attempt(&self, target: WatchTarget, at: DateTime<Utc>) -> Result<(), StoreError>;

    fn mark_collected(&self, target: WatchTarget, at: DateTime<Utc>) -> Result<(), StoreError>;

    // Blacklist

    /// Get-or-create a blacklist entry. Returns whether it was inserted.
    fn blacklist(&self, hash: &str) -> Result<(BlacklistEntry, bool), StoreError>;

    fn is_blacklisted(&self, hash: &str) -> Result<bool, StoreError>;

    fn blacklisted_hashes(&self) -> Result<HashSet<String>, StoreError>;
}
