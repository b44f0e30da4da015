//! Task execution: turning watch requests into downloads.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::clients::ClientFactory;
use crate::metrics::{SEARCH_MISSES, SWEEP_UPDATES, TORRENTS_ADDED};
use crate::selection::{rank_candidates, SearchTarget};
use crate::settings::{Settings, SettingsStore};
use crate::torrent_client::AddTorrentRequest;
use crate::torrent_url::{swap_jackett_host, TorrentUrlTracer};
use crate::watch::{EpisodeFilter, TorrentAssignment, WatchStore, WatchTarget};

use super::{Task, TaskError, TaskQueue};

const TRACE_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes tasks against the stores and the external services.
pub struct TaskRunner {
    settings: Arc<dyn SettingsStore>,
    watches: Arc<dyn WatchStore>,
    queue: Arc<dyn TaskQueue>,
    clients: Arc<dyn ClientFactory>,
}

impl TaskRunner {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        watches: Arc<dyn WatchStore>,
        queue: Arc<dyn TaskQueue>,
        clients: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            settings,
            watches,
            queue,
            clients,
        }
    }

    pub async fn run(&self, task: &Task) -> Result<(), TaskError> {
        match task {
            Task::WatchMovie { watch_movie_id } => self.watch_movie(*watch_movie_id).await,
            Task::WatchTvEpisode {
                watch_tv_episode_id,
            } => self.watch_tv_episode(*watch_tv_episode_id).await,
            Task::WatchTvShowSeason {
                watch_tv_show_id,
                season_number,
            } => {
                self.watch_tv_show_season(*watch_tv_show_id, *season_number)
                    .await
            }
            Task::RefreshTmdbConfiguration => self.refresh_tmdb_configuration().await,
        }
    }

    fn load_settings(&self) -> Result<Settings, TaskError> {
        self.settings.get()?.ok_or(TaskError::MissingSettings)
    }

    async fn watch_movie(&self, id: i64) -> Result<(), TaskError> {
        let Some(movie) = self.watches.get_movie(id)? else {
            debug!(watch_movie_id = id, "Watch movie no longer exists");
            return Ok(());
        };
        if movie.collected || movie.torrent_id.is_some() {
            debug!(watch_movie_id = id, "Watch movie already has a torrent");
            return Ok(());
        }

        let settings = self.load_settings()?;
        let target = SearchTarget::Movie { name: movie.name };
        let dir = settings.transmission_movie_download_dir.clone();

        self.acquire_for(&settings, WatchTarget::Movie(id), &target, &dir, "movie")
            .await
    }

    async fn watch_tv_episode(&self, id: i64) -> Result<(), TaskError> {
        let Some(episode) = self.watches.get_episode(id)? else {
            debug!(watch_tv_episode_id = id, "Watch episode no longer exists");
            return Ok(());
        };
        if episode.collected || episode.torrent_id.is_some() {
            debug!(watch_tv_episode_id = id, "Watch episode already has a torrent");
            return Ok(());
        }
        let Some(show) = self.watches.get_show(episode.watch_tv_show)? else {
            return Ok(());
        };

        let settings = self.load_settings()?;
        let target = SearchTarget::Episode {
            show: show.name,
            season: episode.season_number,
            episode: episode.episode_number,
        };
        let dir = settings.transmission_tv_download_dir.clone();

        self.acquire_for(&settings, WatchTarget::Episode(id), &target, &dir, "episode")
            .await
    }

    /// Search for a torrent for one watch and assign it. The attempt time is
    /// stamped whatever the outcome.
    async fn acquire_for(
        &self,
        settings: &Settings,
        watch: WatchTarget,
        target: &SearchTarget,
        download_dir: &str,
        kind: &str,
    ) -> Result<(), TaskError> {
        let result = self.acquire(settings, target, download_dir, kind).await;
        self.watches.mark_attempt(watch, Utc::now())?;

        if let Some(assignment) = result? {
            info!(%watch, torrent = %assignment.torrent_name, "Torrent assigned");
            self.watches.assign_torrent(watch, Some(assignment))?;
        }
        Ok(())
    }

    async fn watch_tv_show_season(&self, show_id: i64, season: u32) -> Result<(), TaskError> {
        let Some(show) = self.watches.get_show(show_id)? else {
            debug!(watch_tv_show_id = show_id, "Watch show no longer exists");
            return Ok(());
        };

        let wanted: Vec<_> = self
            .watches
            .list_episodes(
                &EpisodeFilter::new()
                    .with_show(show_id)
                    .with_season(season)
                    .with_collected(false),
            )?
            .into_iter()
            .filter(|e| e.torrent_id.is_none())
            .collect();
        if wanted.is_empty() {
            return Ok(());
        }

        let settings = self.load_settings()?;
        let target = SearchTarget::Season {
            show: show.name,
            season,
        };
        let dir = settings.transmission_tv_download_dir.clone();
        let found = self.acquire(&settings, &target, &dir, "season").await?;

        let now = Utc::now();
        match found {
            Some(assignment) => {
                info!(
                    watch_tv_show_id = show_id,
                    season,
                    episodes = wanted.len(),
                    torrent = %assignment.torrent_name,
                    "Season pack assigned"
                );
                for episode in &wanted {
                    let watch = WatchTarget::Episode(episode.id);
                    self.watches.assign_torrent(watch, Some(assignment.clone()))?;
                    self.watches.mark_attempt(watch, now)?;
                }
            }
            None => {
                debug!(
                    watch_tv_show_id = show_id,
                    season, "No season pack, falling back to single episodes"
                );
                for episode in &wanted {
                    self.queue.enqueue(Task::WatchTvEpisode {
                        watch_tv_episode_id: episode.id,
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Search, select, resolve and add. `None` when nothing acceptable was found.
    ///
    /// Candidates are tried most seeded first. A candidate whose hash is only
    /// known once the daemon has it is removed again when that hash turns
    /// out to be blacklisted.
    async fn acquire(
        &self,
        settings: &Settings,
        target: &SearchTarget,
        download_dir: &str,
        kind: &str,
    ) -> Result<Option<TorrentAssignment>, TaskError> {
        let searcher = self.clients.searcher(settings)?;
        let search = searcher.search(&target.query()).await?;
        let blacklist = self.watches.blacklisted_hashes()?;

        let candidates = rank_candidates(&search.results, target, &blacklist);
        if candidates.is_empty() {
            SEARCH_MISSES.with_label_values(&[kind]).inc();
            debug!(
                query = %search.query.query,
                results = search.results.len(),
                "No acceptable torrent"
            );
            return Ok(None);
        }

        let client = self.clients.torrent_client(settings)?;
        for candidate in candidates {
            let Some(link) = candidate.download_link() else {
                continue;
            };

            let link = swap_jackett_host(link, &settings.jackett_host, settings.jackett_port)?;
            let resolved = TorrentUrlTracer::new(TRACE_TIMEOUT)?.trace(&link).await?;

            let added = client
                .add_torrent(
                    AddTorrentRequest::from_link(resolved).with_download_dir(download_dir),
                )
                .await?;

            if blacklist.contains(&added.hash.to_lowercase()) {
                warn!(
                    torrent_id = added.id,
                    hash = %added.hash,
                    "Resolved torrent is blacklisted, skipping"
                );
                if !added.duplicate {
                    client.remove_torrents(&[added.id], true).await?;
                }
                continue;
            }

            TORRENTS_ADDED.with_label_values(&[kind]).inc();
            if added.duplicate {
                warn!(torrent_id = added.id, "Download daemon already had this torrent");
            }

            return Ok(Some(TorrentAssignment {
                torrent_id: added.id,
                torrent_hash: added.hash,
                torrent_name: added.name,
            }));
        }

        SEARCH_MISSES.with_label_values(&[kind]).inc();
        Ok(None)
    }

    async fn refresh_tmdb_configuration(&self) -> Result<(), TaskError> {
        let settings = self.load_settings()?;
        let catalog = self.clients.catalog(&settings)?;
        let configuration = catalog.configuration().await?;
        self.settings
            .set_tmdb_configuration(configuration, Utc::now())?;
        info!("TMDB configuration refreshed");
        Ok(())
    }

    /// Mark watches whose torrent has finished as collected. Returns how many
    /// were marked.
    pub async fn sweep_completed(&self) -> Result<usize, TaskError> {
        let Some(settings) = self.settings.get()? else {
            return Ok(0);
        };

        let mut pending: HashMap<i64, Vec<WatchTarget>> = HashMap::new();
        for movie in self.watches.list_movies()? {
            if let (false, Some(torrent_id)) = (movie.collected, movie.torrent_id) {
                pending
                    .entry(torrent_id)
                    .or_default()
                    .push(WatchTarget::Movie(movie.id));
            }
        }
        for episode in self
            .watches
            .list_episodes(&EpisodeFilter::new().with_collected(false))?
        {
            if let Some(torrent_id) = episode.torrent_id {
                pending
                    .entry(torrent_id)
                    .or_default()
                    .push(WatchTarget::Episode(episode.id));
            }
        }
        if pending.is_empty() {
            return Ok(0);
        }

        let ids: Vec<i64> = pending.keys().copied().collect();
        let client = self.clients.torrent_client(&settings)?;
        let torrents = client.get_torrents(&ids).await?;

        let now = Utc::now();
        let mut collected = 0;
        for torrent in torrents.iter().filter(|t| t.is_complete()) {
            for watch in pending.get(&torrent.id).into_iter().flatten() {
                self.watches.mark_collected(*watch, now)?;
                debug!(%watch, torrent = %torrent.name, "Collected");
                collected += 1;
            }
        }

        SWEEP_UPDATES
            .with_label_values(&["completion"])
            .inc_by(collected as u64);
        Ok(collected)
    }

    /// Re-enqueue download tasks for uncollected watches without a torrent.
    /// Watches that already have a pending task are skipped.
    pub fn sweep_wanted(&self) -> Result<usize, TaskError> {
        let mut wanted = Vec::new();
        for movie in self.watches.list_movies()? {
            if !movie.collected && movie.torrent_id.is_none() {
                wanted.push(Task::WatchMovie {
                    watch_movie_id: movie.id,
                });
            }
        }
        for episode in self
            .watches
            .list_episodes(&EpisodeFilter::new().with_collected(false))?
        {
            if episode.torrent_id.is_none() {
                wanted.push(Task::WatchTvEpisode {
                    watch_tv_episode_id: episode.id,
                });
            }
        }

        let mut enqueued = 0;
        for task in wanted {
            if self.queue.enqueue_unless_pending(task)?.is_some() {
                enqueued += 1;
            }
        }

        SWEEP_UPDATES
            .with_label_values(&["wanted"])
            .inc_by(enqueued as u64);
        Ok(enqueued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::searcher::SearchError;
    use crate::settings::SqliteSettingsStore;
    use crate::testing::{fixtures, MockClientFactory, MockTaskQueue};
    use crate::watch::{NewWatchMovie, NewWatchTvEpisode, NewWatchTvShow, SqliteWatchStore};

    struct Harness {
        settings: Arc<SqliteSettingsStore>,
        watches: Arc<SqliteWatchStore>,
        queue: Arc<MockTaskQueue>,
        clients: MockClientFactory,
        runner: TaskRunner,
    }

    fn harness() -> Harness {
        let settings = Arc::new(SqliteSettingsStore::in_memory().unwrap());
        settings.create(fixtures::settings_input()).unwrap();
        let watches = Arc::new(SqliteWatchStore::in_memory().unwrap());
        let queue = Arc::new(MockTaskQueue::new());
        let clients = MockClientFactory::new();
        let runner = TaskRunner::new(
            settings.clone(),
            watches.clone(),
            queue.clone(),
            Arc::new(clients.clone()),
        );
        Harness {
            settings,
            watches,
            queue,
            clients,
            runner,
        }
    }

    fn new_movie(name: &str) -> NewWatchMovie {
        NewWatchMovie {
            user: "alice".to_string(),
            tmdb_movie_id: 603,
            name: name.to_string(),
            poster_image_url: None,
        }
    }

    fn add_show_with_episodes(h: &Harness, name: &str, season: u32, episodes: u32) -> i64 {
        let show = h
            .watches
            .create_show(NewWatchTvShow {
                user: "alice".to_string(),
                tmdb_show_id: 1399,
                name: name.to_string(),
                poster_image_url: None,
            })
            .unwrap();
        for e in 1..=episodes {
            h.watches
                .create_episode(NewWatchTvEpisode {
                    user: "alice".to_string(),
                    watch_tv_show: show.id,
                    tmdb_episode_id: (season * 1000 + e) as i64,
                    season_number: season,
                    episode_number: e,
                })
                .unwrap();
        }
        show.id
    }

    #[tokio::test]
    async fn test_watch_movie_adds_best_torrent() {
        let h = harness();
        let movie = h.watches.create_movie(new_movie("The Matrix")).unwrap();
        h.clients
            .searcher
            .set_results(vec![
                fixtures::torrent_result("The.Matrix.1999.720p", "aaa", 10),
                fixtures::torrent_result("The.Matrix.1999.1080p", "bbb", 90),
            ])
            .await;

        h.runner
            .run(&Task::WatchMovie {
                watch_movie_id: movie.id,
            })
            .await
            .unwrap();

        let movie = h.watches.get_movie(movie.id).unwrap().unwrap();
        assert_eq!(movie.torrent_hash.as_deref(), Some("bbb"));
        assert!(movie.torrent_id.is_some());
        assert!(movie.last_attempt_at.is_some());

        let added = h.clients.torrent_client.added_torrents().await;
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].download_dir.as_deref(), Some("movies/"));
        assert!(!added[0].paused);

        let searches = h.clients.searcher.recorded_searches().await;
        assert_eq!(searches[0].query, "The Matrix");
    }

    #[tokio::test]
    async fn test_watch_movie_skips_blacklisted_and_stamps_attempt() {
        let h = harness();
        let movie = h.watches.create_movie(new_movie("Heat")).unwrap();
        h.watches.blacklist("aaa").unwrap();
        h.clients
            .searcher
            .set_results(vec![fixtures::torrent_result("Heat.1995.1080p", "aaa", 100)])
            .await;

        h.runner
            .run(&Task::WatchMovie {
                watch_movie_id: movie.id,
            })
            .await
            .unwrap();

        let movie = h.watches.get_movie(movie.id).unwrap().unwrap();
        assert!(movie.torrent_id.is_none());
        assert!(movie.last_attempt_at.is_some());
        assert!(h.clients.torrent_client.added_torrents().await.is_empty());
    }

    fn hashless(title: &str, link: &str, seeders: u32) -> crate::searcher::TorrentResult {
        let mut result = fixtures::torrent_result(title, "", seeders);
        result.info_hash = None;
        result.magnet_uri = None;
        result.link = Some(link.to_string());
        result
    }

    #[tokio::test]
    async fn test_blacklisted_hash_behind_link_is_removed_again() {
        let h = harness();
        let movie = h.watches.create_movie(new_movie("Heat")).unwrap();
        h.watches.blacklist("aaaa").unwrap();
        h.clients
            .searcher
            .set_results(vec![hashless(
                "Heat.1995.1080p",
                "magnet:?xt=urn:btih:aaaa",
                100,
            )])
            .await;

        h.runner
            .run(&Task::WatchMovie {
                watch_movie_id: movie.id,
            })
            .await
            .unwrap();

        let movie = h.watches.get_movie(movie.id).unwrap().unwrap();
        assert!(movie.torrent_id.is_none());
        assert!(movie.torrent_hash.is_none());
        assert!(movie.last_attempt_at.is_some());

        let removed = h.clients.torrent_client.removed_torrents().await;
        assert_eq!(removed.len(), 1);
        assert!(removed[0].delete_data);
        assert_eq!(h.clients.torrent_client.torrent_count().await, 0);
    }

    #[tokio::test]
    async fn test_blacklisted_link_falls_through_to_next_candidate() {
        let h = harness();
        let movie = h.watches.create_movie(new_movie("Heat")).unwrap();
        h.watches.blacklist("aaaa").unwrap();
        h.clients
            .searcher
            .set_results(vec![
                hashless("Heat.1995.1080p", "magnet:?xt=urn:btih:AAAA", 100),
                fixtures::torrent_result("Heat.1995.720p", "bbbb", 20),
            ])
            .await;

        h.runner
            .run(&Task::WatchMovie {
                watch_movie_id: movie.id,
            })
            .await
            .unwrap();

        let movie = h.watches.get_movie(movie.id).unwrap().unwrap();
        assert_eq!(movie.torrent_hash.as_deref(), Some("bbbb"));
        assert_eq!(h.clients.torrent_client.added_torrents().await.len(), 2);
        assert_eq!(h.clients.torrent_client.torrent_count().await, 1);
    }

    #[tokio::test]
    async fn test_search_failure_still_stamps_attempt() {
        let h = harness();
        let movie = h.watches.create_movie(new_movie("Heat")).unwrap();
        h.clients
            .searcher
            .set_next_error(SearchError::Timeout)
            .await;

        let result = h
            .runner
            .run(&Task::WatchMovie {
                watch_movie_id: movie.id,
            })
            .await;
        assert!(matches!(result, Err(TaskError::Search(_))));

        let movie = h.watches.get_movie(movie.id).unwrap().unwrap();
        assert!(movie.last_attempt_at.is_some());
    }

    #[tokio::test]
    async fn test_missing_watch_is_a_noop() {
        let h = harness();
        h.runner
            .run(&Task::WatchMovie { watch_movie_id: 42 })
            .await
            .unwrap();
        assert_eq!(h.clients.searcher.search_count().await, 0);
    }

    #[tokio::test]
    async fn test_watch_episode_uses_episode_marker() {
        let h = harness();
        let show_id = add_show_with_episodes(&h, "Severance", 1, 3);
        let episodes = h
            .watches
            .list_episodes(&EpisodeFilter::new().with_show(show_id))
            .unwrap();
        h.clients
            .searcher
            .set_results(vec![
                fixtures::torrent_result("Severance.S01E01.1080p", "e01", 80),
                fixtures::torrent_result("Severance.S01E02.1080p", "e02", 40),
            ])
            .await;

        h.runner
            .run(&Task::WatchTvEpisode {
                watch_tv_episode_id: episodes[1].id,
            })
            .await
            .unwrap();

        let episode = h.watches.get_episode(episodes[1].id).unwrap().unwrap();
        assert_eq!(episode.torrent_hash.as_deref(), Some("e02"));
        let searches = h.clients.searcher.recorded_searches().await;
        assert_eq!(searches[0].query, "Severance S01E02");
        let added = h.clients.torrent_client.added_torrents().await;
        assert_eq!(added[0].download_dir.as_deref(), Some("tv/"));
    }

    #[tokio::test]
    async fn test_season_pack_assigned_to_every_episode() {
        let h = harness();
        let show_id = add_show_with_episodes(&h, "The Wire", 1, 4);
        h.clients
            .searcher
            .set_results(vec![fixtures::torrent_result("The.Wire.S01.1080p", "pack", 30)])
            .await;

        h.runner
            .run(&Task::WatchTvShowSeason {
                watch_tv_show_id: show_id,
                season_number: 1,
            })
            .await
            .unwrap();

        let episodes = h
            .watches
            .list_episodes(&EpisodeFilter::new().with_show(show_id))
            .unwrap();
        assert!(episodes
            .iter()
            .all(|e| e.torrent_hash.as_deref() == Some("pack")));
        assert_eq!(h.clients.torrent_client.added_torrents().await.len(), 1);
        assert!(h.queue.enqueued().is_empty());
    }

    #[tokio::test]
    async fn test_season_without_pack_falls_back_to_episodes() {
        let h = harness();
        let show_id = add_show_with_episodes(&h, "The Wire", 1, 3);
        h.clients
            .searcher
            .set_results(vec![fixtures::torrent_result("The.Wire.S01E01.720p", "e1", 30)])
            .await;

        h.runner
            .run(&Task::WatchTvShowSeason {
                watch_tv_show_id: show_id,
                season_number: 1,
            })
            .await
            .unwrap();

        assert_eq!(h.queue.count("watch_tv_episode"), 3);
        assert!(h.clients.torrent_client.added_torrents().await.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_tmdb_configuration() {
        let h = harness();
        h.clients
            .catalog
            .set_configuration(serde_json::json!({"images": {"base_url": "http://x/"}}))
            .await;

        h.runner.run(&Task::RefreshTmdbConfiguration).await.unwrap();

        let settings = h.settings.get().unwrap().unwrap();
        assert_eq!(
            settings.tmdb_configuration.unwrap()["images"]["base_url"],
            "http://x/"
        );
        assert!(settings.tmdb_configuration_date.is_some());
    }

    #[tokio::test]
    async fn test_refresh_without_settings_fails() {
        let h = harness();
        let runner = TaskRunner::new(
            Arc::new(SqliteSettingsStore::in_memory().unwrap()),
            h.watches.clone(),
            h.queue.clone(),
            Arc::new(h.clients.clone()),
        );
        assert!(matches!(
            runner.run(&Task::RefreshTmdbConfiguration).await,
            Err(TaskError::MissingSettings)
        ));
    }

    #[tokio::test]
    async fn test_sweep_completed_marks_collected() {
        let h = harness();
        let done = h.watches.create_movie(new_movie("Done")).unwrap();
        let pending = h.watches.create_movie(new_movie("Pending")).unwrap();
        h.clients
            .torrent_client
            .add_mock_torrent(fixtures::torrent_info(10, "ddd", 1.0))
            .await;
        h.clients
            .torrent_client
            .add_mock_torrent(fixtures::torrent_info(11, "ppp", 0.4))
            .await;
        for (movie, id, hash) in [(&done, 10, "ddd"), (&pending, 11, "ppp")] {
            h.watches
                .assign_torrent(
                    WatchTarget::Movie(movie.id),
                    Some(TorrentAssignment {
                        torrent_id: id,
                        torrent_hash: hash.to_string(),
                        torrent_name: hash.to_string(),
                    }),
                )
                .unwrap();
        }

        assert_eq!(h.runner.sweep_completed().await.unwrap(), 1);
        assert!(h.watches.get_movie(done.id).unwrap().unwrap().collected);
        assert!(!h.watches.get_movie(pending.id).unwrap().unwrap().collected);

        assert_eq!(h.runner.sweep_completed().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sweep_wanted_enqueues_missing_torrents() {
        let h = harness();
        h.watches.create_movie(new_movie("A")).unwrap();
        let b = h.watches.create_movie(new_movie("B")).unwrap();
        h.watches
            .assign_torrent(
                WatchTarget::Movie(b.id),
                Some(TorrentAssignment {
                    torrent_id: 1,
                    torrent_hash: "h".to_string(),
                    torrent_name: "n".to_string(),
                }),
            )
            .unwrap();
        add_show_with_episodes(&h, "Show", 1, 2);

        assert_eq!(h.runner.sweep_wanted().unwrap(), 3);
        assert_eq!(h.queue.count("watch_movie"), 1);
        assert_eq!(h.queue.count("watch_tv_episode"), 2);

        // Nothing ran in between, so a second sweep adds nothing
        assert_eq!(h.runner.sweep_wanted().unwrap(), 0);
        assert_eq!(h.queue.enqueued().len(), 3);
    }
}
