//! SQLite-backed watch store.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    BlacklistEntry, EpisodeFilter, NewWatchMovie, NewWatchTvEpisode, NewWatchTvShow,
    TorrentAssignment, WatchMovie, WatchStore, WatchTarget, WatchTvEpisode, WatchTvShow,
    WatchUpdate,
};
use crate::db::{self, StoreError};

const MOVIE_COLUMNS: &str = "id, user, tmdb_movie_id, name, poster_image_url, torrent_id, torrent_hash, torrent_name, collected, collected_at, last_attempt_at, created_at";

const SHOW_COLUMNS: &str = "id, user, tmdb_show_id, name, poster_image_url, created_at";

const EPISODE_COLUMNS: &str = "id, user, watch_tv_show, tmdb_episode_id, season_number, episode_number, torrent_id, torrent_hash, torrent_name, collected, collected_at, last_attempt_at, created_at";

pub struct SqliteWatchStore {
    conn: Mutex<Connection>,
}

impl SqliteWatchStore {
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = db::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory watch store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = db::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS watch_movies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user TEXT NOT NULL,
                tmdb_movie_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                poster_image_url TEXT,
                torrent_id INTEGER,
                torrent_hash TEXT,
                torrent_name TEXT,
                collected INTEGER NOT NULL DEFAULT 0,
                collected_at TEXT,
                last_attempt_at TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS watch_tv_shows (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user TEXT NOT NULL,
                tmdb_show_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                poster_image_url TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS watch_tv_episodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user TEXT NOT NULL,
                watch_tv_show INTEGER NOT NULL REFERENCES watch_tv_shows(id) ON DELETE CASCADE,
                tmdb_episode_id INTEGER NOT NULL,
                season_number INTEGER NOT NULL,
                episode_number INTEGER NOT NULL,
                torrent_id INTEGER,
                torrent_hash TEXT,
                torrent_name TEXT,
                collected INTEGER NOT NULL DEFAULT 0,
                collected_at TEXT,
                last_attempt_at TEXT,
                created_at TEXT NOT NULL,
                UNIQUE (watch_tv_show, season_number, episode_number)
            );

            CREATE TABLE IF NOT EXISTS torrent_blacklist (
                hash TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_watch_movies_collected ON watch_movies(collected);
            CREATE INDEX IF NOT EXISTS idx_watch_tv_episodes_collected ON watch_tv_episodes(collected);
            "#,
        )?;
        Ok(())
    }

    fn row_to_movie(row: &rusqlite::Row) -> rusqlite::Result<WatchMovie> {
        let collected_at: Option<String> = row.get(9)?;
        let last_attempt_at: Option<String> = row.get(10)?;
        let created_at: String = row.get(11)?;
        Ok(WatchMovie {
            id: row.get(0)?,
            user: row.get(1)?,
            tmdb_movie_id: row.get(2)?,
            name: row.get(3)?,
            poster_image_url: row.get(4)?,
            torrent_id: row.get(5)?,
            torrent_hash: row.get(6)?,
            torrent_name: row.get(7)?,
            collected: row.get(8)?,
            collected_at: db::parse_optional_timestamp(collected_at),
            last_attempt_at: db::parse_optional_timestamp(last_attempt_at),
            created_at: db::parse_timestamp(&created_at),
        })
    }

    fn row_to_show(row: &rusqlite::Row) -> rusqlite::Result<WatchTvShow> {
        let created_at: String = row.get(5)?;
        Ok(WatchTvShow {
            id: row.get(0)?,
            user: row.get(1)?,
            tmdb_show_id: row.get(2)?,
            name: row.get(3)?,
            poster_image_url: row.get(4)?,
            created_at: db::parse_timestamp(&created_at),
        })
    }

    fn row_to_episode(row: &rusqlite::Row) -> rusqlite::Result<WatchTvEpisode> {
        let collected_at: Option<String> = row.get(10)?;
        let last_attempt_at: Option<String> = row.get(11)?;
        let created_at: String = row.get(12)?;
        Ok(WatchTvEpisode {
            id: row.get(0)?,
            user: row.get(1)?,
            watch_tv_show: row.get(2)?,
            tmdb_episode_id: row.get(3)?,
            season_number: row.get(4)?,
            episode_number: row.get(5)?,
            torrent_id: row.get(6)?,
            torrent_hash: row.get(7)?,
            torrent_name: row.get(8)?,
            collected: row.get(9)?,
            collected_at: db::parse_optional_timestamp(collected_at),
            last_attempt_at: db::parse_optional_timestamp(last_attempt_at),
            created_at: db::parse_timestamp(&created_at),
        })
    }

    fn load_movie(conn: &Connection, id: i64) -> Result<Option<WatchMovie>, StoreError> {
        let sql = format!("SELECT {MOVIE_COLUMNS} FROM watch_movies WHERE id = ?");
        Ok(conn.query_row(&sql, params![id], Self::row_to_movie).optional()?)
    }

    fn load_show(conn: &Connection, id: i64) -> Result<Option<WatchTvShow>, StoreError> {
        let sql = format!("SELECT {SHOW_COLUMNS} FROM watch_tv_shows WHERE id = ?");
        Ok(conn.query_row(&sql, params![id], Self::row_to_show).optional()?)
    }

    fn load_episode(conn: &Connection, id: i64) -> Result<Option<WatchTvEpisode>, StoreError> {
        let sql = format!("SELECT {EPISODE_COLUMNS} FROM watch_tv_episodes WHERE id = ?");
        Ok(conn
            .query_row(&sql, params![id], Self::row_to_episode)
            .optional()?)
    }

    fn build_episode_where(filter: &EpisodeFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(show) = filter.watch_tv_show {
            conditions.push("watch_tv_show = ?");
            params.push(Box::new(show));
        }
        if let Some(season) = filter.season_number {
            conditions.push("season_number = ?");
            params.push(Box::new(season));
        }
        if let Some(collected) = filter.collected {
            conditions.push("collected = ?");
            params.push(Box::new(collected));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// SQL fragment applying the collected flag of an update, if any.
    fn collected_assignment(collected: bool) -> (&'static str, Option<String>) {
        if collected {
            (
                "collected = 1, collected_at = COALESCE(collected_at, ?)",
                Some(Utc::now().to_rfc3339()),
            )
        } else {
            ("collected = 0, collected_at = ?", None)
        }
    }
}

impl WatchStore for SqliteWatchStore {
    fn create_movie(&self, movie: NewWatchMovie) -> Result<WatchMovie, StoreError> {
        let conn = db::lock(&self.conn)?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO watch_movies (user, tmdb_movie_id, name, poster_image_url, created_at) VALUES (?, ?, ?, ?, ?)",
            params![
                movie.user,
                movie.tmdb_movie_id,
                movie.name,
                movie.poster_image_url,
                now.to_rfc3339(),
            ],
        )?;

        Ok(WatchMovie {
            id: conn.last_insert_rowid(),
            user: movie.user,
            tmdb_movie_id: movie.tmdb_movie_id,
            name: movie.name,
            poster_image_url: movie.poster_image_url,
            torrent_id: None,
            torrent_hash: None,
            torrent_name: None,
            collected: false,
            collected_at: None,
            last_attempt_at: None,
            created_at: now,
        })
    }

    fn get_movie(&self, id: i64) -> Result<Option<WatchMovie>, StoreError> {
        let conn = db::lock(&self.conn)?;
        Self::load_movie(&conn, id)
    }

    fn list_movies(&self) -> Result<Vec<WatchMovie>, StoreError> {
        let conn = db::lock(&self.conn)?;
        let sql = format!("SELECT {MOVIE_COLUMNS} FROM watch_movies ORDER BY id DESC");
        let mut stmt = conn.prepare(&sql)?;
        let movies = stmt
            .query_map([], Self::row_to_movie)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(movies)
    }

    fn update_movie(&self, id: i64, update: WatchUpdate) -> Result<WatchMovie, StoreError> {
        let conn = db::lock(&self.conn)?;
        if Self::load_movie(&conn, id)?.is_none() {
            return Err(StoreError::NotFound(format!("watch movie {id}")));
        }

        if let Some(name) = &update.name {
            conn.execute(
                "UPDATE watch_movies SET name = ? WHERE id = ?",
                params![name, id],
            )?;
        }
        if let Some(poster) = &update.poster_image_url {
            conn.execute(
                "UPDATE watch_movies SET poster_image_url = ? WHERE id = ?",
                params![poster, id],
            )?;
        }
        if let Some(collected) = update.collected {
            let (assignment, at) = Self::collected_assignment(collected);
            conn.execute(
                &format!("UPDATE watch_movies SET {assignment} WHERE id = ?"),
                params![at, id],
            )?;
        }

        Self::load_movie(&conn, id)?.ok_or_else(|| StoreError::NotFound(format!("watch movie {id}")))
    }

    fn delete_movie(&self, id: i64) -> Result<(), StoreError> {
        let conn = db::lock(&self.conn)?;
        let deleted = conn.execute("DELETE FROM watch_movies WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("watch movie {id}")));
        }
        Ok(())
    }

    fn create_show(&self, show: NewWatchTvShow) -> Result<WatchTvShow, StoreError> {
        let conn = db::lock(&self.conn)?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO watch_tv_shows (user, tmdb_show_id, name, poster_image_url, created_at) VALUES (?, ?, ?, ?, ?)",
            params![
                show.user,
                show.tmdb_show_id,
                show.name,
                show.poster_image_url,
                now.to_rfc3339(),
            ],
        )?;

        Ok(WatchTvShow {
            id: conn.last_insert_rowid(),
            user: show.user,
            tmdb_show_id: show.tmdb_show_id,
            name: show.name,
            poster_image_url: show.poster_image_url,
            created_at: now,
        })
    }

    fn get_show(&self, id: i64) -> Result<Option<WatchTvShow>, StoreError> {
        let conn = db::lock(&self.conn)?;
        Self::load_show(&conn, id)
    }

    fn list_shows(&self) -> Result<Vec<WatchTvShow>, StoreError> {
        let conn = db::lock(&self.conn)?;
        let sql = format!("SELECT {SHOW_COLUMNS} FROM watch_tv_shows ORDER BY id DESC");
        let mut stmt = conn.prepare(&sql)?;
        let shows = stmt
            .query_map([], Self::row_to_show)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(shows)
    }

    fn update_show(&self, id: i64, update: WatchUpdate) -> Result<WatchTvShow, StoreError> {
        let conn = db::lock(&self.conn)?;
        if Self::load_show(&conn, id)?.is_none() {
            return Err(StoreError::NotFound(format!("watch tv show {id}")));
        }

        if let Some(name) = &update.name {
            conn.execute(
                "UPDATE watch_tv_shows SET name = ? WHERE id = ?",
                params![name, id],
            )?;
        }
        if let Some(poster) = &update.poster_image_url {
            conn.execute(
                "UPDATE watch_tv_shows SET poster_image_url = ? WHERE id = ?",
                params![poster, id],
            )?;
        }

        Self::load_show(&conn, id)?
            .ok_or_else(|| StoreError::NotFound(format!("watch tv show {id}")))
    }

    fn delete_show(&self, id: i64) -> Result<(), StoreError> {
        let mut conn = db::lock(&self.conn)?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM watch_tv_episodes WHERE watch_tv_show = ?",
            params![id],
        )?;
        let deleted = tx.execute("DELETE FROM watch_tv_shows WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("watch tv show {id}")));
        }

        tx.commit()?;
        Ok(())
    }

    fn create_episode(&self, episode: NewWatchTvEpisode) -> Result<WatchTvEpisode, StoreError> {
        let conn = db::lock(&self.conn)?;
        if Self::load_show(&conn, episode.watch_tv_show)?.is_none() {
            return Err(StoreError::NotFound(format!(
                "watch tv show {}",
                episode.watch_tv_show
            )));
        }

        let now = Utc::now();
        conn.execute(
            "INSERT INTO watch_tv_episodes (user, watch_tv_show, tmdb_episode_id, season_number, episode_number, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                episode.user,
                episode.watch_tv_show,
                episode.tmdb_episode_id,
                episode.season_number,
                episode.episode_number,
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| {
            if db::is_constraint_violation(&e) {
                StoreError::Conflict(format!(
                    "season {} episode {} is already watched",
                    episode.season_number, episode.episode_number
                ))
            } else {
                e.into()
            }
        })?;

        Ok(WatchTvEpisode {
            id: conn.last_insert_rowid(),
            user: episode.user,
            watch_tv_show: episode.watch_tv_show,
            tmdb_episode_id: episode.tmdb_episode_id,
            season_number: episode.season_number,
            episode_number: episode.episode_number,
            torrent_id: None,
            torrent_hash: None,
            torrent_name: None,
            collected: false,
            collected_at: None,
            last_attempt_at: None,
            created_at: now,
        })
    }

    fn get_or_create_episode(
        &self,
        episode: NewWatchTvEpisode,
    ) -> Result<(WatchTvEpisode, bool), StoreError> {
        let conn = db::lock(&self.conn)?;

        let inserted = conn.execute(
            "INSERT INTO watch_tv_episodes (user, watch_tv_show, tmdb_episode_id, season_number, episode_number, created_at) VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (watch_tv_show, season_number, episode_number) DO NOTHING",
            params![
                episode.user,
                episode.watch_tv_show,
                episode.tmdb_episode_id,
                episode.season_number,
                episode.episode_number,
                Utc::now().to_rfc3339(),
            ],
        )?;

        let sql = format!(
            "SELECT {EPISODE_COLUMNS} FROM watch_tv_episodes WHERE watch_tv_show = ? AND season_number = ? AND episode_number = ?"
        );
        let stored = conn.query_row(
            &sql,
            params![
                episode.watch_tv_show,
                episode.season_number,
                episode.episode_number
            ],
            Self::row_to_episode,
        )?;

        Ok((stored, inserted == 1))
    }

    fn get_episode(&self, id: i64) -> Result<Option<WatchTvEpisode>, StoreError> {
        let conn = db::lock(&self.conn)?;
        Self::load_episode(&conn, id)
    }

    fn list_episodes(&self, filter: &EpisodeFilter) -> Result<Vec<WatchTvEpisode>, StoreError> {
        let conn = db::lock(&self.conn)?;
        let (where_clause, params) = Self::build_episode_where(filter);
        let sql = format!(
            "SELECT {EPISODE_COLUMNS} FROM watch_tv_episodes {where_clause} ORDER BY watch_tv_show, season_number, episode_number"
        );

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let episodes = stmt
            .query_map(param_refs.as_slice(), Self::row_to_episode)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(episodes)
    }

    fn set_episode_collected(
        &self,
        id: i64,
        collected: bool,
    ) -> Result<WatchTvEpisode, StoreError> {
        let conn = db::lock(&self.conn)?;
        let (assignment, at) = Self::collected_assignment(collected);
        let updated = conn.execute(
            &format!("UPDATE watch_tv_episodes SET {assignment} WHERE id = ?"),
            params![at, id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("watch tv episode {id}")));
        }

        Self::load_episode(&conn, id)?
            .ok_or_else(|| StoreError::NotFound(format!("watch tv episode {id}")))
    }

    fn delete_episode(&self, id: i64) -> Result<(), StoreError> {
        let conn = db::lock(&self.conn)?;
        let deleted = conn.execute("DELETE FROM watch_tv_episodes WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("watch tv episode {id}")));
        }
        Ok(())
    }

    fn assign_torrent(
        &self,
        target: WatchTarget,
        assignment: Option<TorrentAssignment>,
    ) -> Result<(), StoreError> {
        let conn = db::lock(&self.conn)?;
        let (torrent_id, hash, name) = match assignment {
            Some(a) => (Some(a.torrent_id), Some(a.torrent_hash), Some(a.torrent_name)),
            None => (None, None, None),
        };

        let sql = format!(
            "UPDATE {} SET torrent_id = ?, torrent_hash = ?, torrent_name = ? WHERE id = ?",
            target.table()
        );
        let updated = conn.execute(&sql, params![torrent_id, hash, name, target.id()])?;
        if updated == 0 {
            return Err(StoreError::NotFound(target.to_string()));
        }
        Ok(())
    }

    fn mark_attempt(&self, target: WatchTarget, at: DateTime<Utc>) -> Result<(), StoreError> {
        let conn = db::lock(&self.conn)?;
        let sql = format!("UPDATE {} SET last_attempt_at = ? WHERE id = ?", target.table());
        let updated = conn.execute(&sql, params![at.to_rfc3339(), target.id()])?;
        if updated == 0 {
            return Err(StoreError::NotFound(target.to_string()));
        }
        Ok(())
    }

    fn mark_collected(&self, target: WatchTarget, at: DateTime<Utc>) -> Result<(), StoreError> {
        let conn = db::lock(&self.conn)?;
        let sql = format!(
            "UPDATE {} SET collected = 1, collected_at = ? WHERE id = ?",
            target.table()
        );
        let updated = conn.execute(&sql, params![at.to_rfc3339(), target.id()])?;
        if updated == 0 {
            return Err(StoreError::NotFound(target.to_string()));
        }
        Ok(())
    }

    fn blacklist(&self, hash: &str) -> Result<(BlacklistEntry, bool), StoreError> {
        let conn = db::lock(&self.conn)?;
        let hash = hash.to_lowercase();

        let inserted = conn.execute(
            "INSERT INTO torrent_blacklist (hash, created_at) VALUES (?, ?) ON CONFLICT (hash) DO NOTHING",
            params![hash, Utc::now().to_rfc3339()],
        )?;

        let created_at: String = conn.query_row(
            "SELECT created_at FROM torrent_blacklist WHERE hash = ?",
            params![hash],
            |row| row.get(0),
        )?;

        Ok((
            BlacklistEntry {
                hash,
                created_at: db::parse_timestamp(&created_at),
            },
            inserted == 1,
        ))
    }

    fn is_blacklisted(&self, hash: &str) -> Result<bool, StoreError> {
        let conn = db::lock(&self.conn)?;
        let found = conn
            .query_row(
                "SELECT 1 FROM torrent_blacklist WHERE hash = ?",
                params![hash.to_lowercase()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn blacklisted_hashes(&self) -> Result<HashSet<String>, StoreError> {
        let conn = db::lock(&self.conn)?;
        let mut stmt = conn.prepare("SELECT hash FROM torrent_blacklist")?;
        let hashes = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(hashes)
    }
}
