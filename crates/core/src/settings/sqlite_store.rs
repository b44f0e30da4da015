//! SQLite-backed settings store.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{Settings, SettingsInput, SettingsStore, SETTINGS_ID};
use crate::db::{self, StoreError};

pub struct SqliteSettingsStore {
    conn: Mutex<Connection>,
}

impl SqliteSettingsStore {
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = db::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory settings store (useful for testing).
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
            CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                jackett_host TEXT NOT NULL,
                jackett_port INTEGER NOT NULL,
                jackett_token TEXT NOT NULL,
                transmission_host TEXT NOT NULL,
                transmission_port INTEGER NOT NULL,
                transmission_user TEXT NOT NULL,
                transmission_pass TEXT NOT NULL,
                transmission_tv_download_dir TEXT NOT NULL,
                transmission_movie_download_dir TEXT NOT NULL,
                tmdb_token TEXT NOT NULL,
                tmdb_configuration TEXT,
                tmdb_configuration_date TEXT
            );
            "#,
        )?;
        Ok(())
    }

    fn row_to_settings(row: &rusqlite::Row) -> rusqlite::Result<Settings> {
        let configuration: Option<String> = row.get(11)?;
        let configuration_date: Option<String> = row.get(12)?;
        Ok(Settings {
            id: row.get(0)?,
            jackett_host: row.get(1)?,
            jackett_port: row.get(2)?,
            jackett_token: row.get(3)?,
            transmission_host: row.get(4)?,
            transmission_port: row.get(5)?,
            transmission_user: row.get(6)?,
            transmission_pass: row.get(7)?,
            transmission_tv_download_dir: row.get(8)?,
            transmission_movie_download_dir: row.get(9)?,
            tmdb_token: row.get(10)?,
            tmdb_configuration: configuration.and_then(|json| serde_json::from_str(&json).ok()),
            tmdb_configuration_date: db::parse_optional_timestamp(configuration_date),
        })
    }

    fn load(conn: &Connection) -> Result<Option<Settings>, StoreError> {
        let settings = conn
            .query_row(
                "SELECT id, jackett_host, jackett_port, jackett_token, transmission_host, transmission_port, transmission_user, transmission_pass, transmission_tv_download_dir, transmission_movie_download_dir, tmdb_token, tmdb_configuration, tmdb_configuration_date FROM settings WHERE id = ?",
                params![SETTINGS_ID],
                Self::row_to_settings,
            )
            .optional()?;
        Ok(settings)
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn get(&self) -> Result<Option<Settings>, StoreError> {
        let conn = db::lock(&self.conn)?;
        Self::load(&conn)
    }

    fn create(&self, input: SettingsInput) -> Result<Settings, StoreError> {
        let conn = db::lock(&self.conn)?;

        if Self::load(&conn)?.is_some() {
            return Err(StoreError::Conflict(
                "settings already exist".to_string(),
            ));
        }

        conn.execute(
            "INSERT INTO settings (id, jackett_host, jackett_port, jackett_token, transmission_host, transmission_port, transmission_user, transmission_pass, transmission_tv_download_dir, transmission_movie_download_dir, tmdb_token) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                SETTINGS_ID,
                input.jackett_host,
                input.jackett_port,
                input.jackett_token,
                input.transmission_host,
                input.transmission_port,
                input.transmission_user,
                input.transmission_pass,
                input.transmission_tv_download_dir,
                input.transmission_movie_download_dir,
                input.tmdb_token,
            ],
        )
        .map_err(|e| {
            if db::is_constraint_violation(&e) {
                StoreError::Conflict("settings already exist".to_string())
            } else {
                e.into()
            }
        })?;

        Self::load(&conn)?.ok_or_else(|| StoreError::NotFound("settings".to_string()))
    }

    fn update(&self, id: i64, input: SettingsInput) -> Result<Settings, StoreError> {
        let conn = db::lock(&self.conn)?;

        let updated = conn.execute(
            "UPDATE settings SET jackett_host = ?, jackett_port = ?, jackett_token = ?, transmission_host = ?, transmission_port = ?, transmission_user = ?, transmission_pass = ?, transmission_tv_download_dir = ?, transmission_movie_download_dir = ?, tmdb_token = ? WHERE id = ?",
            params![
                input.jackett_host,
                input.jackett_port,
                input.jackett_token,
                input.transmission_host,
                input.transmission_port,
                input.transmission_user,
                input.transmission_pass,
                input.transmission_tv_download_dir,
                input.transmission_movie_download_dir,
                input.tmdb_token,
                id,
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("settings {id}")));
        }

        Self::load(&conn)?.ok_or_else(|| StoreError::NotFound(format!("settings {id}")))
    }

    fn set_tmdb_configuration(
        &self,
        configuration: serde_json::Value,
        fetched_at: DateTime<Utc>,
    ) -> Result<Settings, StoreError> {
        let conn = db::lock(&self.conn)?;
        let json = serde_json::to_string(&configuration)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let updated = conn.execute(
            "UPDATE settings SET tmdb_configuration = ?, tmdb_configuration_date = ? WHERE id = ?",
            params![json, fetched_at.to_rfc3339(), SETTINGS_ID],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound("settings".to_string()));
        }

        Self::load(&conn)?.ok_or_else(|| StoreError::NotFound("settings".to_string()))
    }
}
