use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Primary key of the single settings row.
pub const SETTINGS_ID: i64 = 1;

/// The persisted connection settings for every external service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub id: i64,
    pub jackett_host: String,
    pub jackett_port: u16,
    pub jackett_token: String,
    pub transmission_host: String,
    pub transmission_port: u16,
    pub transmission_user: String,
    pub transmission_pass: String,
    pub transmission_tv_download_dir: String,
    pub transmission_movie_download_dir: String,
    pub tmdb_token: String,
    /// Cached response of TMDB's `/configuration` endpoint.
    pub tmdb_configuration: Option<serde_json::Value>,
    pub tmdb_configuration_date: Option<DateTime<Utc>>,
}

impl Settings {
    pub fn jackett_url(&self) -> String {
        format!("http://{}:{}", self.jackett_host, self.jackett_port)
    }

    pub fn transmission_url(&self) -> String {
        format!(
            "http://{}:{}/transmission/rpc",
            self.transmission_host, self.transmission_port
        )
    }

    /// True when the cached TMDB configuration is missing or older than `max_age`.
    pub fn needs_tmdb_configuration(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        match (&self.tmdb_configuration, self.tmdb_configuration_date) {
            (Some(_), Some(fetched_at)) => now - fetched_at > max_age,
            _ => true,
        }
    }
}

/// The user-editable part of the settings, used for create and full update.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsInput {
    #[serde(default = "default_jackett_host")]
    pub jackett_host: String,
    #[serde(default = "default_jackett_port")]
    pub jackett_port: u16,
    #[serde(default)]
    pub jackett_token: String,
    #[serde(default = "default_transmission_host")]
    pub transmission_host: String,
    #[serde(default = "default_transmission_port")]
    pub transmission_port: u16,
    #[serde(default)]
    pub transmission_user: String,
    #[serde(default)]
    pub transmission_pass: String,
    #[serde(default = "default_tv_download_dir")]
    pub transmission_tv_download_dir: String,
    #[serde(default = "default_movie_download_dir")]
    pub transmission_movie_download_dir: String,
    #[serde(default)]
    pub tmdb_token: String,
}

impl Default for SettingsInput {
    fn default() -> Self {
        Self {
            jackett_host: default_jackett_host(),
            jackett_port: default_jackett_port(),
            jackett_token: String::new(),
            transmission_host: default_transmission_host(),
            transmission_port: default_transmission_port(),
            transmission_user: String::new(),
            transmission_pass: String::new(),
            transmission_tv_download_dir: default_tv_download_dir(),
            transmission_movie_download_dir: default_movie_download_dir(),
            tmdb_token: String::new(),
        }
    }
}

fn default_jackett_host() -> String {
    "jackett".to_string()
}

fn default_jackett_port() -> u16 {
    9117
}

fn default_transmission_host() -> String {
    "transmission".to_string()
}

fn default_transmission_port() -> u16 {
    9091
}

fn default_tv_download_dir() -> String {
    "tv/".to_string()
}

fn default_movie_download_dir() -> String {
    "movies/".to_string()
}
