use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Shared key, required when `method = "api_key"`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Staff account created at startup when no user with that name exists.
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Every caller is trusted as staff.
    None,
    /// A single shared key, carried as a bearer token or `X-API-Key`.
    ApiKey,
    /// Per-user tokens issued by `POST /api/auth`.
    Token,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::None => "none",
            AuthMethod::ApiKey => "api_key",
            AuthMethod::Token => "token",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("marquee.db")
}

/// Background task worker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TasksConfig {
    /// Run the worker inside the server process.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Delay between queue polls when the queue is empty.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Age after which the cached TMDB configuration is refreshed.
    #[serde(default = "default_tmdb_configuration_max_age_hours")]
    pub tmdb_configuration_max_age_hours: u64,
    /// Interval of the sweep marking finished downloads as collected.
    #[serde(default = "default_completion_sweep_secs")]
    pub completion_sweep_secs: u64,
    /// Interval of the sweep re-enqueuing watches that still lack a torrent.
    #[serde(default = "default_wanted_sweep_secs")]
    pub wanted_sweep_secs: u64,
    /// Finished and failed tasks older than this are pruned from the queue.
    #[serde(default = "default_retain_finished_hours")]
    pub retain_finished_hours: u64,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: default_poll_interval_ms(),
            tmdb_configuration_max_age_hours: default_tmdb_configuration_max_age_hours(),
            completion_sweep_secs: default_completion_sweep_secs(),
            wanted_sweep_secs: default_wanted_sweep_secs(),
            retain_finished_hours: default_retain_finished_hours(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_tmdb_configuration_max_age_hours() -> u64 {
    24
}

fn default_completion_sweep_secs() -> u64 {
    300
}

fn default_wanted_sweep_secs() -> u64 {
    3600
}

fn default_retain_finished_hours() -> u64 {
    24 * 7
}

/// HTTP response cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    60 * 60 * 12
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub tasks: TasksConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub api_key_configured: bool,
    /// Username of the bootstrap admin; the password is never exposed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap_admin: Option<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: config.auth.method.as_str().to_string(),
                api_key_configured: config
                    .auth
                    .api_key
                    .as_deref()
                    .is_some_and(|k| !k.is_empty()),
                bootstrap_admin: config
                    .auth
                    .bootstrap_admin
                    .as_ref()
                    .map(|a| a.username.clone()),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            tasks: config.tasks.clone(),
            cache: config.cache.clone(),
        }
    }
}
