pub mod auth;
pub mod clients;
pub mod config;
pub mod db;
pub mod media;
pub mod metrics;
pub mod searcher;
pub mod selection;
pub mod settings;
pub mod tasks;
pub mod testing;
pub mod torrent_client;
pub mod torrent_url;
pub mod users;
pub mod watch;

pub use auth::{
    create_authenticator, AuthError, AuthRequest, Authenticator, Identity, NoneAuthenticator,
};
pub use clients::{ClientFactory, SettingsClientFactory};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use db::StoreError;
pub use settings::{Settings, SettingsInput, SettingsStore, SqliteSettingsStore};
pub use tasks::{SqliteTaskQueue, Task, TaskError, TaskHandle, TaskQueue, TaskRunner, TaskWorker};
pub use users::{SqliteUserStore, User, UserStore};
pub use watch::{SqliteWatchStore, WatchStore};
