use std::sync::Arc;
use std::time::Duration;

use marquee_core::{
    Authenticator, ClientFactory, Config, SanitizedConfig, SettingsStore, TaskQueue, UserStore,
    WatchStore,
};

use crate::api::cache::ResponseCache;

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    users: Arc<dyn UserStore>,
    settings: Arc<dyn SettingsStore>,
    watches: Arc<dyn WatchStore>,
    tasks: Arc<dyn TaskQueue>,
    clients: Arc<dyn ClientFactory>,
    cache: ResponseCache,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        users: Arc<dyn UserStore>,
        settings: Arc<dyn SettingsStore>,
        watches: Arc<dyn WatchStore>,
        tasks: Arc<dyn TaskQueue>,
        clients: Arc<dyn ClientFactory>,
    ) -> Self {
        let cache = ResponseCache::new(Duration::from_secs(config.cache.ttl_secs));
        Self {
            config,
            authenticator,
            users,
            settings,
            watches,
            tasks,
            clients,
            cache,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    pub fn settings(&self) -> &dyn SettingsStore {
        self.settings.as_ref()
    }

    pub fn watches(&self) -> &dyn WatchStore {
        self.watches.as_ref()
    }

    pub fn tasks(&self) -> &dyn TaskQueue {
        self.tasks.as_ref()
    }

    pub fn clients(&self) -> &dyn ClientFactory {
        self.clients.as_ref()
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }
}
