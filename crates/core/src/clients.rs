//! Building external service clients from the stored settings.
//!
//! Clients are built per use from the current settings record, so an update
//! to the settings takes effect on the next request without a restart.

use std::sync::Arc;

use crate::media::{CatalogError, MediaCatalog, TmdbClient, TmdbConfig};
use crate::searcher::{JackettConfig, JackettSearcher, SearchError, Searcher};
use crate::settings::Settings;
use crate::torrent_client::{
    TorrentClient, TorrentClientError, TransmissionClient, TransmissionConfig,
};

/// Creates the external clients for a given settings record.
pub trait ClientFactory: Send + Sync {
    fn catalog(&self, settings: &Settings) -> Result<Arc<dyn MediaCatalog>, CatalogError>;

    fn searcher(&self, settings: &Settings) -> Result<Arc<dyn Searcher>, SearchError>;

    fn torrent_client(
        &self,
        settings: &Settings,
    ) -> Result<Arc<dyn TorrentClient>, TorrentClientError>;
}

/// Builds TMDB, Jackett and Transmission clients.
#[derive(Debug, Clone, Default)]
pub struct SettingsClientFactory;

impl ClientFactory for SettingsClientFactory {
    fn catalog(&self, settings: &Settings) -> Result<Arc<dyn MediaCatalog>, CatalogError> {
        let client = TmdbClient::new(TmdbConfig::new(&settings.tmdb_token))?;
        Ok(Arc::new(client))
    }

    fn searcher(&self, settings: &Settings) -> Result<Arc<dyn Searcher>, SearchError> {
        let config = JackettConfig::new(settings.jackett_url(), &settings.jackett_token);
        Ok(Arc::new(JackettSearcher::new(config)?))
    }

    fn torrent_client(
        &self,
        settings: &Settings,
    ) -> Result<Arc<dyn TorrentClient>, TorrentClientError> {
        let config = TransmissionConfig::new(settings.transmission_url()).with_credentials(
            &settings.transmission_user,
            &settings.transmission_pass,
        );
        Ok(Arc::new(TransmissionClient::new(config)?))
    }
}
