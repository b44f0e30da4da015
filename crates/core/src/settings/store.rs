use chrono::{DateTime, Utc};

use super::{Settings, SettingsInput};
use crate::db::StoreError;

/// Persistence for the singleton settings record.
pub trait SettingsStore: Send + Sync {
    /// The settings record, if one has been created.
    fn get(&self) -> Result<Option<Settings>, StoreError>;

    /// Create the record. Fails with `Conflict` when it already exists.
    fn create(&self, input: SettingsInput) -> Result<Settings, StoreError>;

    /// Replace every editable field of the record with `id`.
    fn update(&self, id: i64, input: SettingsInput) -> Result<Settings, StoreError>;

    /// Store a freshly fetched TMDB configuration.
    fn set_tmdb_configuration(
        &self,
        configuration: serde_json::Value,
        fetched_at: DateTime<Utc>,
    ) -> Result<Settings, StoreError>;

    /// The record with `id`, which only resolves for the singleton id.
    fn get_by_id(&self, id: i64) -> Result<Option<Settings>, StoreError> {
        Ok(self.get()?.filter(|s| s.id == id))
    }
}
