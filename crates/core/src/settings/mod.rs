//! The singleton settings record.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteSettingsStore;
pub use store::SettingsStore;
pub use types::{Settings, SettingsInput, SETTINGS_ID};
