//! Watch requests for movies, TV shows and episodes, plus the torrent blacklist.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteWatchStore;
pub use store::WatchStore;
pub use types::*;
