//! Torrent search abstraction.
//!
//! This module provides a `Searcher` trait for searching torrents, backed by
//! Jackett.

mod jackett;
mod types;

pub use jackett::{JackettConfig, JackettSearcher};
pub use types::*;
