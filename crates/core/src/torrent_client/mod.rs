//! Download daemon abstraction.
//!
//! This module provides a `TorrentClient` trait for managing torrents, backed
//! by Transmission's RPC interface.

mod transmission;
mod types;

pub use transmission::{TransmissionClient, TransmissionConfig};
pub use types::*;
