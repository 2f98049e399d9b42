//! Shared types for the tilestream workspace: tile coordinates, content
//! references and the streaming configuration.

mod config;
mod types;

pub use config::{ConfigError, MAX_LOAD_RADIUS, StreamConfig};
pub use types::{ContentRef, TileCoord};
