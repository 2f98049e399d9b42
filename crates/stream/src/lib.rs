//! Streaming: tile residency around a moving observer.
//!
//! Positions map to tiles on a fixed-size grid. Whenever the observer
//! changes tile, a pass diffs the square neighborhood it should see against
//! what is resident, unloads stale tiles, then loads new ones through a
//! [`ContentLoader`], pacing each operation.
//!
//! # Invariants
//! - A coordinate is resident at most once; every handle is unloaded once.
//! - Tiles outside the authored grid clamp to its edge content.
//! - One pass at a time; changes seen mid-pass are deferred, not dropped.

mod authored;
mod error;
mod grid;
mod loader;
mod memory;
mod plan;
mod registry;
mod scheduler;
mod stats;

pub use authored::{AuthoredGrid, naming_table};
pub use error::StreamError;
pub use grid::{GridCell, clamp_to_grid, tile_at};
pub use loader::{ContentLoader, LoaderError};
pub use memory::{LoaderCall, MemoryHandle, MemoryLoader};
pub use plan::{ResidencyDiff, desired_set, diff};
pub use registry::ResidencyRegistry;
pub use scheduler::{RunState, Schedule, TileStreamer};
pub use stats::{PassStats, PassTimer, TeardownReport};

pub use tilestream_common::{ContentRef, StreamConfig, TileCoord};
