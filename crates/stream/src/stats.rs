use std::time::Duration;

use tilestream_common::TileCoord;

/// Per-pass streaming statistics for instrumentation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Tile the pass was planned around.
    pub center: TileCoord,
    pub tiles_loaded: usize,
    pub tiles_unloaded: usize,
    /// Unloads the loader rejected. The tiles still left the registry.
    pub failed_unloads: usize,
    /// Desired tiles with no authored content.
    pub skipped_out_of_range: usize,
    /// Load candidates that were already resident when their turn came.
    pub skipped_resident: usize,
    /// Registry size when the pass finished.
    pub total_resident: usize,
    pub elapsed: Duration,
}

/// Outcome of draining every resident tile on shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub unloaded: usize,
    pub failed: usize,
}

impl TeardownReport {
    pub fn total(&self) -> usize {
        self.unloaded + self.failed
    }
}

/// Rolling history of pass durations.
#[derive(Debug)]
pub struct PassTimer {
    history: Vec<Duration>,
    capacity: usize,
    index: usize,
    filled: bool,
}

impl PassTimer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: vec![Duration::ZERO; capacity],
            capacity,
            index: 0,
            filled: false,
        }
    }

    pub fn record(&mut self, dt: Duration) {
        self.history[self.index] = dt;
        self.index = (self.index + 1) % self.capacity;
        if self.index == 0 {
            self.filled = true;
        }
    }

    fn recorded(&self) -> &[Duration] {
        &self.history[..self.count()]
    }

    pub fn average(&self) -> Duration {
        let recorded = self.recorded();
        if recorded.is_empty() {
            return Duration::ZERO;
        }
        recorded.iter().sum::<Duration>() / recorded.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.recorded().iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.recorded().iter().copied().min().unwrap_or(Duration::ZERO)
    }

    pub fn count(&self) -> usize {
        if self.filled {
            self.capacity
        } else {
            self.index
        }
    }
}
