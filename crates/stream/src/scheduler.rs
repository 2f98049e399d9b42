//! The tile streamer: coordinate-change detection and paced load/unload passes.
//!
//! Sampling and scheduling are split the way a frame loop splits update and
//! late-update: [`TileStreamer::sample`] records the observer's tile and
//! flags a change, [`TileStreamer::schedule`] starts a pass when a change is
//! pending and no pass is running. A pass runs on its own task; its result
//! is picked up by the next `schedule` call or by [`TileStreamer::finish_pass`].
//!
//! # Invariants
//! - At most one pass (or teardown) runs at a time.
//! - [`RunState`] is busy from the moment a pass is started until its task
//!   is reaped, the same window [`TileStreamer::is_busy`] reports.
//! - Within a pass every unload completes before the first load starts.
//! - Only the pass and teardown mutate the registry.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::FutureExt;
use glam::Vec3;
use parking_lot::Mutex;
use tilestream_common::{ContentRef, StreamConfig, TileCoord};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::authored::AuthoredGrid;
use crate::error::StreamError;
use crate::grid::tile_at;
use crate::loader::ContentLoader;
use crate::plan::{ResidencyDiff, desired_set, diff};
use crate::registry::ResidencyRegistry;
use crate::stats::{PassStats, PassTimer, TeardownReport};

/// Number of pass durations kept for [`TileStreamer::pass_timer`].
const PASS_HISTORY: usize = 32;

/// What the streamer is doing right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Idle,
    Unloading,
    Loading,
}

impl RunState {
    pub fn is_busy(self) -> bool {
        self != RunState::Idle
    }
}

/// Result of one scheduling opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// The observer has not changed tile since the last pass started.
    Unchanged,
    /// A change is pending but there is no observer position.
    NoObserver,
    /// A change is pending and a pass is still running.
    Deferred,
    /// A pass was started around this tile.
    Started(TileCoord),
}

struct Shared<L: ContentLoader> {
    loader: L,
    grid: AuthoredGrid,
    config: StreamConfig,
    registry: Mutex<ResidencyRegistry<L::Handle>>,
    state: watch::Sender<RunState>,
}

impl<L: ContentLoader> Shared<L> {
    fn resident(&self) -> BTreeSet<TileCoord> {
        self.registry.lock().keys()
    }

    fn is_resident(&self, coord: TileCoord) -> bool {
        self.registry.lock().contains(coord)
    }

    fn take(&self, coord: TileCoord) -> Option<L::Handle> {
        self.registry.lock().remove(coord)
    }

    fn insert(&self, coord: TileCoord, handle: L::Handle) {
        if self.registry.lock().put(coord, handle).is_some() {
            tracing::warn!(%coord, "tile was already resident; previous handle dropped");
        }
    }

    fn count(&self) -> usize {
        self.registry.lock().count()
    }
}

/// Publishes a phase on creation and `Idle` when dropped.
struct PhaseGuard<'a> {
    state: &'a watch::Sender<RunState>,
}

impl<'a> PhaseGuard<'a> {
    fn enter(state: &'a watch::Sender<RunState>, phase: RunState) -> Self {
        state.send_replace(phase);
        Self { state }
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.state.send_replace(RunState::Idle);
    }
}

/// Keeps the tiles around an observer resident.
///
/// Call [`shutdown`](Self::shutdown) before dropping a streamer. Dropping it
/// detaches any running pass and leaves every resident handle live in the
/// loader.
pub struct TileStreamer<L: ContentLoader> {
    shared: Arc<Shared<L>>,
    last_seen: Option<TileCoord>,
    observer_present: bool,
    pending: bool,
    pass: Option<JoinHandle<Result<PassStats, StreamError>>>,
    last_stats: Option<PassStats>,
    completed: u64,
    timer: PassTimer,
}

impl<L: ContentLoader> TileStreamer<L> {
    /// Create a streamer over `references`, the row-major authored table.
    ///
    /// Nothing is loaded until the first position is sampled.
    pub fn new(
        loader: L,
        config: StreamConfig,
        references: Vec<ContentRef>,
    ) -> Result<Self, StreamError> {
        config.validate()?;
        let grid = AuthoredGrid::new(config.grid_dimension, references);
        if grid.len() > config.authored_len() {
            tracing::warn!(
                entries = grid.len(),
                addressable = config.authored_len(),
                "authored table has entries no tile can address"
            );
        }
        let (state, _) = watch::channel(RunState::Idle);
        Ok(Self {
            shared: Arc::new(Shared {
                loader,
                grid,
                config,
                registry: Mutex::new(ResidencyRegistry::new()),
                state,
            }),
            last_seen: None,
            observer_present: false,
            pending: false,
            pass: None,
            last_stats: None,
            completed: 0,
            timer: PassTimer::new(PASS_HISTORY),
        })
    }

    /// Record the observer's position for this tick. `None` means there is
    /// no observer; pending work waits until one reappears.
    pub fn sample(&mut self, position: Option<Vec3>) {
        self.observer_present = position.is_some();
        let Some(position) = position else {
            return;
        };
        let tile = tile_at(position, self.shared.config.tile_size);
        if self.last_seen != Some(tile) {
            tracing::debug!(%tile, "observer entered tile");
            self.last_seen = Some(tile);
            self.pending = true;
        }
    }

    /// Start a pass if a tile change is pending and no pass is running.
    ///
    /// A load failure from a pass that finished since the last call is
    /// returned here; the pending change, if any, starts on the next call.
    pub fn schedule(&mut self) -> Result<Schedule, StreamError> {
        self.reap()?;
        if !self.pending {
            return Ok(Schedule::Unchanged);
        }
        if self.pass.is_some() {
            return Ok(Schedule::Deferred);
        }
        let Some(center) = self.last_seen.filter(|_| self.observer_present) else {
            return Ok(Schedule::NoObserver);
        };

        let runtime = tokio::runtime::Handle::try_current()?;
        self.pending = false;

        // No pass is running, so the registry is stable while planning.
        let work = self.plan(center);
        let phase = if work.to_unload.is_empty() {
            RunState::Loading
        } else {
            RunState::Unloading
        };
        self.shared.state.send_replace(phase);

        let shared = Arc::clone(&self.shared);
        let span = tracing::info_span!("stream_pass", x = center.x, z = center.z);
        self.pass = Some(runtime.spawn(run_pass(shared, center, work).instrument(span)));
        Ok(Schedule::Started(center))
    }

    /// [`sample`](Self::sample) then [`schedule`](Self::schedule).
    pub fn tick(&mut self, position: Option<Vec3>) -> Result<Schedule, StreamError> {
        self.sample(position);
        self.schedule()
    }

    /// Wait for the running pass, if any, and return its result.
    pub async fn finish_pass(&mut self) -> Option<Result<PassStats, StreamError>> {
        let handle = self.pass.take()?;
        let joined = handle.await;
        Some(self.settle(joined))
    }

    /// Unload every resident tile regardless of where the observer is.
    ///
    /// A running pass is allowed to finish first so its loads are drained
    /// too. Afterwards the next sampled position counts as a fresh start.
    pub async fn shutdown(&mut self) -> TeardownReport {
        if let Some(Err(err)) = self.finish_pass().await {
            tracing::error!(error = %err, "stream pass failed before teardown");
        }
        self.last_seen = None;
        self.pending = false;
        drain(&self.shared)
            .instrument(tracing::info_span!("stream_teardown"))
            .await
    }

    pub fn state(&self) -> RunState {
        *self.shared.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<RunState> {
        self.shared.state.subscribe()
    }

    /// Whether a pass task is outstanding (running or finished but not reaped).
    pub fn is_busy(&self) -> bool {
        self.pass.is_some()
    }

    pub fn has_pending_change(&self) -> bool {
        self.pending
    }

    pub fn current_tile(&self) -> Option<TileCoord> {
        self.last_seen
    }

    /// Resident tiles in coordinate order.
    pub fn resident_tiles(&self) -> Vec<TileCoord> {
        self.shared.resident().into_iter().collect()
    }

    pub fn resident_count(&self) -> usize {
        self.shared.count()
    }

    pub fn is_resident(&self, coord: TileCoord) -> bool {
        self.shared.is_resident(coord)
    }

    pub fn config(&self) -> &StreamConfig {
        &self.shared.config
    }

    pub fn grid(&self) -> &AuthoredGrid {
        &self.shared.grid
    }

    /// Statistics from the last pass that completed successfully.
    pub fn last_stats(&self) -> Option<&PassStats> {
        self.last_stats.as_ref()
    }

    /// Passes that ran to completion without a load failure.
    pub fn completed_passes(&self) -> u64 {
        self.completed
    }

    pub fn pass_timer(&self) -> &PassTimer {
        &self.timer
    }

    fn reap(&mut self) -> Result<(), StreamError> {
        let Some(mut handle) = self.pass.take_if(|handle| handle.is_finished()) else {
            return Ok(());
        };
        match (&mut handle).now_or_never() {
            Some(joined) => {
                self.settle(joined)?;
                Ok(())
            }
            None => {
                self.pass = Some(handle);
                Ok(())
            }
        }
    }

    fn plan(&self, center: TileCoord) -> ResidencyDiff {
        let grid = &self.shared.grid;
        if grid.is_empty() {
            tracing::debug!(%center, "no authored content; pass has no work");
            return ResidencyDiff::default();
        }
        let desired = desired_set(center, self.shared.config.load_radius);
        diff(&desired, &self.shared.resident(), grid)
    }

    /// Take the result of a finished pass task and return to `Idle`.
    fn settle(
        &mut self,
        joined: Result<Result<PassStats, StreamError>, tokio::task::JoinError>,
    ) -> Result<PassStats, StreamError> {
        self.shared.state.send_replace(RunState::Idle);
        let stats = joined??;
        self.completed += 1;
        self.timer.record(stats.elapsed);
        self.last_stats = Some(stats.clone());
        Ok(stats)
    }
}

/// Execute the unload-then-load work planned around `center`.
///
/// The streamer publishes the first phase before spawning this and `Idle`
/// once the task is reaped; the pass only moves from unloading to loading.
async fn run_pass<L: ContentLoader>(
    shared: Arc<Shared<L>>,
    center: TileCoord,
    work: ResidencyDiff,
) -> Result<PassStats, StreamError> {
    let started = tokio::time::Instant::now();
    let mut stats = PassStats {
        center,
        skipped_out_of_range: work.out_of_range,
        ..PassStats::default()
    };
    let pacing = shared.config.pacing_interval();

    if !work.to_unload.is_empty() {
        tracing::info!(count = work.to_unload.len(), "unloading tiles");
        for coord in work.to_unload {
            let Some(handle) = shared.take(coord) else {
                continue;
            };
            tracing::debug!(%coord, "unloading tile");
            match shared.loader.unload(handle).await {
                Ok(()) => stats.tiles_unloaded += 1,
                Err(err) => {
                    stats.failed_unloads += 1;
                    tracing::error!(%coord, error = %err, "tile unload failed");
                }
            }
            tokio::time::sleep(pacing).await;
        }
    }

    shared.state.send_replace(RunState::Loading);
    for coord in work.to_load {
        if shared.is_resident(coord) {
            stats.skipped_resident += 1;
            continue;
        }
        let Some(reference) = shared.grid.reference_for(coord) else {
            stats.skipped_out_of_range += 1;
            continue;
        };
        tracing::debug!(%coord, %reference, "loading tile");
        let handle = match shared.loader.load(reference, true).await {
            Ok(handle) => handle,
            Err(source) => {
                tracing::error!(%coord, %reference, error = %source, "tile load failed");
                return Err(StreamError::Load {
                    coord,
                    reference: reference.clone(),
                    source,
                });
            }
        };
        shared.insert(coord, handle);
        stats.tiles_loaded += 1;
        tokio::time::sleep(pacing).await;
    }

    stats.total_resident = shared.count();
    stats.elapsed = started.elapsed();
    tracing::info!(
        loaded = stats.tiles_loaded,
        unloaded = stats.tiles_unloaded,
        failed_unloads = stats.failed_unloads,
        skipped = stats.skipped_out_of_range,
        total = stats.total_resident,
        "stream pass complete"
    );
    Ok(stats)
}

async fn drain<L: ContentLoader>(shared: &Shared<L>) -> TeardownReport {
    let _phase = PhaseGuard::enter(&shared.state, RunState::Unloading);
    let tiles = shared.registry.lock().clear();
    let mut report = TeardownReport::default();
    if tiles.is_empty() {
        return report;
    }

    tracing::info!(count = tiles.len(), "unloading all tiles");
    for (coord, handle) in tiles {
        match shared.loader.unload(handle).await {
            Ok(()) => report.unloaded += 1,
            Err(err) => {
                report.failed += 1;
                tracing::error!(%coord, error = %err, "tile unload failed during teardown");
            }
        }
    }
    tracing::info!(
        unloaded = report.unloaded,
        failed = report.failed,
        "teardown complete"
    );
    report
}
