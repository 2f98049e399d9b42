//! In-memory [`ContentLoader`] that records every call.
//!
//! Used by the CLI simulation and by tests. Handles are numbered in load
//! order; loads and unloads can be made to fail per content reference.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tilestream_common::ContentRef;

use crate::loader::{ContentLoader, LoaderError};

/// Handle to one piece of content resident in a [`MemoryLoader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryHandle(pub u64);

/// A call made against a [`MemoryLoader`], in the order it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderCall {
    Load {
        reference: ContentRef,
        activate: bool,
    },
    Unload(MemoryHandle),
}

#[derive(Debug, Default)]
struct MemoryState {
    next_handle: u64,
    live: BTreeMap<MemoryHandle, ContentRef>,
    calls: Vec<LoaderCall>,
    failing_loads: HashSet<ContentRef>,
    failing_unloads: HashSet<ContentRef>,
}

/// Cloning shares the underlying state, so a test can keep a clone to
/// inspect what the streamer did.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    state: Arc<Mutex<MemoryState>>,
    latency: Duration,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every load and unload waits `latency` before completing.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn fail_loads_of(&self, reference: ContentRef) {
        self.state.lock().failing_loads.insert(reference);
    }

    pub fn fail_unloads_of(&self, reference: ContentRef) {
        self.state.lock().failing_unloads.insert(reference);
    }

    pub fn calls(&self) -> Vec<LoaderCall> {
        self.state.lock().calls.clone()
    }

    /// References passed to `load`, in call order.
    pub fn loads(&self) -> Vec<ContentRef> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                LoaderCall::Load { reference, .. } => Some(reference.clone()),
                LoaderCall::Unload(_) => None,
            })
            .collect()
    }

    pub fn unload_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| matches!(call, LoaderCall::Unload(_)))
            .count()
    }

    /// Number of handles handed out and not yet successfully unloaded.
    pub fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }

    pub fn reference_of(&self, handle: MemoryHandle) -> Option<ContentRef> {
        self.state.lock().live.get(&handle).cloned()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl ContentLoader for MemoryLoader {
    type Handle = MemoryHandle;

    async fn load(
        &self,
        reference: &ContentRef,
        activate: bool,
    ) -> Result<MemoryHandle, LoaderError> {
        self.state.lock().calls.push(LoaderCall::Load {
            reference: reference.clone(),
            activate,
        });
        self.simulate_latency().await;

        let mut state = self.state.lock();
        if state.failing_loads.contains(reference) {
            return Err(LoaderError::NotFound(reference.clone()));
        }
        state.next_handle += 1;
        let handle = MemoryHandle(state.next_handle);
        state.live.insert(handle, reference.clone());
        Ok(handle)
    }

    async fn unload(&self, handle: MemoryHandle) -> Result<(), LoaderError> {
        self.state.lock().calls.push(LoaderCall::Unload(handle));
        self.simulate_latency().await;

        let mut state = self.state.lock();
        let Some(reference) = state.live.get(&handle).cloned() else {
            return Err(LoaderError::StaleHandle(format!("{handle:?}")));
        };
        if state.failing_unloads.contains(&reference) {
            return Err(LoaderError::Backend(format!("teardown of {reference} failed")));
        }
        state.live.remove(&handle);
        Ok(())
    }
}
