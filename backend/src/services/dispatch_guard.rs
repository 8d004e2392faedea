//! In-process tracking of broadcasts currently being dispatched.
//!
//! A second dispatch of the same broadcast while the first is still running
//! is refused. Tracking is per process only; separate server instances do
//! not see each other's entries.

use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

use crate::api::BroadcastId;

/// Set of broadcast IDs with a dispatch in flight.
#[derive(Clone, Default)]
pub struct DispatchGuard {
    in_flight: Arc<RwLock<HashSet<BroadcastId>>>,
}

impl DispatchGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id` for dispatch.
    ///
    /// Returns `None` when a dispatch of `id` is already running. The claim
    /// is released when the returned permit is dropped.
    pub fn try_acquire(&self, id: BroadcastId) -> Option<DispatchPermit> {
        if !self.in_flight.write().insert(id) {
            return None;
        }
        Some(DispatchPermit {
            id,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn is_dispatching(&self, id: BroadcastId) -> bool {
        self.in_flight.read().contains(&id)
    }

    /// Number of dispatches currently running.
    pub fn active(&self) -> usize {
        self.in_flight.read().len()
    }
}

/// Exclusive claim on one broadcast, released on drop.
#[must_use = "the claim is released as soon as the permit is dropped"]
pub struct DispatchPermit {
    id: BroadcastId,
    in_flight: Arc<RwLock<HashSet<BroadcastId>>>,
}

impl DispatchPermit {
    pub fn broadcast_id(&self) -> BroadcastId {
        self.id
    }
}

impl Drop for DispatchPermit {
    fn drop(&mut self) {
        self.in_flight.write().remove(&self.id);
    }
}
