pub mod state;

pub use state::{CycleOutcome, Slot, SyncError, SyncState, SyncStatus};

use chrono::Utc;
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};
use tokio::sync::watch;
use tracing::debug;

/// Holds the last-known-good snapshot for every data kind plus the current sync error.
///
/// A commit applies a whole poll cycle under one write lock, so readers see
/// either all of a cycle's updates or none of them. Readers get a cheap clone
/// and never wait on I/O.
pub struct SyncStore {
    state: RwLock<SyncState>,
    revision_tx: watch::Sender<u64>,
}

impl SyncStore {
    pub fn new() -> Self {
        let (revision_tx, _) = watch::channel(0);
        Self {
            state: RwLock::new(SyncState::default()),
            revision_tx,
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, SyncState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SyncState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Notifies with the new revision after every applied commit.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision_tx.subscribe()
    }

    /// Applies `outcome` if `is_current` still holds once the write lock is taken.
    /// Returns whether the outcome was applied.
    pub fn commit(&self, outcome: CycleOutcome, is_current: impl FnOnce() -> bool) -> bool {
        let mut state = self.write();
        if !is_current() {
            debug!("Discarding result of a cancelled poll cycle");
            return false;
        }
        state.apply(outcome, Utc::now());
        let revision = state.revision;
        drop(state);

        debug!(revision, "Committed poll cycle");
        self.revision_tx.send_replace(revision);
        true
    }

    /// Runs `f` while no commit can be in progress.
    pub fn fence<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.write();
        f()
    }
}

impl Default for SyncStore {
    fn default() -> Self {
        Self::new()
    }
}
