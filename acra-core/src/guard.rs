//! Advisory lock around calendar mutations.
//!
//! Deleting a container while another call is still writing into it leaves the
//! store in a mess, so sync and delete both hold this lock for their whole run.

use tokio::sync::{Mutex, MutexGuard};

use crate::cancel::CancelToken;
use crate::error::{SyncError, SyncResult};

/// Held for the duration of one mutation; dropping it releases the lock.
pub type MutationPermit<'a> = MutexGuard<'a, ()>;

#[derive(Default)]
pub struct MutationGuard {
    lock: Mutex<()>,
}

impl MutationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the lock, giving up with `Cancelled` if `cancel` fires first.
    pub async fn acquire(&self, cancel: &CancelToken) -> SyncResult<MutationPermit<'_>> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SyncError::Cancelled),
            permit = self.lock.lock() => Ok(permit),
        }
    }

    pub fn is_held(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}
