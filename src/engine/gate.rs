use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Bounds how many engine processes may run at once.
///
/// Cloning shares the same permits.
#[derive(Clone, Debug)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl ConcurrencyGate {
    /// A limit of zero is raised to one; use no gate at all for "unbounded".
    pub fn new(max_concurrent: usize) -> Self {
        let limit = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a slot. The permit is released when dropped.
    /// Returns `None` only if the gate was closed.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;
        debug!(
            "🚦 [GATE] Acquired permit. {} of {} slots remaining",
            self.semaphore.available_permits(),
            self.limit
        );
        Some(permit)
    }

    pub fn close(&self) {
        self.semaphore.close();
    }
}
