//! Shared progress counters.

use tokio::sync::Mutex;

/// Process-wide count of harvested posts.
///
/// Every mutation and every read goes through the one internal lock, so
/// increments from any number of workers never race and reads always see a
/// consistent snapshot. Lives for one harvest run; the supervisor creates a
/// fresh counter on restart.
///
/// Per-worker totals are deliberately NOT in here: each worker owns its own
/// plain integer, single-writer by construction.
#[derive(Debug, Default)]
pub struct GlobalCounter {
    total: Mutex<u64>,
}

impl GlobalCounter {
    /// Creates a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `n` to the total.
    pub async fn add(&self, n: u64) {
        let mut total = self.total.lock().await;
        *total += n;
    }

    /// Reads the current total.
    pub async fn get(&self) -> u64 {
        *self.total.lock().await
    }
}
