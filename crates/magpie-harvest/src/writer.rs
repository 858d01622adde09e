//! Batching writer serializing all access to the durable store.

use std::time::Duration;

use magpie_store::{CsvStore, merge};
use magpie_types::{Post, Result};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::info;

use crate::WriterConfig;

#[derive(Debug, Default)]
struct Pending {
    batch: Vec<Post>,
    last_flush: Option<Instant>,
    flushes: u64,
}

/// Accepts posts from all workers and flushes them to the durable store in
/// deduplicated, sorted batches.
///
/// One mutex guards the pending batch, the store rewrite AND the post-flush
/// cooldown: while a flush is cooling down the lock stays held, so every
/// producer trying to submit blocks until the cooldown ends. That pause is
/// the pipeline's one global backpressure point.
#[derive(Debug)]
pub struct BatchWriter {
    store: CsvStore,
    batch_size: usize,
    cooldown: Duration,
    pending: Mutex<Pending>,
}

impl BatchWriter {
    /// Creates the writer and initializes a fresh durable store.
    ///
    /// Any store left over from a previous run is wiped; a harvest always
    /// starts from an empty, header-only store.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store cannot be initialized.
    pub async fn create(store: CsvStore, config: &WriterConfig) -> Result<Self> {
        store.init().await?;
        Ok(Self {
            store,
            batch_size: config.batch_size,
            cooldown: config.cooldown,
            pending: Mutex::new(Pending::default()),
        })
    }

    /// The underlying durable store.
    #[must_use]
    pub const fn store(&self) -> &CsvStore {
        &self.store
    }

    /// Queues posts for the next flush, flushing if the batch threshold is
    /// reached.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a triggered flush fails.
    pub async fn submit(&self, posts: Vec<Post>) -> Result<()> {
        if posts.is_empty() {
            return Ok(());
        }

        let mut pending = self.pending.lock().await;
        pending.batch.extend(posts);
        if pending.batch.len() >= self.batch_size {
            self.flush_locked(&mut pending).await?;
        }
        Ok(())
    }

    /// Flushes whatever is pending, regardless of the batch threshold.
    ///
    /// No-op when nothing is pending.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store cannot be read or rewritten.
    pub async fn flush(&self) -> Result<()> {
        let mut pending = self.pending.lock().await;
        self.flush_locked(&mut pending).await
    }

    /// Number of flushes performed so far.
    pub async fn flush_count(&self) -> u64 {
        self.pending.lock().await.flushes
    }

    /// When the last flush completed, if any.
    pub async fn last_flush(&self) -> Option<Instant> {
        self.pending.lock().await.last_flush
    }

    async fn flush_locked(&self, pending: &mut Pending) -> Result<()> {
        if pending.batch.is_empty() {
            return Ok(());
        }

        let incoming = std::mem::take(&mut pending.batch);
        info!(
            "writer: flushing {} posts to {}",
            incoming.len(),
            self.store.path().display()
        );

        let existing = self.store.read_all().await?;
        let merged = merge(existing, incoming);
        self.store.write_all(&merged).await?;

        pending.last_flush = Some(Instant::now());
        pending.flushes += 1;

        info!(
            "writer: store holds {} rows, cooling down {}s (all workers pause)",
            merged.len(),
            self.cooldown.as_secs()
        );
        tokio::time::sleep(self.cooldown).await;
        Ok(())
    }
}
