//! Orchestration and whole-run restart supervision.

use std::sync::Arc;

use futures::future::join_all;
use magpie_client::{SessionFactory, SessionStore};
use magpie_store::{CsvStore, OutputFormat, merge, write_json};
use magpie_types::{HarvestError, Result, partition};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{BatchWriter, GlobalCounter, HarvestConfig, HarvestWorker};

/// Summary of a completed harvest.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique id of this harvest.
    pub id: Uuid,
    /// How many times the harvest restarted before completing.
    pub restarts: u32,
    /// Posts harvested per worker, in worker order.
    pub worker_totals: Vec<u64>,
    /// Posts harvested across all workers.
    pub total_posts: u64,
    /// Rows in the finalized output after the post-process merge.
    pub finalized_rows: usize,
}

/// Runs the whole harvest, restarting it from scratch on a fatal condition.
///
/// One run launches every worker concurrently against disjoint assignments
/// sharing a single counter and a single writer, awaits them all, performs
/// a final flush and writes the finalized output. When any worker surfaces
/// a resource-gone failure the supervisor never isolates that worker: it
/// waits a fixed delay and re-runs the whole harvest with the original
/// configuration. Only the persisted sessions survive the teardown, so a
/// restart costs at most re-authentication of whatever expired.
#[derive(Clone)]
pub struct Supervisor {
    config: HarvestConfig,
    factory: Arc<dyn SessionFactory>,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Creates a supervisor for the given configuration and client seam.
    #[must_use]
    pub fn new(config: HarvestConfig, factory: Arc<dyn SessionFactory>) -> Self {
        Self { config, factory }
    }

    /// Runs the harvest until it completes or fails terminally.
    ///
    /// # Errors
    ///
    /// Returns the terminal error: anything non-restartable, or a
    /// restartable error once `max_restarts` is spent.
    pub async fn run(&self) -> Result<RunReport> {
        self.config.validate()?;

        let id = Uuid::new_v4();
        let mut restarts = 0u32;
        loop {
            match self.run_once(id, restarts).await {
                Ok(report) => return Ok(report),
                Err(err) if err.is_restartable() => {
                    if self
                        .config
                        .max_restarts
                        .is_some_and(|budget| restarts >= budget)
                    {
                        error!("harvest {id}: restart budget spent, giving up: {err}");
                        return Err(err);
                    }
                    restarts += 1;
                    warn!(
                        "harvest {id}: fatal condition ({err}), restarting everything in {}s (restart {restarts})",
                        self.config.restart_delay.as_secs()
                    );
                    tokio::time::sleep(self.config.restart_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One full harvest lifetime: fresh store, fresh counters, all workers.
    async fn run_once(&self, id: Uuid, restarts: u32) -> Result<RunReport> {
        let config = &self.config;
        let workers = config.accounts.len();
        let assignments = partition(&config.range, workers);

        let writer = Arc::new(
            BatchWriter::create(CsvStore::new(&config.raw_output), &config.writer).await?,
        );
        let global = Arc::new(GlobalCounter::new());
        let sessions = match &config.session_dir {
            Some(dir) => SessionStore::new(dir.clone()),
            None => SessionStore::with_default_path(),
        }
        .map_err(|e| HarvestError::Internal(e.to_string()))?;

        info!(
            "harvest {id}: launching {workers} workers over {} days ({})",
            config.range.total_days(),
            config.range
        );

        let mut handles = Vec::with_capacity(workers);
        for (assignment, credentials) in assignments.into_iter().zip(&config.accounts) {
            let worker_id = assignment.worker;
            let worker = HarvestWorker::new(
                worker_id,
                credentials.clone(),
                assignment,
                self.factory.create(worker_id, credentials),
                sessions.clone(),
                config.worker.clone(),
                config.retry.clone(),
                Arc::clone(&global),
                Arc::clone(&writer),
            );
            handles.push(tokio::spawn(worker.run()));
        }

        let mut worker_totals = Vec::with_capacity(workers);
        let mut fatal: Option<HarvestError> = None;
        for (index, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok(Ok(total)) => worker_totals.push(total),
                Ok(Err(err)) => {
                    error!("harvest {id}: worker-{} failed: {err}", index + 1);
                    let supersedes = match &fatal {
                        None => true,
                        // A restartable failure outranks everything else.
                        Some(existing) => err.is_restartable() && !existing.is_restartable(),
                    };
                    if supersedes {
                        fatal = Some(err);
                    }
                }
                Err(join_err) => {
                    error!("harvest {id}: worker-{} task died: {join_err}", index + 1);
                    if fatal.is_none() {
                        fatal = Some(HarvestError::Internal(format!(
                            "worker task died: {join_err}"
                        )));
                    }
                }
            }
        }
        if let Some(err) = fatal {
            return Err(err);
        }

        // Catches any straggler batch below the flush threshold.
        writer.flush().await?;

        for (index, total) in worker_totals.iter().enumerate() {
            info!("harvest {id}: worker-{}: {total} posts", index + 1);
        }
        let total_posts = global.get().await;
        info!("harvest {id}: all workers finished, {total_posts} posts harvested");

        let finalized_rows = self.finalize().await?;

        Ok(RunReport {
            id,
            restarts,
            worker_totals,
            total_posts,
            finalized_rows,
        })
    }

    /// Re-applies the dedup/sort invariant and writes the finalized output.
    async fn finalize(&self) -> Result<usize> {
        let config = &self.config;
        info!("post-process: merging, sorting and deduplicating");

        let rows = CsvStore::new(&config.raw_output).read_all().await?;
        let merged = merge(rows, Vec::new());

        match config.final_format {
            OutputFormat::Csv => {
                CsvStore::new(&config.final_output)
                    .write_all(&merged)
                    .await?;
            }
            OutputFormat::Json => write_json(&config.final_output, &merged).await?,
        }

        info!(
            "post-process: {} rows finalized to {}",
            merged.len(),
            config.final_output.display()
        );
        Ok(merged.len())
    }
}
