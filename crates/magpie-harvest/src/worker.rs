//! Per-account harvest worker.

use std::sync::Arc;

use magpie_client::{Identity, SearchPage, SearchQuery, SearchSession, SessionStore};
use magpie_types::{AssignedDay, Credentials, HarvestError, Result, WorkAssignment};
use tracing::{info, warn};

use crate::{BatchWriter, GlobalCounter, RetryContext, RetryPolicy, WorkerConfig};

/// Harvests one account's share of the day range.
///
/// Lifecycle: establish a session (preferring the one persisted by an
/// earlier run), then walk the assigned days in order - page through the
/// day's search results, keep what falls inside the window, submit the
/// day's buffer to the shared writer - and finally drain the writer so the
/// last partial batch is not stranded below the flush threshold.
///
/// The session handle and the running total are owned exclusively by this
/// worker; the only shared resources it touches are the global counter and
/// the batch writer.
pub struct HarvestWorker {
    id: usize,
    credentials: Credentials,
    assignment: WorkAssignment,
    session: Box<dyn SearchSession>,
    sessions: SessionStore,
    config: WorkerConfig,
    retry: RetryPolicy,
    global: Arc<GlobalCounter>,
    writer: Arc<BatchWriter>,
    total: u64,
}

impl std::fmt::Debug for HarvestWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarvestWorker")
            .field("id", &self.id)
            .field("username", &self.credentials.username)
            .field("days", &self.assignment.len())
            .field("total", &self.total)
            .finish_non_exhaustive()
    }
}

impl HarvestWorker {
    /// Creates a worker for one account and its assignment.
    #[expect(clippy::too_many_arguments, reason = "construction-only wiring")]
    #[must_use]
    pub fn new(
        id: usize,
        credentials: Credentials,
        assignment: WorkAssignment,
        session: Box<dyn SearchSession>,
        sessions: SessionStore,
        config: WorkerConfig,
        retry: RetryPolicy,
        global: Arc<GlobalCounter>,
        writer: Arc<BatchWriter>,
    ) -> Self {
        Self {
            id,
            credentials,
            assignment,
            session,
            sessions,
            config,
            retry,
            global,
            writer,
            total: 0,
        }
    }

    fn tag(&self) -> String {
        format!("worker-{}/{}", self.id + 1, self.credentials.username)
    }

    fn retry_context(&self) -> RetryContext {
        RetryContext::with_progress(self.tag(), Arc::clone(&self.global), self.total)
    }

    /// Runs the worker to completion, returning its harvested total.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Auth`] when no session can be established,
    /// and propagates fatal errors from the search boundary or the writer
    /// without swallowing them.
    pub async fn run(mut self) -> Result<u64> {
        let identity = self.establish_session().await?;
        info!("[{}] authenticated as {identity}", self.tag());

        let days = std::mem::take(&mut self.assignment.days);
        for day in &days {
            self.harvest_day(day).await?;
        }

        self.writer.flush().await?;
        info!(
            "[{}] finished {} days: {} posts (global total: {})",
            self.tag(),
            days.len(),
            self.total,
            self.global.get().await
        );
        Ok(self.total)
    }

    /// Ends with a confirmed authenticated identity or an `Auth` error.
    async fn establish_session(&self) -> Result<Identity> {
        match self.sessions.load(self.id) {
            Ok(Some(saved)) => match self.session.restore(&saved).await {
                Ok(identity) => {
                    info!("[{}] resumed stored session as {identity}", self.tag());
                    return Ok(identity);
                }
                Err(err) => warn!("[{}] stored session unusable: {err}", self.tag()),
            },
            Ok(None) => info!("[{}] no stored session, logging in", self.tag()),
            Err(err) => warn!("[{}] could not read stored session: {err}", self.tag()),
        }

        let ctx = self.retry_context();
        let session = &self.session;
        let credentials = &self.credentials;

        let fresh = self
            .retry
            .run(&ctx, || session.login(credentials))
            .await?
            .ok_or_else(|| {
                HarvestError::Auth(format!("login exhausted for {}", self.credentials.username))
            })?;
        if let Err(err) = self.sessions.save(self.id, &fresh) {
            warn!("[{}] could not persist session: {err}", self.tag());
        }

        let identity = self
            .retry
            .run(&ctx, || session.identity())
            .await?
            .ok_or_else(|| {
                HarvestError::Auth(format!(
                    "identity check exhausted for {}",
                    self.credentials.username
                ))
            })?;
        Ok(identity)
    }

    /// Pages through one day, submitting whatever the window filter keeps.
    async fn harvest_day(&mut self, day: &AssignedDay) -> Result<()> {
        let query = SearchQuery {
            text: self.config.query.clone(),
            window: day.window,
            page_size: self.config.page_size,
        };

        let mut page = {
            let ctx = self.retry_context();
            let session = &self.session;
            self.retry.run(&ctx, || session.search(&query, None)).await?
        };

        let mut collected = Vec::new();
        while let Some(SearchPage { posts, next }) = page.take() {
            for post in posts {
                if collected.len() >= self.config.day_cap {
                    break;
                }
                // Upstream search is over-inclusive around day boundaries;
                // keep only what actually falls inside the window.
                let Some(at) = post.posted_at.timestamp() else {
                    continue;
                };
                if !day.window.contains(at) {
                    continue;
                }

                collected.push(post);
                self.total += 1;
                self.global.add(1).await;
            }

            if collected.len() >= self.config.day_cap {
                break;
            }
            let Some(cursor) = next else {
                break;
            };

            let ctx = self.retry_context();
            let session = &self.session;
            page = self
                .retry
                .run(&ctx, || session.search(&query, Some(&cursor)))
                .await?;
        }

        let accepted = collected.len();
        if !collected.is_empty() {
            self.writer.submit(collected).await?;
        }
        info!(
            "[{}] {}: {accepted} posts (worker total: {}, global total: {})",
            self.tag(),
            day.window.date(),
            self.total,
            self.global.get().await
        );
        Ok(())
    }
}
