//! Escalating retry ladder shared by all network-bound operations.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use magpie_types::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::GlobalCounter;

/// One rung of the retry ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryStage {
    /// Attempts made in this stage.
    pub attempts: u32,
    /// Sleep before each of this stage's attempts (skipped for the very
    /// first attempt of the whole ladder).
    pub delay: Duration,
}

impl RetryStage {
    /// Creates a stage.
    #[must_use]
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

/// A fixed, escalating sequence of retry stages.
///
/// The policy is plain data, so ladders can be inspected and tested
/// without a network. The default ladder: 5 attempts spaced 20s, then one
/// after 60s, one after 300s, and finally up to 3 spaced 900s, 10 attempts
/// in total. The ladder never resets within one [`run`](Self::run) call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    stages: Vec<RetryStage>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(vec![
            RetryStage::new(5, Duration::from_secs(20)),
            RetryStage::new(1, Duration::from_secs(60)),
            RetryStage::new(1, Duration::from_secs(300)),
            RetryStage::new(3, Duration::from_secs(900)),
        ])
    }
}

impl RetryPolicy {
    /// Creates a policy from explicit stages.
    #[must_use]
    pub const fn new(stages: Vec<RetryStage>) -> Self {
        Self { stages }
    }

    /// The stages of the ladder, in order.
    #[must_use]
    pub fn stages(&self) -> &[RetryStage] {
        &self.stages
    }

    /// Total attempts before the ladder is exhausted.
    #[must_use]
    pub fn total_attempts(&self) -> u32 {
        self.stages.iter().map(|stage| stage.attempts).sum()
    }

    /// Total time slept when every attempt fails.
    #[must_use]
    pub fn total_delay(&self) -> Duration {
        let mut total = Duration::ZERO;
        for (index, stage) in self.stages.iter().enumerate() {
            let mut sleeps = stage.attempts;
            if index == 0 {
                // The very first attempt fires immediately.
                sleeps = sleeps.saturating_sub(1);
            }
            total += stage.delay * sleeps;
        }
        total
    }

    /// Runs `op` through the ladder.
    ///
    /// Returns `Ok(Some(value))` on the first success, `Ok(None)` once
    /// every attempt has failed (callers treat an exhausted day as empty
    /// and move on), or `Err` immediately when the failure is fatal -
    /// fatal errors abort the remaining ladder and surface to the
    /// supervisor.
    ///
    /// Rate-limit failures retry like any other, but are additionally
    /// logged with the caller's progress so throttling is visible in
    /// context.
    ///
    /// # Errors
    ///
    /// Propagates the first fatal error returned by `op`.
    pub async fn run<T, F, Fut>(&self, ctx: &RetryContext, mut op: F) -> Result<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let total = self.total_attempts();
        let mut attempt = 0u32;

        for stage in &self.stages {
            for _ in 0..stage.attempts {
                if attempt > 0 {
                    tokio::time::sleep(stage.delay).await;
                }
                attempt += 1;

                match op().await {
                    Ok(value) => return Ok(Some(value)),
                    Err(err) if err.is_fatal() => {
                        error!("[{}] fatal on attempt {attempt}: {err}", ctx.tag);
                        return Err(err);
                    }
                    Err(err) => {
                        if err.is_rate_limited() {
                            ctx.log_rate_limited().await;
                        }
                        warn!("[{}] attempt {attempt}/{total} failed: {err}", ctx.tag);
                    }
                }
            }
        }

        warn!("[{}] all {total} attempts failed, giving up", ctx.tag);
        Ok(None)
    }
}

/// Caller-supplied tags and progress handles for retry logging.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Tag identifying the caller in logs, e.g. `worker-2/bob`.
    pub tag: String,
    progress: Option<Progress>,
}

#[derive(Debug, Clone)]
struct Progress {
    global: Arc<GlobalCounter>,
    worker_total: u64,
}

impl RetryContext {
    /// Context with a tag only.
    #[must_use]
    pub const fn new(tag: String) -> Self {
        Self {
            tag,
            progress: None,
        }
    }

    /// Context that can log worker and global progress on rate limits.
    #[must_use]
    pub const fn with_progress(tag: String, global: Arc<GlobalCounter>, worker_total: u64) -> Self {
        Self {
            tag,
            progress: Some(Progress {
                global,
                worker_total,
            }),
        }
    }

    async fn log_rate_limited(&self) {
        match &self.progress {
            Some(progress) => {
                let global_total = progress.global.get().await;
                warn!(
                    "[{}] rate limited (worker total: {}, global total: {global_total})",
                    self.tag, progress.worker_total
                );
            }
            None => warn!("[{}] rate limited", self.tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ctx() -> RetryContext {
        RetryContext::new("test".to_string())
    }

    /// Returns an op that fails `failures` times with `err`, then succeeds
    /// with the attempt number, plus the shared call counter.
    fn failing_op(
        failures: u32,
        err: fn(String) -> HarvestError,
    ) -> (Arc<AtomicU32>, impl FnMut() -> std::future::Ready<Result<u32>>) {
        let calls = Arc::new(AtomicU32::new(0));
        let op_calls = Arc::clone(&calls);
        let op = move || {
            let n = op_calls.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(if n <= failures {
                Err(err(format!("failure {n}")))
            } else {
                Ok(n)
            })
        };
        (calls, op)
    }

    #[test]
    fn test_default_ladder_shape() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.total_attempts(), 10);
        assert_eq!(
            policy.total_delay(),
            Duration::from_secs(4 * 20 + 60 + 300 + 3 * 900)
        );
        assert_eq!(policy.stages().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_sleeps_nothing() {
        let before = tokio::time::Instant::now();
        let (calls, op) = failing_op(0, HarvestError::Transient);

        let result = RetryPolicy::default().run(&ctx(), op).await.unwrap();

        assert_eq!(result, Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_within_ladder() {
        let (calls, op) = failing_op(6, HarvestError::Transient);

        let result = RetryPolicy::default().run(&ctx(), op).await.unwrap();

        // Fails through the 20s and 60s stages, succeeds on attempt 7.
        assert_eq!(result, Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_after_ten_attempts() {
        let before = tokio::time::Instant::now();
        let (calls, op) = failing_op(u32::MAX, HarvestError::Transient);

        let result: Option<u32> = RetryPolicy::default().run(&ctx(), op).await.unwrap();

        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 10);
        assert_eq!(before.elapsed(), Duration::from_secs(3140));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_short_circuits_without_sleeping() {
        let before = tokio::time::Instant::now();
        let (calls, op) = failing_op(u32::MAX, HarvestError::ResourceGone);

        let result = RetryPolicy::default().run(&ctx(), op).await;

        assert!(matches!(result, Err(HarvestError::ResourceGone(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_is_retried_not_escalated() {
        let global = Arc::new(GlobalCounter::new());
        let ctx = RetryContext::with_progress("test".to_string(), global, 42);
        let (calls, op) = failing_op(2, HarvestError::RateLimited);

        let result = RetryPolicy::default().run(&ctx, op).await.unwrap();

        assert_eq!(result, Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_ladder_delay_schedule() {
        let policy = RetryPolicy::new(vec![
            RetryStage::new(2, Duration::from_secs(1)),
            RetryStage::new(1, Duration::from_secs(10)),
        ]);
        let before = tokio::time::Instant::now();
        let (calls, op) = failing_op(u32::MAX, HarvestError::Transient);

        let result: Option<u32> = policy.run(&ctx(), op).await.unwrap();

        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // One 1s sleep inside the first stage, then 10s before the last
        // attempt.
        assert_eq!(before.elapsed(), Duration::from_secs(11));
        assert_eq!(policy.total_delay(), Duration::from_secs(11));
    }
}
