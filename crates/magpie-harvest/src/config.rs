//! Harvest run configuration.

use std::path::PathBuf;
use std::time::Duration;

use magpie_store::OutputFormat;
use magpie_types::{Credentials, DateRange, HarvestError, Result};
use serde::{Deserialize, Serialize};

use crate::RetryPolicy;

/// Per-worker search settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Free-text query each day window is scoped to.
    pub query: String,
    /// Results requested per page.
    pub page_size: usize,
    /// Maximum posts accepted per day.
    pub day_cap: usize,
}

impl WorkerConfig {
    /// Default results per page.
    pub const DEFAULT_PAGE_SIZE: usize = 20;
    /// Default per-day record cap.
    pub const DEFAULT_DAY_CAP: usize = 24;

    /// Creates a worker config for a query with default paging limits.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page_size: Self::DEFAULT_PAGE_SIZE,
            day_cap: Self::DEFAULT_DAY_CAP,
        }
    }
}

/// Batching writer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Pending records that trigger a flush.
    pub batch_size: usize,
    /// Pause after every flush, during which all producers block.
    pub cooldown: Duration,
}

impl WriterConfig {
    /// Default flush threshold.
    pub const DEFAULT_BATCH_SIZE: usize = 500;
    /// Default post-flush cooldown.
    pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            batch_size: Self::DEFAULT_BATCH_SIZE,
            cooldown: Self::DEFAULT_COOLDOWN,
        }
    }
}

/// Complete configuration of one supervised harvest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// The inclusive day range to harvest.
    pub range: DateRange,
    /// One account per worker; worker count = account count.
    pub accounts: Vec<Credentials>,
    /// Search settings shared by all workers.
    pub worker: WorkerConfig,
    /// Batching writer settings.
    pub writer: WriterConfig,
    /// Retry ladder shared by all workers.
    pub retry: RetryPolicy,
    /// Path of the raw durable store (wiped at the start of every run).
    pub raw_output: PathBuf,
    /// Path of the finalized output (written once at the end).
    pub final_output: PathBuf,
    /// Format of the finalized output.
    pub final_format: OutputFormat,
    /// Session storage directory; `None` uses the platform default.
    pub session_dir: Option<PathBuf>,
    /// Pause before restarting after a fatal condition.
    pub restart_delay: Duration,
    /// Restart budget; `None` restarts unconditionally.
    pub max_restarts: Option<u32>,
}

impl HarvestConfig {
    /// Default pause before a restart.
    pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(5);

    /// Creates a config with default limits, ladder and output paths.
    #[must_use]
    pub fn new(query: impl Into<String>, range: DateRange, accounts: Vec<Credentials>) -> Self {
        Self {
            range,
            accounts,
            worker: WorkerConfig::new(query),
            writer: WriterConfig::default(),
            retry: RetryPolicy::default(),
            raw_output: PathBuf::from("posts_raw.csv"),
            final_output: PathBuf::from("posts.csv"),
            final_format: OutputFormat::Csv,
            session_dir: None,
            restart_delay: Self::DEFAULT_RESTART_DELAY,
            max_restarts: None,
        }
    }

    /// Checks the configuration for values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Config`] naming the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.accounts.is_empty() {
            return Err(HarvestError::Config("no accounts configured".to_string()));
        }
        if self.worker.page_size == 0 {
            return Err(HarvestError::Config("page size must be at least 1".to_string()));
        }
        if self.worker.day_cap == 0 {
            return Err(HarvestError::Config("day cap must be at least 1".to_string()));
        }
        if self.writer.batch_size == 0 {
            return Err(HarvestError::Config("batch size must be at least 1".to_string()));
        }
        if self.raw_output == self.final_output {
            return Err(HarvestError::Config(
                "raw and finalized outputs must be different files".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_range() -> DateRange {
        DateRange::single_day(NaiveDate::from_ymd_opt(2018, 1, 1).unwrap())
    }

    fn sample_accounts() -> Vec<Credentials> {
        vec![Credentials::new("alice", "alice@example.net", "pw")]
    }

    #[test]
    fn test_default_limits() {
        let config = HarvestConfig::new("#topic", sample_range(), sample_accounts());

        assert_eq!(config.worker.page_size, 20);
        assert_eq!(config.worker.day_cap, 24);
        assert_eq!(config.writer.batch_size, 500);
        assert_eq!(config.writer.cooldown, Duration::from_secs(60));
        assert_eq!(config.restart_delay, Duration::from_secs(5));
        assert_eq!(config.max_restarts, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_accounts() {
        let config = HarvestConfig::new("#topic", sample_range(), Vec::new());
        assert!(matches!(config.validate(), Err(HarvestError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_colliding_outputs() {
        let mut config = HarvestConfig::new("#topic", sample_range(), sample_accounts());
        config.final_output = config.raw_output.clone();
        assert!(matches!(config.validate(), Err(HarvestError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = HarvestConfig::new("#topic", sample_range(), sample_accounts());
        config.writer.batch_size = 0;
        assert!(config.validate().is_err());
    }
}
