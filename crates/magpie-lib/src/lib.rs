//! Concurrent social-post harvesting pipeline.
//!
//! This is a facade crate that re-exports functionality from the magpie
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use magpie_lib::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let range = DateRange::new(
//!         chrono::NaiveDate::from_ymd_opt(2017, 9, 1).unwrap(),
//!         chrono::NaiveDate::from_ymd_opt(2018, 12, 31).unwrap(),
//!     )?;
//!     let accounts = vec![Credentials::new("alice", "alice@example.net", "secret")];
//!     let config = HarvestConfig::new("#topic", range, accounts);
//!
//!     // `factory` builds your SearchSession implementation per worker.
//!     let factory: Arc<dyn SessionFactory> = todo!();
//!     let report = Supervisor::new(config, factory).run().await?;
//!     println!("harvested {} posts", report.total_posts);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use magpie_types::*;

// Re-export the search boundary and session persistence
pub use magpie_client::{
    Identity, PageCursor, SearchPage, SearchQuery, SearchSession, SessionData, SessionFactory,
    SessionStore, SessionStoreError,
};

// Re-export the durable store
pub use magpie_store::{COLUMNS, CsvStore, OutputFormat, StoreError, merge, write_json};

// Re-export the pipeline
pub use magpie_harvest::{
    BatchWriter, GlobalCounter, HarvestConfig, HarvestWorker, RetryContext, RetryPolicy,
    RetryStage, RunReport, Supervisor, WorkerConfig, WriterConfig,
};

/// Prelude module for convenient imports.
///
/// ```
/// use magpie_lib::prelude::*;
/// ```
pub mod prelude {
    pub use magpie_types::{
        Credentials, DateRange, DayWindow, HarvestError, Post, PostedAt, Result, WorkAssignment,
        partition,
    };

    pub use magpie_client::{
        Identity, PageCursor, SearchPage, SearchQuery, SearchSession, SessionFactory, SessionStore,
    };

    pub use magpie_store::{CsvStore, OutputFormat, merge};

    pub use magpie_harvest::{
        BatchWriter, GlobalCounter, HarvestConfig, RetryPolicy, RunReport, Supervisor,
        WorkerConfig, WriterConfig,
    };
}
