//! Concurrent harvesting pipeline for magpie.
//!
//! One worker per credentialed account harvests its round-robin share of a
//! date range, paging through the search boundary day by day. Everything
//! the workers share goes through exactly two synchronized resources:
//!
//! - [`GlobalCounter`] - the process-wide progress total
//! - [`BatchWriter`] - the serialized, deduplicating path to the durable
//!   store
//!
//! Failures escalate along a fixed ladder ([`RetryPolicy`]); a
//! resource-gone failure from any worker makes the [`Supervisor`] tear the
//! whole run down and start over from scratch, reusing only the persisted
//! sessions.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod counter;
mod retry;
mod supervisor;
mod worker;
mod writer;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{HarvestConfig, WorkerConfig, WriterConfig};
pub use counter::GlobalCounter;
pub use retry::{RetryContext, RetryPolicy, RetryStage};
pub use supervisor::{RunReport, Supervisor};
pub use worker::HarvestWorker;
pub use writer::BatchWriter;
