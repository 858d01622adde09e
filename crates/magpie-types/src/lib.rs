//! Core types for the magpie post harvester.
//!
//! This crate provides the fundamental data structures used throughout magpie:
//!
//! - [`Post`] - A harvested post with engagement counts and its permalink
//! - [`PostedAt`] - The post timestamp used as the dataset sort key
//! - [`DayWindow`] - A single UTC calendar day as a closed time interval
//! - [`DateRange`] - Inclusive date range with per-day window iteration
//! - [`WorkAssignment`] - A worker's round-robin share of the day range
//! - [`HarvestError`] - The error taxonomy shared by every pipeline stage

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod credentials;
mod error;
mod partition;
mod post;
mod window;

pub use credentials::Credentials;
pub use error::{HarvestError, Result, WindowError};
pub use partition::{AssignedDay, WorkAssignment, partition};
pub use post::{Post, PostedAt};
pub use window::{DateRange, DayIterator, DayWindow};
