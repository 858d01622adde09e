//! Round-robin partitioning of a date range across workers.

use crate::{DateRange, DayWindow};

/// A single day owned by a worker, with its index in the full range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignedDay {
    /// Position of the day in the full range (0-based).
    pub index: usize,
    /// The day window to harvest.
    pub window: DayWindow,
}

/// The ordered subset of days owned exclusively by one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkAssignment {
    /// Worker index (0-based).
    pub worker: usize,
    /// Assigned days, ascending by day index.
    pub days: Vec<AssignedDay>,
}

impl WorkAssignment {
    /// Number of days assigned to this worker.
    #[must_use]
    pub fn len(&self) -> usize {
        self.days.len()
    }

    /// Returns true if the worker has nothing to harvest.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Splits a date range into `workers` disjoint assignments.
///
/// Day `i` goes to worker `i % workers`, so every worker receives a roughly
/// equal-size, interleaved subset in ascending day order. The union of all
/// assignments is the full range. When the range has fewer days than
/// workers, the trailing workers receive empty assignments.
///
/// # Panics
///
/// Panics if `workers` is zero.
#[must_use]
pub fn partition(range: &DateRange, workers: usize) -> Vec<WorkAssignment> {
    assert!(workers > 0, "at least one worker is required");

    let mut assignments: Vec<WorkAssignment> = (0..workers)
        .map(|worker| WorkAssignment {
            worker,
            days: Vec::new(),
        })
        .collect();

    for (index, window) in range.days().enumerate() {
        assignments[index % workers].days.push(AssignedDay { index, window });
    }

    assignments
}
