//! Plan command implementation.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use magpie_lib::prelude::*;
use std::path::Path;

use super::load_accounts;

/// Shows how the date range would be partitioned across workers.
pub(crate) fn plan(
    start_str: &str,
    end_str: &str,
    workers: Option<usize>,
    accounts: Option<&Path>,
) -> Result<()> {
    let start = NaiveDate::parse_from_str(start_str, "%Y-%m-%d")
        .with_context(|| format!("Invalid start date: {start_str}"))?;
    let end = NaiveDate::parse_from_str(end_str, "%Y-%m-%d")
        .with_context(|| format!("Invalid end date: {end_str}"))?;
    let range = DateRange::new(start, end)?;

    let workers = match (workers, accounts) {
        (Some(n), _) => n,
        (None, Some(path)) => load_accounts(path)?.len(),
        (None, None) => bail!("Pass --workers or --accounts to size the fleet"),
    };
    if workers == 0 {
        bail!("At least one worker is required");
    }

    println!("{} ({} days) across {workers} workers:", range, range.total_days());
    for assignment in partition(&range, workers) {
        let preview: Vec<String> = assignment
            .days
            .iter()
            .take(3)
            .map(|day| day.window.date().to_string())
            .collect();
        let suffix = if assignment.len() > 3 { ", ..." } else { "" };
        println!(
            "  worker-{}: {} days [{}{suffix}]",
            assignment.worker + 1,
            assignment.len(),
            preview.join(", ")
        );
    }
    Ok(())
}
