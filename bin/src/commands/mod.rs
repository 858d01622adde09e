//! Subcommand implementations.

mod accounts;
mod merge;
mod plan;

pub(crate) use accounts::accounts;
pub(crate) use merge::merge;
pub(crate) use plan::plan;

use anyhow::{Context, Result};
use magpie_lib::Credentials;
use std::path::Path;

/// Loads an accounts file: a JSON array of credentials.
pub(crate) fn load_accounts(path: &Path) -> Result<Vec<Credentials>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read accounts file {}", path.display()))?;
    let accounts: Vec<Credentials> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid accounts file {}", path.display()))?;
    Ok(accounts)
}
