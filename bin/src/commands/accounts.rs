//! Accounts command implementation.

use anyhow::{Result, bail};
use std::path::Path;

use super::load_accounts;

/// Validates an accounts file and lists its usernames.
pub(crate) fn accounts(file: &Path) -> Result<()> {
    let accounts = load_accounts(file)?;
    if accounts.is_empty() {
        bail!("Accounts file {} is empty", file.display());
    }

    println!("{} accounts:", accounts.len());
    for (index, account) in accounts.iter().enumerate() {
        println!(
            "  worker-{}: {} <{}>",
            index + 1,
            account.username,
            account.email
        );
    }
    Ok(())
}
