//! Merge command implementation.

use anyhow::{Context, Result};
use inquire::Confirm;
use magpie_lib::prelude::*;
use magpie_lib::write_json;
use std::path::{Path, PathBuf};

/// Re-applies the dedup/sort invariant over a raw store and writes the
/// result to a finalized output.
pub(crate) async fn merge(
    input: &Path,
    output: Option<PathBuf>,
    format_str: &str,
    yes: bool,
) -> Result<()> {
    let format: OutputFormat = format_str
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let output = output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .map_or_else(|| "posts".to_string(), |s| s.to_string_lossy().into_owned());
        input.with_file_name(format!("{stem}_final.{}", format.extension()))
    });

    if output.exists() && !yes {
        let overwrite = Confirm::new(&format!("Overwrite {}?", output.display()))
            .with_default(false)
            .prompt()
            .context("Confirmation aborted")?;
        if !overwrite {
            println!("Leaving {} untouched.", output.display());
            return Ok(());
        }
    }

    let rows = CsvStore::new(input)
        .read_all()
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let before = rows.len();
    let merged = magpie_lib::merge(rows, Vec::new());

    match format {
        OutputFormat::Csv => CsvStore::new(&output)
            .write_all(&merged)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?,
        OutputFormat::Json => write_json(&output, &merged)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?,
    }

    println!(
        "Merged {before} rows into {} ({} after dedup)",
        output.display(),
        merged.len()
    );
    Ok(())
}
