//! Durable deduplicated dataset storage for magpie.
//!
//! The durable store is one CSV file that is always deduplicated by post
//! link and sorted by post time. Every flush rewrites it wholesale from the
//! merged old and new content; [`merge`] is the single implementation of
//! that invariant, shared by the batching writer and the final
//! post-process pass.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod csv;
mod json;
mod merge;

pub use csv::{COLUMNS, CsvStore};
pub use json::write_json;
pub use merge::merge;

use std::path::PathBuf;

use magpie_types::HarvestError;
use thiserror::Error;

/// Errors that can occur while reading or rewriting a store file.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to read the store file.
    #[error("failed to read store '{path}': {source}")]
    Read {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write the store file.
    #[error("failed to write store '{path}': {source}")]
    Write {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The store file contains a row the CSV layer cannot decode.
    #[error("malformed store '{path}': {source}")]
    Csv {
        /// The path that could not be decoded.
        path: PathBuf,
        /// The underlying CSV error.
        source: csv_async::Error,
    },

    /// The store file contains a row with unexpected content.
    #[error("malformed store '{path}': {detail}")]
    Malformed {
        /// The path that could not be decoded.
        path: PathBuf,
        /// What was wrong with the row.
        detail: String,
    },

    /// Failed to serialize the finalized output.
    #[error("failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

// Any store failure is fatal to the pipeline: a partial or unverifiable
// rewrite would break the always-deduplicated, always-sorted invariant.
impl From<StoreError> for HarvestError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Output format for the finalized dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Comma-separated values with a header row.
    #[default]
    Csv,
    /// Pretty-printed JSON array.
    Json,
}

impl OutputFormat {
    /// File extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("parquet".parse::<OutputFormat>().is_err());
    }
}
