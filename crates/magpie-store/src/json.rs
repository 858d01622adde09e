//! JSON export for the finalized dataset.

use std::path::Path;

use magpie_types::Post;

use crate::StoreError;

/// Writes the finalized dataset as a pretty-printed JSON array.
///
/// One-shot output, never read back; written atomically like the CSV
/// store.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub async fn write_json(path: &Path, posts: &[Post]) -> Result<(), StoreError> {
    let body = serde_json::to_vec_pretty(posts)?;

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let write_err = |e: std::io::Error| StoreError::Write {
        path: path.to_path_buf(),
        source: e,
    };

    tokio::fs::write(&tmp_path, body).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)
}
