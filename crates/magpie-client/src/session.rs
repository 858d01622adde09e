//! Persistent session storage, one session per worker.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during session storage operations.
#[derive(Error, Debug)]
pub enum SessionStoreError {
    /// Failed to create a directory.
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// The path that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to read a session file.
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write a session file.
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to delete a session file.
    #[error("failed to delete file '{path}': {source}")]
    DeleteFile {
        /// The path that could not be deleted.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse a stored session.
    #[error("failed to parse session file '{path}': {source}")]
    ParseJson {
        /// The path that could not be parsed.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Failed to serialize a session.
    #[error("failed to serialize session: {0}")]
    SerializeJson(#[from] serde_json::Error),
}

/// Result type for session storage operations.
pub type StoreResult<T> = std::result::Result<T, SessionStoreError>;

/// An authenticated session in its persistable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    /// Cookie jar captured after authentication.
    pub cookies: BTreeMap<String, String>,
    /// When the session was last established or refreshed.
    pub refreshed_at: DateTime<Utc>,
}

impl SessionData {
    /// Creates session data from a cookie jar, stamped now.
    #[must_use]
    pub fn new(cookies: BTreeMap<String, String>) -> Self {
        Self {
            cookies,
            refreshed_at: Utc::now(),
        }
    }
}

/// Stores one session file per worker.
///
/// Sessions are stored as JSON files named `worker-<index>.json` under the
/// store's base directory. They deliberately survive a harvest restart:
/// after the supervisor tears everything down, the replacement workers pick
/// their sessions back up and skip re-authentication.
#[derive(Debug, Clone)]
pub struct SessionStore {
    base_path: PathBuf,
}

impl SessionStore {
    /// Creates a session store at the given base path.
    ///
    /// Creates the directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(base_path: PathBuf) -> StoreResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| SessionStoreError::CreateDir {
                path: base_path.clone(),
                source: e,
            })?;
        }
        Ok(Self { base_path })
    }

    /// Returns the default path for magpie session storage.
    ///
    /// Uses the `directories` crate to find the appropriate location:
    /// - Linux: `~/.local/share/magpie/sessions/`
    /// - macOS: `~/Library/Application Support/magpie/sessions/`
    /// - Windows: `C:\Users\<User>\AppData\Roaming\magpie\sessions\`
    ///
    /// Falls back to `~/.magpie/sessions/` if the platform-specific
    /// location cannot be determined.
    #[must_use]
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "magpie")
            .map_or_else(dirs_fallback, |proj_dirs| proj_dirs.data_dir().to_path_buf())
            .join("sessions")
    }

    /// Creates a session store at the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn with_default_path() -> StoreResult<Self> {
        Self::new(Self::default_path())
    }

    /// Returns the base path for session storage.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Returns the path to a worker's session file.
    #[must_use]
    pub fn session_path(&self, worker: usize) -> PathBuf {
        self.base_path.join(format!("worker-{worker}.json"))
    }

    /// Loads a worker's persisted session, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing session file cannot be read or
    /// parsed; a missing file is `Ok(None)`.
    pub fn load(&self, worker: usize) -> StoreResult<Option<SessionData>> {
        let path = self.session_path(worker);

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| SessionStoreError::ReadFile {
            path: path.clone(),
            source: e,
        })?;

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| SessionStoreError::ParseJson { path, source: e })
    }

    /// Saves a worker's session, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be serialized or written.
    pub fn save(&self, worker: usize, session: &SessionData) -> StoreResult<()> {
        let path = self.session_path(worker);
        let json = serde_json::to_string_pretty(session)?;

        fs::write(&path, json).map_err(|e| SessionStoreError::WriteFile { path, source: e })
    }

    /// Deletes a worker's persisted session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing session file cannot be deleted.
    pub fn clear(&self, worker: usize) -> StoreResult<()> {
        let path = self.session_path(worker);

        if !path.exists() {
            return Ok(());
        }

        fs::remove_file(&path).map_err(|e| SessionStoreError::DeleteFile { path, source: e })
    }
}

fn dirs_fallback() -> PathBuf {
    UserDirs::new().map_or_else(
        || PathBuf::from(".magpie"),
        |dirs| dirs.home_dir().join(".magpie"),
    )
}
