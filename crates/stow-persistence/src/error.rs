//! Persistence error types.
//!
//! Every fallible step of the durability layer produces a structured error
//! with a user-friendly message and an optional remediation hint. The facade
//! mutators swallow them; `Stow::flush` and the event observer expose them.

use std::path::PathBuf;
use thiserror::Error;

/// Persistence operation error.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// File I/O error.
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No home directory could be determined for the default cache location.
    #[error("Could not determine the home directory")]
    NoHomeDir,

    /// The default cache directory could not be created.
    #[error("Failed to create cache directory: {path}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The data file is not valid JSON.
    #[error("Failed to parse data file: {path}")]
    Deserialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The data file parsed but its top level is not an object.
    #[error("Invalid data file format")]
    InvalidFormat { path: PathBuf, reason: String },

    /// The store (or a typed value) could not be serialized.
    #[error("Failed to serialize store data")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    /// Atomic write failed (temp file couldn't be renamed).
    #[error("Failed to complete save operation")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The lock marker stayed in place for every attempt.
    #[error("Could not acquire lock {path} after {attempts} attempts")]
    LockContended { path: PathBuf, attempts: u32 },

    /// The background save worker could not be started.
    #[error("Failed to start the save worker thread")]
    WorkerSpawn {
        #[source]
        source: std::io::Error,
    },

    /// The background save worker is no longer running.
    #[error("Save scheduler has stopped")]
    SchedulerStopped,
}

impl PersistenceError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => {
                format!("Could not {} the file at {}", operation, path.display())
            }
            Self::NoHomeDir => {
                "No home directory is available to hold the default cache.".to_string()
            }
            Self::CacheDir { path, .. } => {
                format!("Could not create the cache folder {}", path.display())
            }
            Self::Deserialization { path, .. } => {
                format!(
                    "The data file at {} is not valid JSON. It may be corrupted.",
                    path.display()
                )
            }
            Self::InvalidFormat { path, reason } => {
                format!(
                    "The file at {} is not a valid data file: {}",
                    path.display(),
                    reason
                )
            }
            Self::Serialization { .. } => {
                "An error occurred while converting the data to JSON.".to_string()
            }
            Self::AtomicWriteFailed { target_path, .. } => {
                format!(
                    "Could not save the file to {}. Please check disk space and permissions.",
                    target_path.display()
                )
            }
            Self::LockContended { path, attempts } => {
                format!(
                    "Another process held the lock {} for all {} attempts; the save was skipped.",
                    path.display(),
                    attempts
                )
            }
            Self::WorkerSpawn { .. } => "The background saver could not be started.".to_string(),
            Self::SchedulerStopped => "The background saver is no longer running.".to_string(),
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Io { operation, .. } => {
                if *operation == "read" {
                    Some("Check that the file exists and you have permission to read it.".into())
                } else {
                    Some("Check that you have permission to write to this location.".into())
                }
            }
            Self::NoHomeDir => Some("Set XDG_CACHE_HOME or pass an explicit file path.".into()),
            Self::CacheDir { .. } => {
                Some("Make sure the parent of the cache folder exists and is writable.".into())
            }
            Self::Deserialization { .. } | Self::InvalidFormat { .. } => Some(
                "The original file was moved aside with a .corrupt extension for inspection."
                    .into(),
            ),
            Self::Serialization { .. } => None,
            Self::AtomicWriteFailed { .. } => {
                Some("Free up disk space or try saving to a different location.".into())
            }
            Self::LockContended { .. } => Some(
                "If no other process is writing, delete the stale .lock file next to the data file."
                    .into(),
            ),
            Self::WorkerSpawn { .. } | Self::SchedulerStopped => None,
        }
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;
