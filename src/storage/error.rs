//! Error types for storage operations

use std::fmt;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations
///
/// Absent history is not an error: `load_last_value` reports it as a normal
/// zero result.
#[derive(Debug)]
pub enum StorageError {
    /// The medium could not be reached or verified during setup
    Init(String),

    /// Reading existing records failed (corrupt file, unreachable service)
    Read(String),

    /// Appending a record failed
    Write(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Init(msg) => {
                write!(f, "failed to initialize storage backend: {msg}")
            }
            StorageError::Read(msg) => {
                write!(f, "failed to read from storage backend: {msg}")
            }
            StorageError::Write(msg) => write!(f, "failed to write to storage backend: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}
