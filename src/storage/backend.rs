//! Storage backend trait definition
//!
//! This module defines the core `StorageBackend` trait that all
//! storage implementations must implement.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::error::StorageResult;
use crate::record::GrowthRecord;

/// Trait for persistent record storage
///
/// All storage backends (CSV, Google Sheets, Notion) must implement this
/// trait. The trait is designed to be:
///
/// - **Async**: the remote backends are HTTP clients
/// - **Append-only**: `save_record` is the only write operation
/// - **History-aware**: `load_last_value` resolves the previous sample
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` so a boxed backend can move across
/// async tasks.
///
/// ## Error Handling
///
/// Methods return `StorageResult<T>` which wraps `StorageError`.
/// Implementations convert their transport-specific failures into the
/// matching `StorageError` variant; "no history yet" is never an error.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Ensure the medium carries the expected header or schema
    ///
    /// Idempotent: initializing an already-initialized target is a no-op and
    /// never duplicates the header. Fails with `StorageError::Init` when the
    /// medium is unreachable (missing file permissions, bad credentials,
    /// network failure).
    async fn initialize(&self) -> StorageResult<()>;

    /// Return the follower count of the most recent record dated strictly
    /// before `as_of`
    ///
    /// Records written on `as_of` itself are excluded so a rerun on the same
    /// day never compares a sample against itself. Returns 0 when no
    /// qualifying record exists (first run).
    async fn load_last_value(&self, as_of: NaiveDate) -> StorageResult<u64>;

    /// Append one record to the medium
    ///
    /// The append is all-or-nothing: on `StorageError::Write` the medium
    /// contains no partial row.
    async fn save_record(&self, record: &GrowthRecord) -> StorageResult<()>;
}
