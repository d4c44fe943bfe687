//! Storage backends for follower record persistence
//!
//! This module provides a trait-based abstraction for appending growth
//! records to various media.
//!
//! ## Design
//!
//! - **Trait-based**: `StorageBackend` allows swapping implementations
//! - **Append-only**: a run appends exactly one record, nothing is rewritten
//! - **Async**: the Sheets and Notion backends are HTTP clients
//!
//! ## Backends
//!
//! - **CSV** (default): local flat file, no credentials required
//! - **Google Sheets**: first sheet of a spreadsheet, service-account auth
//! - **Notion**: pages in a database, integration-token auth
//!
//! ## Usage
//!
//! ```no_run
//! use follower_tracker::config::StorageConfig;
//! use follower_tracker::storage;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = StorageConfig::Csv { path: "followers_log.csv".into() };
//!     let backend = storage::create_backend(&config).await?;
//!     backend.initialize().await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod csv;
pub mod error;
pub mod notion;
pub mod sheets;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};

use tracing::info;

use crate::config::StorageConfig;

/// Construct the backend selected by the configuration
///
/// The remote backends authenticate eagerly here, so bad credentials fail
/// the run before anything is fetched or written. The CSV backend touches
/// the filesystem only once `initialize` is called.
pub async fn create_backend(config: &StorageConfig) -> StorageResult<Box<dyn StorageBackend>> {
    match config {
        StorageConfig::Csv { path } => {
            info!("using CSV storage: {}", path.display());
            Ok(Box::new(csv::CsvBackend::new(path)))
        }
        StorageConfig::Sheets {
            spreadsheet_id,
            service_account_json,
        } => {
            info!("using Google Sheets storage");
            let backend =
                sheets::SheetsBackend::connect(spreadsheet_id.clone(), service_account_json)
                    .await?;
            Ok(Box::new(backend))
        }
        StorageConfig::Notion { token, database_id } => {
            info!("using Notion storage");
            let backend = notion::NotionBackend::connect(token, database_id).await?;
            Ok(Box::new(backend))
        }
    }
}
