//! CSV file storage backend
//!
//! Keeps the follower history in a local newline-delimited file with a
//! `date,followers_count,delta,rate` header row. This is the default backend
//! and requires no credentials.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use super::backend::StorageBackend;
use super::error::{StorageError, StorageResult};
use crate::record::GrowthRecord;

/// Header row written on first initialization.
pub const CSV_HEADER: &str = "date,followers_count,delta,rate";

/// CSV file storage backend
pub struct CsvBackend {
    path: PathBuf,
}

impl CsvBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the date and follower count out of one data row
    ///
    /// The remaining fields are derived values and not needed for lookups.
    fn parse_row(line: &str) -> StorageResult<(NaiveDate, u64)> {
        let mut fields = line.split(',');
        let (Some(date), Some(count)) = (fields.next(), fields.next()) else {
            return Err(StorageError::Read(format!("malformed row: {line:?}")));
        };

        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|e| StorageError::Read(format!("invalid date in row {line:?}: {e}")))?;
        let count = count.trim().parse::<u64>().map_err(|e| {
            StorageError::Read(format!("invalid follower count in row {line:?}: {e}"))
        })?;

        Ok((date, count))
    }
}

#[async_trait]
impl StorageBackend for CsvBackend {
    #[instrument(skip(self))]
    async fn initialize(&self) -> StorageResult<()> {
        if self.path.exists() {
            debug!("log file already exists: {}", self.path.display());
            return Ok(());
        }

        tokio::fs::write(&self.path, format!("{CSV_HEADER}\n"))
            .await
            .map_err(|e| {
                StorageError::Init(format!("failed to create {}: {e}", self.path.display()))
            })?;

        info!("created new log file: {}", self.path.display());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_last_value(&self, as_of: NaiveDate) -> StorageResult<u64> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("no log file found (first run)");
                return Ok(0);
            }
            Err(e) => {
                return Err(StorageError::Read(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        // Skip the header, then scan the data rows from the end.
        let rows: Vec<&str> = contents
            .lines()
            .skip(1)
            .filter(|line| !line.trim().is_empty())
            .collect();

        for line in rows.iter().rev() {
            let (date, count) = Self::parse_row(line)?;
            if date < as_of {
                info!("loaded last record: {count} followers on {date}");
                return Ok(count);
            }
        }

        info!("no historical data found (first run)");
        Ok(0)
    }

    #[instrument(skip(self, record), fields(date = %record.date))]
    async fn save_record(&self, record: &GrowthRecord) -> StorageResult<()> {
        let row = format!(
            "{},{},{},{}\n",
            record.date,
            record.followers,
            record.delta,
            record.formatted_rate()
        );

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                StorageError::Write(format!("failed to open {}: {e}", self.path.display()))
            })?;

        // One write_all call for the whole row, so a failure never leaves a
        // partial record behind.
        file.write_all(row.as_bytes()).await.map_err(|e| {
            StorageError::Write(format!("failed to append to {}: {e}", self.path.display()))
        })?;
        file.flush().await.map_err(|e| {
            StorageError::Write(format!("failed to flush {}: {e}", self.path.display()))
        })?;

        info!(
            "saved record: {}, {} followers (delta {:+}, rate {})",
            record.date,
            record.followers,
            record.delta,
            record.formatted_rate()
        );
        Ok(())
    }
}
