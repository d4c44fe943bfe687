//! The fetch → diff → persist pipeline
//!
//! One [`Tracker::run`] call performs a single tracking run: initialize the
//! backend, resolve the previous value, fetch the current count, compute the
//! growth record, append it. Stages run strictly in order and the append is
//! the only write, so a failed run never leaves a partial record behind.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::fetcher::FollowerFetcher;
use crate::record::GrowthRecord;
use crate::storage::StorageBackend;

/// Outcome of a successful tracking run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The record appended to the backend
    pub record: GrowthRecord,

    /// The previous value the delta was computed against
    pub previous: u64,
}

/// One-shot tracking pipeline over a backend and a fetcher
pub struct Tracker {
    backend: Box<dyn StorageBackend>,
    fetcher: FollowerFetcher,
}

impl Tracker {
    pub fn new(backend: Box<dyn StorageBackend>, fetcher: FollowerFetcher) -> Self {
        Self { backend, fetcher }
    }

    /// Execute one tracking run for the given date
    ///
    /// The previous value is resolved before the fetch: a record already
    /// written on `today` by an earlier attempt is excluded from the lookup,
    /// so a rerun appends a fresh sample instead of comparing against
    /// itself.
    #[instrument(skip(self))]
    pub async fn run(&self, today: NaiveDate) -> Result<RunSummary> {
        self.backend
            .initialize()
            .await
            .context("storage initialization failed")?;

        let previous = self
            .backend
            .load_last_value(today)
            .await
            .context("loading the last recorded value failed")?;

        let current = self
            .fetcher
            .fetch()
            .await
            .context("fetching the follower count failed")?;

        let record = GrowthRecord::compute(today, current, previous);

        self.backend
            .save_record(&record)
            .await
            .context("saving the record failed")?;

        info!(
            "tracking run complete: {} followers (delta {:+}, rate {})",
            record.followers,
            record.delta,
            record.formatted_rate()
        );

        Ok(RunSummary { record, previous })
    }
}
