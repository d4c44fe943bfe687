//! The growth record produced by each tracking run

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One persisted sample: date, follower count, delta and growth rate
///
/// Records are immutable once written. The delta and rate are derived from
/// the previous sample at construction time and stored alongside the raw
/// count, so every row in the log is self-contained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthRecord {
    /// Calendar date of the run (no time component)
    pub date: NaiveDate,

    /// The sampled follower count
    pub followers: u64,

    /// Change against the previous sample
    pub delta: i64,

    /// Delta as a percentage of the previous sample, 0.0 on a first run
    pub rate: f64,
}

impl GrowthRecord {
    /// Derive a record from the current sample and the previous value
    ///
    /// `previous == 0` marks a first run: the delta equals the raw count and
    /// the rate is defined as zero.
    pub fn compute(date: NaiveDate, current: u64, previous: u64) -> Self {
        let delta = current as i64 - previous as i64;
        let rate = if previous == 0 {
            0.0
        } else {
            delta as f64 / previous as f64 * 100.0
        };

        Self {
            date,
            followers: current,
            delta,
            rate,
        }
    }

    /// The rate as the signed percentage string stored in the backends
    pub fn formatted_rate(&self) -> String {
        format!("{:+.2}%", self.rate)
    }
}
