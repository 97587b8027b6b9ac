//! # Bucket Statistics
//!
//! Per-bucket acoustic levels computed from the aligned sample tuples:
//!
//! - **LAeq**: energy average of the Leq values (mean of `10^(L/10)`,
//!   converted back to decibels)
//! - **LAFmax / LAFmin**: loudest Lmax and quietest Lmin in the bucket
//! - **LAF01..LAF99**: exceedance levels picked from the ascending sort of
//!   the Leq values
//!
//! Every reported value is rounded to two decimals here, so the report
//! layer only formats.

use crate::aggregate::{Buckets, SampleTuple};
use crate::utils::round2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fast-weighted exceedance levels reported per bucket.
///
/// `LAFxx` is the level exceeded `xx`% of the time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exceedance {
    F01,
    F10,
    F50,
    F90,
    F99,
}

impl Exceedance {
    /// Report column order.
    pub const ALL: [Exceedance; 5] = [
        Exceedance::F01,
        Exceedance::F10,
        Exceedance::F50,
        Exceedance::F90,
        Exceedance::F99,
    ];

    /// Position of this level in [`Exceedance::ALL`].
    pub fn index(self) -> usize {
        match self {
            Exceedance::F01 => 0,
            Exceedance::F10 => 1,
            Exceedance::F50 => 2,
            Exceedance::F90 => 3,
            Exceedance::F99 => 4,
        }
    }

    /// Percentage of time the level is exceeded.
    pub fn percent(self) -> usize {
        match self {
            Exceedance::F01 => 1,
            Exceedance::F10 => 10,
            Exceedance::F50 => 50,
            Exceedance::F90 => 90,
            Exceedance::F99 => 99,
        }
    }

    /// Index into an ascending sort of `n` values: `floor((1 - p) * n)`,
    /// computed in integer percent so that e.g. LAF90 of 10 values is index 1.
    pub fn sorted_index(self, n: usize) -> usize {
        let index = (100 - self.percent()) * n / 100;
        index.min(n.saturating_sub(1))
    }
}

impl fmt::Display for Exceedance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LAF{:02}", self.percent())
    }
}

/// Exceedance level paired with its value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileValue {
    pub level: Exceedance,
    pub value_db: f64,
}

/// Statistics for one surviving bucket, every value rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub bucket_index: i64,
    pub sample_count: usize,
    pub laeq: f64,
    pub lafmax: f64,
    pub lafmin: f64,
    /// In [`Exceedance::ALL`] order, one entry per level.
    pub percentiles: [PercentileValue; 5],
}

impl SummaryRecord {
    pub fn percentile(&self, level: Exceedance) -> f64 {
        self.percentiles[level.index()].value_db
    }
}

/// Energy average of decibel values: mean in the linear power domain,
/// converted back to decibels. Returns `None` for an empty input.
pub fn log_average(levels_db: &[f64]) -> Option<f64> {
    if levels_db.is_empty() {
        return None;
    }
    let mean_power = levels_db
        .iter()
        .map(|db| 10f64.powf(db / 10.0))
        .sum::<f64>()
        / levels_db.len() as f64;
    Some(10.0 * mean_power.log10())
}

/// Compute the summary of one bucket. Returns `None` for an empty bucket.
pub fn summarize(bucket_index: i64, tuples: &[SampleTuple]) -> Option<SummaryRecord> {
    let mut leq: Vec<f64> = tuples.iter().map(|t| f64::from(t.leq)).collect();
    let laeq = log_average(&leq)?;

    let lafmax = tuples
        .iter()
        .map(|t| f64::from(t.lmax))
        .fold(f64::NEG_INFINITY, f64::max);
    let lafmin = tuples
        .iter()
        .map(|t| f64::from(t.lmin))
        .fold(f64::INFINITY, f64::min);

    // Exceedance levels index into the ascending sort.
    leq.sort_by(|a, b| a.total_cmp(b));
    let percentiles = Exceedance::ALL.map(|level| PercentileValue {
        level,
        value_db: round2(leq[level.sorted_index(leq.len())]),
    });

    Some(SummaryRecord {
        bucket_index,
        sample_count: tuples.len(),
        laeq: round2(laeq),
        lafmax: round2(lafmax),
        lafmin: round2(lafmin),
        percentiles,
    })
}

/// Summarize every bucket, in bucket order.
pub fn summarize_buckets(buckets: &Buckets) -> Vec<SummaryRecord> {
    buckets
        .iter()
        .filter_map(|(&index, tuples)| summarize(index, tuples))
        .collect()
}
