//! # Time-Bucket Aggregator
//!
//! Places every one-second sample of every range on a common time axis
//! relative to a reference instant and groups them into fixed-width
//! buckets keyed by `floor(offset / width)`.
//!
//! Ranges that land in the same bucket are concatenated. Overlapping
//! ranges are not deduplicated: two ranges covering the same second both
//! contribute a tuple. Buckets holding [`defaults::MIN_BUCKET_SAMPLES`] or
//! fewer tuples are discarded.
//!
//! Start times are unsigned on disk; a range whose offset does not fit an
//! `i64` is logged and left out rather than wrapped onto the axis.

use crate::defaults;
use crate::format::long_log::Range;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use tracing::{trace, warn};

/// One second of aligned measurements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleTuple {
    /// Seconds relative to the reference time.
    pub offset: i64,
    pub lmax: f32,
    pub leq: f32,
    pub lmin: f32,
}

/// Bucket index to member tuples.
pub type Buckets = BTreeMap<i64, Vec<SampleTuple>>;

/// Bucket index for a time offset, rounding toward negative infinity.
pub fn bucket_index(offset: i64, bucket_width: NonZeroU32) -> i64 {
    offset.div_euclid(i64::from(bucket_width.get()))
}

/// Offset of the range's first sample from `reference_time`, or `None`
/// when the range cannot be placed on an `i64` time axis (start beyond
/// `i64::MAX`, or the subtraction or the last sample offset overflows).
pub fn range_start_offset(range: &Range, reference_time: i64) -> Option<i64> {
    let start = i64::try_from(range.start_time).ok()?;
    let offset = start.checked_sub(reference_time)?;
    let count = i64::try_from(range.sample_count()).ok()?;
    offset.checked_add(count)?;
    Some(offset)
}

/// Align `ranges` against `reference_time` (absolute seconds) and group
/// their samples into `bucket_width`-second buckets.
///
/// Ranges whose start time cannot be expressed as an offset from the
/// reference are skipped with a warning.
pub fn align_and_bucket(
    ranges: &[Range],
    reference_time: i64,
    bucket_width: NonZeroU32,
) -> Buckets {
    let mut buckets = Buckets::new();
    for range in ranges {
        let start_offset = match range_start_offset(range, reference_time) {
            Some(offset) => offset,
            None => {
                warn!(
                    start_time = range.start_time,
                    reference_time, "range start cannot be aligned, skipping"
                );
                continue;
            }
        };
        let count = range.sample_count();

        // Series shorter than declared are clipped to the shortest one.
        let series_len = range
            .lmax
            .samples
            .len()
            .min(range.leq.samples.len())
            .min(range.lmin.samples.len());
        if series_len < count {
            warn!(
                start_time = range.start_time,
                declared = count,
                available = series_len,
                "range series shorter than declared sample count"
            );
        }

        let aligned = range
            .lmax
            .samples
            .iter()
            .zip(&range.leq.samples)
            .zip(&range.lmin.samples)
            .take(count)
            .enumerate();
        for (i, ((&lmax, &leq), &lmin)) in aligned {
            // Cannot overflow: range_start_offset checked start + count.
            let offset = start_offset + i as i64;
            buckets
                .entry(bucket_index(offset, bucket_width))
                .or_default()
                .push(SampleTuple {
                    offset,
                    lmax,
                    leq,
                    lmin,
                });
        }
        trace!(start_offset, count, "aligned range");
    }

    // Sparse buckets say little about the interval.
    buckets.retain(|_, tuples| tuples.len() > defaults::MIN_BUCKET_SAMPLES);
    buckets
}
