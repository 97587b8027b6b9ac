//! # Utility Functions
//!
//! Small helpers shared by the statistics engine, report assembly and the
//! command line: numeric rounding, configuration validation and day
//! arithmetic.

use crate::defaults;
use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};

/// Round to `places` decimal places, halves away from zero.
///
/// ## Examples
///
/// ```rust
/// # use acoustic_sync::utils::round_to;
/// assert_eq!(round_to(57.4036, 2), 57.4);
/// assert_eq!(round_to(-1.005, 1), -1.0);
/// ```
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Round to two decimal places, the precision of every reported level.
pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// Validate that a bucket width is usable for daily reports.
///
/// ## Validation Rules
///
/// - **Minimum**: 1 second
/// - **Day alignment**: must divide 86 400 evenly so every day holds a
///   whole number of buckets and labels land on the same wall-clock times
pub fn validate_bucket_width(bucket_width: u32) -> Result<()> {
    if bucket_width == 0 {
        anyhow::bail!("Bucket width cannot be zero");
    }
    if defaults::SECONDS_PER_DAY % i64::from(bucket_width) != 0 {
        anyhow::bail!(
            "Bucket width {} does not divide a day ({} s) evenly",
            bucket_width,
            defaults::SECONDS_PER_DAY
        );
    }
    Ok(())
}

/// Number of buckets in a full day report.
pub fn buckets_per_day(bucket_width: u32) -> usize {
    (defaults::SECONDS_PER_DAY / i64::from(bucket_width.max(1))) as usize
}

/// Midnight UTC at the start of `date`.
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::default()))
}

/// Midnight UTC at the start of the day containing `time`.
pub fn start_of_day(time: DateTime<Utc>) -> DateTime<Utc> {
    day_start(time.date_naive())
}

/// Reference instant for a day's aggregation: half a bucket before
/// midnight, so each bucket is centred on its label.
pub fn reference_time_for_day(day: DateTime<Utc>, bucket_width: u32) -> DateTime<Utc> {
    day - Duration::seconds(i64::from(bucket_width / 2))
}

/// Whether `now` falls in the early-morning window during which the
/// previous day is synced again to pick up late data.
pub fn in_previous_day_window(now: DateTime<Utc>) -> bool {
    defaults::PREVIOUS_DAY_HOURS.contains(&now.hour())
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_day(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{}': {} (expected YYYY-MM-DD)", s, e))
}
