//! Absolute instrument time.
//!
//! Both file formats and the vendor API stamp events with unsigned 64-bit
//! seconds since 1904-01-01T00:00:00 UTC. These helpers convert between
//! that representation and `chrono` UTC timestamps.

use chrono::{DateTime, TimeZone, Utc};

/// Seconds from 1904-01-01T00:00:00Z to the Unix epoch.
pub const EPOCH_1904_OFFSET_SECS: i64 = 2_082_844_800;

/// Convert absolute seconds to a calendar timestamp.
///
/// Returns `None` when the value is outside the range `chrono` can represent.
pub fn to_calendar_time(abstime: u64) -> Option<DateTime<Utc>> {
    let abstime = i64::try_from(abstime).ok()?;
    let unix = abstime.checked_sub(EPOCH_1904_OFFSET_SECS)?;
    Utc.timestamp_opt(unix, 0).single()
}

/// Convert a calendar timestamp to absolute seconds, rounding to the
/// nearest whole second.
///
/// The result is signed because instants before 1904 are representable
/// by `chrono` even though the instrument never produces them.
pub fn from_calendar_time(time: DateTime<Utc>) -> i64 {
    let whole = time.timestamp() + EPOCH_1904_OFFSET_SECS;
    if time.timestamp_subsec_nanos() >= 500_000_000 {
        whole + 1
    } else {
        whole
    }
}

/// Render an absolute time for diagnostic output.
pub fn describe(abstime: u64) -> String {
    match to_calendar_time(abstime) {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "out of range".to_string(),
    }
}
