//! Range extraction.
//!
//! The aggregation pipeline only needs sample ranges, not headers or sync
//! details. [`RangeSource`] is the seam through which decoded files hand
//! their ranges over.

use crate::error::DecodeResult;
use crate::format::long_log::{decode_long_log, LongLogFile, Range};

/// Anything that can yield sample ranges for aggregation.
pub trait RangeSource {
    fn into_ranges(self) -> Vec<Range>;
}

impl RangeSource for LongLogFile {
    fn into_ranges(self) -> Vec<Range> {
        self.ranges
    }
}

impl RangeSource for Vec<Range> {
    fn into_ranges(self) -> Vec<Range> {
        self
    }
}

/// Return the ranges of a decoded long-log file unchanged.
pub fn extract_ranges(file: LongLogFile) -> Vec<Range> {
    file.into_ranges()
}

/// Decode a long-log buffer and keep only its ranges.
pub fn extract_long_log_ranges(bytes: &[u8]) -> DecodeResult<Vec<Range>> {
    decode_long_log(bytes).map(extract_ranges)
}
