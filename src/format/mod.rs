//! Decoders for the two vendor telemetry formats.
//!
//! - [`long_log`]: the long-term "sync" log (`.wls`): header, clock-sync
//!   details and per-range Lmax/Leq/Lmin float series.
//! - [`raw`]: the raw per-second sample stream (`.wlg`): self-delimited
//!   frames of 16-bit sample triples with a descriptive trailer.
//!
//! Both decoders are pure functions of the input buffer and end with a
//! size-reconciliation check; a buffer that does not account for every
//! byte is rejected with [`crate::DecodeError::MalformedFile`].

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod long_log;
pub mod raw;

pub use long_log::{decode_long_log, FileHeader, LongLogFile, MetricSeries, Range, SyncDetail};
pub use raw::{decode_raw_samples, raw_to_decibels, RawFrame, RawSampleFile, RawTrailer};

/// The three sound-level metrics carried by both formats, in file order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    Lmax,
    Leq,
    Lmin,
}

impl Metric {
    /// File order of the metric blocks within a range and of values within a triple.
    pub const ORDER: [Metric; 3] = [Metric::Lmax, Metric::Leq, Metric::Lmin];
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Lmax => write!(f, "Lmax"),
            Metric::Leq => write!(f, "Leq"),
            Metric::Lmin => write!(f, "Lmin"),
        }
    }
}

/// Hex rendering for opaque fields in diagnostic output.
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
