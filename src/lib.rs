//! # Acoustic Sync Library
//!
//! Decoders and statistics for the telemetry files produced by networked
//! sound level meters.
//!
//! ## Supported Formats
//!
//! - **Long log (WLS)**: per-second Lmax/Leq/Lmin decibel levels grouped in
//!   contiguous ranges, behind a fixed header and sync-detail records
//! - **Raw samples (WLG)**: length-prefixed frames of 16-bit samples, each
//!   followed by a text trailer
//!
//! ## Architecture Overview
//!
//! - `cursor`, `error`, `abstime`: byte reading and writing, decode errors,
//!   the device's 1904-based clock
//! - `format`: the two file decoders (and their encoders)
//! - `ranges`, `aggregate`: flattening ranges and bucketing samples on a
//!   reference time
//! - `metrics`, `results`: per-bucket LAeq / LAFmax / LAFmin / exceedance
//!   levels and labelled CSV reports
//! - `source`, `store`, `sync`: async boundaries to where files live and the
//!   daily report cycle built on them
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use acoustic_sync::{extract_long_log_ranges, sync::build_day_report, results::render_csv};
//! use chrono::NaiveDate;
//!
//! fn main() -> anyhow::Result<()> {
//!     let bytes = std::fs::read("CID_1453_2020_03_10__09h44m22s.wls")?;
//!     let ranges = extract_long_log_ranges(&bytes)?;
//!
//!     let day = NaiveDate::from_ymd_opt(2020, 3, 10).unwrap();
//!     let rows = build_day_report(&ranges, day, 600)?;
//!     print!("{}", render_csv(&rows)?);
//!     Ok(())
//! }
//! ```
//!
//! Decoding, aggregation and statistics are synchronous and allocation-only;
//! I/O happens behind the [`SourceFetcher`] and [`ReportStore`] traits.

pub mod abstime;

/// Command-line interface and configuration
///
/// Subcommands for inspecting files, building a report from local files
/// and running the day-sync cycle.
pub mod cli;

pub mod cursor;

/// Human-readable dumps of decoded files
pub mod dump;

pub mod error;

/// Long-log and raw-sample decoders
///
/// Both decoders validate the total buffer length against the declared
/// counts before returning, so a structurally truncated file is rejected
/// rather than partially decoded.
pub mod format;

pub mod aggregate;

pub mod logging;

/// Per-bucket statistics
///
/// Energy-averaged LAeq, extreme levels and the LAF01..LAF99 exceedance
/// levels, all rounded to two decimals.
pub mod metrics;

pub mod ranges;

/// Report rows and CSV output
pub mod results;

pub mod source;

pub mod store;

/// Daily report synchronization
///
/// Picks source files, aggregates a day and replaces the stored report
/// only when the new one is more complete.
pub mod sync;

pub mod utils;

pub use error::{DecodeError, DecodeResult};
pub use format::long_log::{decode_long_log, LongLogFile, Range};
pub use format::raw::{decode_raw_samples, RawSampleFile};
pub use metrics::{Exceedance, SummaryRecord};
pub use ranges::extract_long_log_ranges;
pub use results::ReportRow;
pub use source::SourceFetcher;
pub use store::ReportStore;

/// The current crate version, from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    use std::ops::RangeInclusive;

    /// Report bucket width in seconds (10 minutes).
    pub const BUCKET_WIDTH_SECS: u32 = 600;

    /// Half the default bucket; the reference time sits this far before
    /// midnight.
    pub const HALF_BUCKET_SECS: u32 = BUCKET_WIDTH_SECS / 2;

    /// Buckets holding this many samples or fewer are dropped.
    pub const MIN_BUCKET_SAMPLES: usize = 3;

    pub const SECONDS_PER_DAY: i64 = 86_400;

    /// Decibel level of a raw sample of zero.
    pub const RAW_DB_OFFSET: f64 = 124.7847;

    /// Raw units per decibel.
    pub const RAW_DB_SCALE: f64 = 20.0;

    /// UTC hours during which the previous day is synced again.
    pub const PREVIOUS_DAY_HOURS: RangeInclusive<u32> = 1..=3;
}
