//! # Day Sync
//!
//! Turns source files into daily reports:
//!
//! 1. **Collect ranges**: decode the latest source file for the device; if
//!    its earliest range starts after the day's reference time, also decode
//!    the second-latest file so the start of the day is covered
//! 2. **Aggregate**: align ranges half a bucket before midnight, bucket,
//!    summarize and label
//! 3. **Publish**: replace the stored report only when the new one has more
//!    rows, and never touch a report that is already complete
//!
//! Decoding, aggregation and statistics are synchronous; only the
//! [`SourceFetcher`] and [`ReportStore`] calls suspend.

use crate::abstime::from_calendar_time;
use crate::aggregate::align_and_bucket;
use crate::defaults;
use crate::format::long_log::Range;
use crate::metrics::summarize_buckets;
use crate::ranges::extract_long_log_ranges;
use crate::results::{assemble_report, count_data_rows, render_csv, ReportRow};
use crate::source::{select_recent, SourceFetcher};
use crate::store::{report_name, ReportStore};
use crate::utils::{
    buckets_per_day, day_start, in_previous_day_window, reference_time_for_day,
    validate_bucket_width,
};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::num::NonZeroU32;
use tracing::{debug, info, warn};

/// Settings for a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Instrument id embedded in source and report names.
    pub device_id: String,
    pub bucket_width: u32,
}

impl SyncConfig {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            bucket_width: defaults::BUCKET_WIDTH_SECS,
        }
    }
}

/// Aggregate `ranges` into the labelled rows of `day`.
///
/// Buckets outside the day are discarded, which matters when a source
/// returns whole files instead of the requested window. Fails if
/// `bucket_width` does not split a day evenly.
pub fn build_day_report(
    ranges: &[Range],
    day: NaiveDate,
    bucket_width: u32,
) -> Result<Vec<ReportRow>> {
    validate_bucket_width(bucket_width)?;
    let width = NonZeroU32::new(bucket_width).context("Bucket width cannot be zero")?;

    // Bucket 0 is centred on midnight.
    let start = day_start(day);
    let reference = from_calendar_time(reference_time_for_day(start, bucket_width));

    let mut buckets = align_and_bucket(ranges, reference, width);
    let per_day = buckets_per_day(bucket_width) as i64;
    buckets.retain(|&index, _| (0..per_day).contains(&index));

    Ok(assemble_report(summarize_buckets(&buckets), start, bucket_width))
}

/// Whether the earliest range starts after `reference`, leaving the start
/// of the window uncovered. `false` when there are no ranges.
pub fn starts_after(ranges: &[Range], reference: i64) -> bool {
    match ranges.iter().map(|r| r.start_time).min() {
        // Any unsigned start is after a negative reference.
        Some(earliest) => u64::try_from(reference).map_or(true, |r| earliest > r),
        None => false,
    }
}

/// Whether a freshly rendered report should replace `existing`.
pub fn should_replace(existing: Option<&str>, new_csv: &str) -> bool {
    let new_lines = new_csv.lines().count();
    if new_lines <= 1 {
        return false;
    }
    existing.map_or(true, |old| new_lines > old.lines().count())
}

/// Day-sync driver over a source and a report store.
pub struct DaySync<S, R> {
    source: S,
    store: R,
    config: SyncConfig,
}

impl<S: SourceFetcher, R: ReportStore> DaySync<S, R> {
    pub fn new(source: S, store: R, config: SyncConfig) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Sync today, and yesterday too during the early-morning catch-up
    /// window. Returns the identifiers of reports written.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let today = now.date_naive();
        let mut written = Vec::new();

        if in_previous_day_window(now) {
            if let Some(yesterday) = today.pred_opt() {
                written.extend(self.sync_day(yesterday).await?);
            }
        }
        written.extend(self.sync_day(today).await?);

        info!("Sync finished, {} report(s) written", written.len());
        Ok(written)
    }

    /// Regenerate the report for `day` if it is missing or incomplete.
    pub async fn sync_day(&self, day: NaiveDate) -> Result<Option<String>> {
        let name = report_name(&self.config.device_id, day);
        let existing = self.store.read_report(&name).await?;

        // A complete report is never regenerated.
        if let Some(text) = &existing {
            let rows = count_data_rows(text);
            if rows >= buckets_per_day(self.config.bucket_width) {
                debug!("Report {} already complete ({} rows)", name, rows);
                return Ok(None);
            }
        }

        let rows = self.generate_day(day).await?;
        let csv = render_csv(&rows)?;

        // Only a strictly longer report replaces the stored one.
        if !should_replace(existing.as_deref(), &csv) {
            info!("Report {} unchanged ({} new rows)", name, rows.len());
            return Ok(None);
        }

        let location = self.store.write_report(&name, &csv).await?;
        info!("Wrote report {} with {} rows", location, rows.len());
        Ok(Some(location))
    }

    /// Fetch, decode and aggregate the rows for `day`.
    pub async fn generate_day(&self, day: NaiveDate) -> Result<Vec<ReportRow>> {
        let width = self.config.bucket_width;
        let reference = from_calendar_time(reference_time_for_day(day_start(day), width));
        let ranges = self.collect_ranges(reference).await?;
        build_day_report(&ranges, day, width)
    }

    /// Ranges covering `[reference, reference + 1 day)` from the one or two
    /// most recent source files.
    pub async fn collect_ranges(&self, reference: i64) -> Result<Vec<Range>> {
        let end = reference.saturating_add(defaults::SECONDS_PER_DAY);
        let names = self.source.list_files().await?;
        let device = &self.config.device_id;

        let latest = match select_recent(&names, device, 1) {
            Some(name) => name,
            None => {
                warn!("No source files for device {}", device);
                return Ok(Vec::new());
            }
        };
        let mut ranges = self.fetch_ranges(&latest, reference, end).await?;

        // The latest file starts after the window opens, so the previous
        // file holds the start of the day.
        if starts_after(&ranges, reference) {
            if let Some(previous) = select_recent(&names, device, 2) {
                debug!("{} starts late, also reading {}", latest, previous);
                ranges.extend(self.fetch_ranges(&previous, reference, end).await?);
            }
        }

        Ok(ranges)
    }

    /// A file that fails to decode contributes no ranges.
    async fn fetch_ranges(&self, name: &str, start: i64, end: i64) -> Result<Vec<Range>> {
        self.source.refresh(name).await?;
        let bytes = self.source.fetch_window(name, start, end).await?;

        match extract_long_log_ranges(&bytes) {
            Ok(ranges) => {
                debug!("{}: {} ranges from {} bytes", name, ranges.len(), bytes.len());
                Ok(ranges)
            }
            Err(e) => {
                warn!("Skipping {}: {}", name, e);
                Ok(Vec::new())
            }
        }
    }
}
