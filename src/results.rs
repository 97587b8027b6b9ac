//! # Report Assembly
//!
//! Turns bucket summaries into labelled daily report rows and writes them
//! through a [`RowSink`]. The CSV sink is the only one the binary uses;
//! column order is fixed by [`REPORT_COLUMNS`].

use crate::metrics::{Exceedance, SummaryRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Report columns, in output order.
pub const REPORT_COLUMNS: [&str; 9] = [
    "Time", "LAeq", "LAFmax", "LAFmin", "LAF01", "LAF10", "LAF50", "LAF90", "LAF99",
];

/// One row of a daily report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub bucket_index: i64,
    pub time: DateTime<Utc>,
    pub laeq: f64,
    pub lafmax: f64,
    pub lafmin: f64,
    pub laf01: f64,
    pub laf10: f64,
    pub laf50: f64,
    pub laf90: f64,
    pub laf99: f64,
}

impl ReportRow {
    /// Label a summary with the wall-clock start of its bucket.
    pub fn from_summary(
        record: &SummaryRecord,
        day_start: DateTime<Utc>,
        bucket_width: u32,
    ) -> Self {
        Self {
            bucket_index: record.bucket_index,
            time: day_start + Duration::seconds(record.bucket_index * i64::from(bucket_width)),
            laeq: record.laeq,
            lafmax: record.lafmax,
            lafmin: record.lafmin,
            laf01: record.percentile(Exceedance::F01),
            laf10: record.percentile(Exceedance::F10),
            laf50: record.percentile(Exceedance::F50),
            laf90: record.percentile(Exceedance::F90),
            laf99: record.percentile(Exceedance::F99),
        }
    }

    /// Text fields in [`REPORT_COLUMNS`] order.
    pub fn fields(&self) -> [String; 9] {
        [
            self.time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            format!("{:.2}", self.laeq),
            format!("{:.2}", self.lafmax),
            format!("{:.2}", self.lafmin),
            format!("{:.2}", self.laf01),
            format!("{:.2}", self.laf10),
            format!("{:.2}", self.laf50),
            format!("{:.2}", self.laf90),
            format!("{:.2}", self.laf99),
        ]
    }
}

/// Order summaries chronologically and label them.
pub fn assemble_report(
    mut records: Vec<SummaryRecord>,
    day_start: DateTime<Utc>,
    bucket_width: u32,
) -> Vec<ReportRow> {
    records.sort_by_key(|r| r.bucket_index);
    records
        .iter()
        .map(|r| ReportRow::from_summary(r, day_start, bucket_width))
        .collect()
}

/// Destination for report rows.
pub trait RowSink {
    fn write_header(&mut self, columns: &[&str]) -> Result<()>;

    fn write_row(&mut self, row: &ReportRow) -> Result<()>;

    /// Flush anything buffered.
    fn finish(&mut self) -> Result<()>;
}

/// [`RowSink`] writing CSV text through the `csv` crate.
pub struct CsvRowSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvRowSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
        }
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e.error()))
    }
}

impl<W: Write> RowSink for CsvRowSink<W> {
    fn write_header(&mut self, columns: &[&str]) -> Result<()> {
        self.writer
            .write_record(columns)
            .context("Failed to write CSV header")
    }

    fn write_row(&mut self, row: &ReportRow) -> Result<()> {
        self.writer
            .write_record(row.fields())
            .with_context(|| format!("Failed to write CSV row for {}", row.time))
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush CSV writer")
    }
}

/// Write the header and every row to `sink`.
pub fn write_report<S: RowSink + ?Sized>(rows: &[ReportRow], sink: &mut S) -> Result<()> {
    sink.write_header(&REPORT_COLUMNS)?;
    for row in rows {
        sink.write_row(row)?;
    }
    sink.finish()
}

/// Render a complete report as CSV text.
pub fn render_csv(rows: &[ReportRow]) -> Result<String> {
    let mut sink = CsvRowSink::new(Vec::new());
    write_report(rows, &mut sink)?;
    let bytes = sink.into_inner()?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

/// Number of data rows (excluding the header) in a rendered report.
pub fn count_data_rows(csv_text: &str) -> usize {
    csv_text.lines().count().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::PercentileValue;
    use chrono::TimeZone;

    fn record(bucket_index: i64, laeq: f64) -> SummaryRecord {
        SummaryRecord {
            bucket_index,
            sample_count: 600,
            laeq,
            lafmax: laeq + 10.0,
            lafmin: laeq - 10.0,
            percentiles: Exceedance::ALL.map(|level| PercentileValue {
                level,
                value_db: laeq,
            }),
        }
    }

    fn day() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 10, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_rows_are_sorted_and_labelled() {
        let rows = assemble_report(vec![record(2, 52.0), record(0, 50.0)], day(), 600);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].bucket_index, 0);
        assert_eq!(rows[0].time, day());
        assert_eq!(rows[1].bucket_index, 2);
        assert_eq!(rows[1].time, Utc.with_ymd_and_hms(2020, 3, 10, 0, 20, 0).unwrap());
    }

    #[test]
    fn test_row_columns_match_levels() {
        let mut summary = record(0, 55.0);
        for entry in summary.percentiles.iter_mut() {
            entry.value_db = entry.level.percent() as f64;
        }
        let row = ReportRow::from_summary(&summary, day(), 600);

        assert_eq!(
            [row.laf01, row.laf10, row.laf50, row.laf90, row.laf99],
            [1.0, 10.0, 50.0, 90.0, 99.0]
        );
        assert!(row.fields().iter().all(|f| f != "NaN"));
    }

    #[test]
    fn test_render_csv() {
        let rows = assemble_report(vec![record(1, 55.0)], day(), 600);
        let csv = render_csv(&rows).unwrap();

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Time,LAeq,LAFmax,LAFmin,LAF01,LAF10,LAF50,LAF90,LAF99");
        assert_eq!(
            lines[1],
            "2020-03-10 00:10:00 UTC,55.00,65.00,45.00,55.00,55.00,55.00,55.00,55.00"
        );
        assert_eq!(count_data_rows(&csv), 1);
    }

    #[test]
    fn test_empty_report_has_header_only() {
        let csv = render_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert_eq!(count_data_rows(&csv), 0);
        assert_eq!(count_data_rows(""), 0);
    }

    struct CollectingSink {
        header: Vec<String>,
        rows: Vec<[String; 9]>,
        finished: bool,
    }

    impl RowSink for CollectingSink {
        fn write_header(&mut self, columns: &[&str]) -> Result<()> {
            self.header = columns.iter().map(|c| c.to_string()).collect();
            Ok(())
        }

        fn write_row(&mut self, row: &ReportRow) -> Result<()> {
            self.rows.push(row.fields());
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    #[test]
    fn test_custom_sink() {
        let mut sink = CollectingSink {
            header: Vec::new(),
            rows: Vec::new(),
            finished: false,
        };
        let rows = assemble_report(vec![record(0, 57.4)], day(), 600);
        write_report(&rows, &mut sink).unwrap();

        assert_eq!(sink.header.len(), 9);
        assert_eq!(sink.rows[0][1], "57.40");
        assert!(sink.finished);
    }
}
