//! End-to-end report generation from encoded long-log files.

use acoustic_sync::{
    abstime::from_calendar_time,
    extract_long_log_ranges,
    format::long_log::{FileHeader, LongLogFile, SyncDetail},
    results::{count_data_rows, render_csv},
    sync::build_day_report,
    DecodeError, Range,
};
use anyhow::Result;
use chrono::{NaiveDate, TimeZone, Utc};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 3, 10).unwrap()
}

/// 23:55 the evening before, half a bucket ahead of midnight.
fn reference() -> u64 {
    from_calendar_time(Utc.with_ymd_and_hms(2020, 3, 9, 23, 55, 0).unwrap()) as u64
}

fn long_log(version: u8, ranges: Vec<Range>) -> LongLogFile {
    LongLogFile {
        header: FileHeader {
            version,
            model: "LxT1".to_string(),
            serial_number: "0004231".to_string(),
            firmware: "2.402".to_string(),
            user_id: "site-7".to_string(),
            ..FileHeader::default()
        },
        sync_details: vec![SyncDetail {
            server_time: reference(),
            drift_ppm: 1.25,
            signal_strength: (version != 1).then_some(-71.0),
        }],
        ranges,
    }
}

#[test]
fn test_constant_levels_produce_flat_report() -> Result<()> {
    let range = Range::new(
        reference(),
        vec![60.0; 1200],
        vec![55.0; 1200],
        vec![50.0; 1200],
    );
    let bytes = long_log(1, vec![range]).to_bytes();

    let ranges = extract_long_log_ranges(&bytes)?;
    let rows = build_day_report(&ranges, day(), 600)?;
    let csv = render_csv(&rows)?;

    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Time,LAeq,LAFmax,LAFmin,LAF01,LAF10,LAF50,LAF90,LAF99",
            "2020-03-10 00:00:00 UTC,55.00,60.00,50.00,55.00,55.00,55.00,55.00,55.00",
            "2020-03-10 00:10:00 UTC,55.00,60.00,50.00,55.00,55.00,55.00,55.00,55.00",
        ]
    );
    Ok(())
}

#[test]
fn test_ranges_from_two_files_merge_into_one_day() -> Result<()> {
    // Second range starts in the middle of bucket 1 and overlaps nothing.
    let first = long_log(
        2,
        vec![Range::new(
            reference(),
            vec![70.0; 900],
            vec![50.0; 900],
            vec![40.0; 900],
        )],
    );
    let second = long_log(
        2,
        vec![Range::new(
            reference() + 900,
            vec![80.0; 300],
            vec![60.0; 300],
            vec![45.0; 300],
        )],
    );

    let mut ranges = extract_long_log_ranges(&first.to_bytes())?;
    ranges.extend(extract_long_log_ranges(&second.to_bytes())?);
    let rows = build_day_report(&ranges, day(), 600)?;

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].laeq, 50.0);
    assert_eq!(rows[1].lafmax, 80.0);
    assert_eq!(rows[1].lafmin, 40.0);
    // Half the bucket at 50 dB, half at 60 dB.
    assert_eq!(rows[1].laeq, 57.4);
    assert_eq!(rows[1].laf90, 50.0);
    assert_eq!(rows[1].laf10, 60.0);
    Ok(())
}

#[test]
fn test_sparse_bucket_is_dropped() -> Result<()> {
    let bytes = long_log(
        1,
        vec![
            Range::new(reference(), vec![60.0; 3], vec![55.0; 3], vec![50.0; 3]),
            Range::new(reference() + 600, vec![60.0; 4], vec![55.0; 4], vec![50.0; 4]),
        ],
    )
    .to_bytes();

    let rows = build_day_report(&extract_long_log_ranges(&bytes)?, day(), 600)?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].bucket_index, 1);
    Ok(())
}

#[test]
fn test_truncated_file_is_rejected() -> Result<()> {
    let range = Range::new(reference(), vec![60.0; 10], vec![55.0; 10], vec![50.0; 10]);
    let mut bytes = long_log(1, vec![range]).to_bytes();
    bytes.truncate(bytes.len() - 2);

    let err = extract_long_log_ranges(&bytes).unwrap_err();
    assert!(matches!(err, DecodeError::MalformedFile { .. }));
    Ok(())
}

#[test]
fn test_file_without_ranges_yields_header_only_report() -> Result<()> {
    let bytes = long_log(1, Vec::new()).to_bytes();
    let ranges = extract_long_log_ranges(&bytes)?;
    assert!(ranges.is_empty());

    let csv = render_csv(&build_day_report(&ranges, day(), 600)?)?;
    assert_eq!(count_data_rows(&csv), 0);
    Ok(())
}
