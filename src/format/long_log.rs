//! # Long-log ("WLS") format
//!
//! ```text
//! 86 + 4 + W*M + (23 + 3*16)*R + 4*N bytes
//!
//!   86 byte header
//!      0-2    signature "WLS"
//!      3      version
//!      4-6    reserved (always zero)
//!      7-19   model            (length byte + 12 chars)
//!      20-45  serial number    (length byte + 25 chars)
//!      46-53  firmware         (length byte + 7 chars)
//!      54-65  user id          (length byte + 11 chars)
//!      66-73  birth time       u64
//!      74-81  calibration time u64
//!      82-85  sync detail count M, u32
//!   M sync details, W = 16 bytes (v1) or 20 bytes (v2+)
//!      0-7    server time      u64
//!      8-15   drift in ppm     f64
//!      16-19  signal strength  f32 (v2+ only)
//!   4 byte range count R, u32
//!   R ranges
//!      23 byte range header
//!         0-7    start time       u64
//!         8-18   opaque
//!         19-22  instrument tz    i32
//!      then for each of Lmax, Leq, Lmin:
//!         16 byte metric header (12 opaque + u32 sample count)
//!         4*count bytes of f32 samples (decibels)
//! ```
//!
//! All integers and floats are big-endian; absolute times are seconds
//! since 1904-01-01 UTC (see [`crate::abstime`]).

use super::Metric;
use crate::cursor::{ByteCursor, ByteWriter};
use crate::error::{DecodeError, DecodeResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Expected file marker.
pub const SIGNATURE: [u8; 3] = *b"WLS";
pub const HEADER_LEN: usize = 86;
pub const RANGE_COUNT_LEN: usize = 4;
pub const RANGE_HEADER_LEN: usize = 23;
pub const METRIC_HEADER_LEN: usize = 16;
pub const SAMPLE_LEN: usize = 4;

/// Width of one sync detail record, chosen once from the header version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncLayout {
    /// Version 1: server time + drift.
    Basic,
    /// Version 2 and later: adds a trailing signal-strength float.
    WithSignalStrength,
}

impl SyncLayout {
    pub fn for_version(version: u8) -> Self {
        match version {
            1 => SyncLayout::Basic,
            _ => SyncLayout::WithSignalStrength,
        }
    }

    pub fn record_len(self) -> usize {
        match self {
            SyncLayout::Basic => 16,
            SyncLayout::WithSignalStrength => 20,
        }
    }
}

/// Fixed 86-byte file header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHeader {
    pub signature: [u8; 3],
    pub version: u8,
    pub reserved: [u8; 3],
    pub model: String,
    pub serial_number: String,
    pub firmware: String,
    pub user_id: String,
    /// Very close to the instrument's date of manufacture.
    pub birth_time: u64,
    /// Close to the last calibration.
    pub calibration_time: u64,
    pub sync_count: u32,
}

impl FileHeader {
    pub fn sync_layout(&self) -> SyncLayout {
        SyncLayout::for_version(self.version)
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            signature: SIGNATURE,
            version: 1,
            reserved: [0; 3],
            model: String::new(),
            serial_number: String::new(),
            firmware: String::new(),
            user_id: String::new(),
            birth_time: 0,
            calibration_time: 0,
            sync_count: 0,
        }
    }
}

/// One periodic clock-synchronisation event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncDetail {
    pub server_time: u64,
    pub drift_ppm: f64,
    pub signal_strength: Option<f32>,
}

/// One metric block of a range: opaque sub-header bytes, declared count
/// and the decoded samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub opaque: [u8; 12],
    pub declared_count: u32,
    pub samples: Vec<f32>,
}

impl MetricSeries {
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            opaque: [0; 12],
            declared_count: samples.len() as u32,
            samples,
        }
    }
}

/// A contiguous run of one-second samples between two sync events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Range {
    /// Absolute start time of the first sample.
    pub start_time: u64,
    pub opaque: [u8; 11],
    pub timezone_offset: i32,
    pub lmax: MetricSeries,
    pub leq: MetricSeries,
    pub lmin: MetricSeries,
}

impl Range {
    pub fn new(start_time: u64, lmax: Vec<f32>, leq: Vec<f32>, lmin: Vec<f32>) -> Self {
        Self {
            start_time,
            opaque: [0; 11],
            timezone_offset: 0,
            lmax: MetricSeries::new(lmax),
            leq: MetricSeries::new(leq),
            lmin: MetricSeries::new(lmin),
        }
    }

    pub fn series(&self, metric: Metric) -> &MetricSeries {
        match metric {
            Metric::Lmax => &self.lmax,
            Metric::Leq => &self.leq,
            Metric::Lmin => &self.lmin,
        }
    }

    fn series_mut(&mut self, metric: Metric) -> &mut MetricSeries {
        match metric {
            Metric::Lmax => &mut self.lmax,
            Metric::Leq => &mut self.leq,
            Metric::Lmin => &mut self.lmin,
        }
    }

    /// Number of one-second samples in the range, as declared by the Leq block.
    pub fn sample_count(&self) -> usize {
        self.leq.declared_count as usize
    }

    /// Whether all three metric blocks declare the same sample count.
    pub fn has_uniform_counts(&self) -> bool {
        self.lmax.declared_count == self.leq.declared_count
            && self.leq.declared_count == self.lmin.declared_count
    }
}

/// A fully decoded long-log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongLogFile {
    pub header: FileHeader,
    pub sync_details: Vec<SyncDetail>,
    pub ranges: Vec<Range>,
}

impl LongLogFile {
    /// Total samples declared across every metric block of every range.
    pub fn declared_sample_count(&self) -> usize {
        self.ranges
            .iter()
            .flat_map(|r| Metric::ORDER.into_iter().map(move |m| r.series(m)))
            .map(|s| s.declared_count as usize)
            .sum()
    }

    /// Re-encode the file bit-exactly.
    ///
    /// Counts are taken from the collections rather than from the stored
    /// header / declared fields so the output always decodes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let layout = self.header.sync_layout();
        let samples: usize = self
            .ranges
            .iter()
            .flat_map(|r| Metric::ORDER.into_iter().map(move |m| r.series(m).samples.len()))
            .sum();
        let mut w = ByteWriter::with_capacity(expected_len(
            layout,
            self.sync_details.len(),
            self.ranges.len(),
            samples,
        ));

        let h = &self.header;
        w.write_bytes(&h.signature);
        w.write_u8(h.version);
        w.write_bytes(&h.reserved);
        w.write_counted_text(&h.model, 12);
        w.write_counted_text(&h.serial_number, 25);
        w.write_counted_text(&h.firmware, 7);
        w.write_counted_text(&h.user_id, 11);
        w.write_u64(h.birth_time);
        w.write_u64(h.calibration_time);
        w.write_u32(self.sync_details.len() as u32);

        for detail in &self.sync_details {
            w.write_u64(detail.server_time);
            w.write_f64(detail.drift_ppm);
            if layout == SyncLayout::WithSignalStrength {
                w.write_f32(detail.signal_strength.unwrap_or(0.0));
            }
        }

        w.write_u32(self.ranges.len() as u32);
        for range in &self.ranges {
            w.write_u64(range.start_time);
            w.write_bytes(&range.opaque);
            w.write_i32(range.timezone_offset);
            for metric in Metric::ORDER {
                let series = range.series(metric);
                w.write_bytes(&series.opaque);
                w.write_u32(series.samples.len() as u32);
                for &sample in &series.samples {
                    w.write_f32(sample);
                }
            }
        }

        w.into_bytes()
    }
}

/// Byte length a well-formed file must have for the given counts.
pub fn expected_len(
    layout: SyncLayout,
    sync_count: usize,
    range_count: usize,
    sample_count: usize,
) -> usize {
    HEADER_LEN
        + RANGE_COUNT_LEN
        + layout.record_len() * sync_count
        + (RANGE_HEADER_LEN + 3 * METRIC_HEADER_LEN) * range_count
        + SAMPLE_LEN * sample_count
}

/// Decode a complete long-log buffer.
///
/// Sample blocks are bounded by the bytes actually present; any shortfall
/// against the declared counts surfaces in the final size check as
/// [`DecodeError::MalformedFile`]. A range whose metric blocks declare
/// different counts is malformed too.
pub fn decode_long_log(bytes: &[u8]) -> DecodeResult<LongLogFile> {
    let mut cursor = ByteCursor::new(bytes);

    let header = decode_header(&mut cursor)?;
    let layout = header.sync_layout();

    let sync_count = header.sync_count as usize;
    let mut sync_details =
        Vec::with_capacity(sync_count.min(cursor.remaining_len() / layout.record_len()));
    for _ in 0..sync_count {
        sync_details.push(decode_sync_detail(&mut cursor, layout)?);
    }

    let range_count = cursor.read_u32()? as usize;
    let mut ranges = Vec::with_capacity(
        range_count.min(cursor.remaining_len() / (RANGE_HEADER_LEN + 3 * METRIC_HEADER_LEN)),
    );
    for _ in 0..range_count {
        ranges.push(decode_range(&mut cursor)?);
    }

    let file = LongLogFile {
        header,
        sync_details,
        ranges,
    };

    let sample_count = file.declared_sample_count();
    let size_matches = bytes.len() == expected_len(layout, sync_count, range_count, sample_count);
    if !size_matches || !file.ranges.iter().all(Range::has_uniform_counts) {
        return Err(DecodeError::MalformedFile {
            raw_len: bytes.len(),
            sync_count,
            record_count: range_count,
            sample_count,
        });
    }

    debug!(
        version = file.header.version,
        sync_count, range_count, sample_count, "decoded long-log file"
    );
    Ok(file)
}

fn decode_header(cursor: &mut ByteCursor<'_>) -> DecodeResult<FileHeader> {
    let signature: [u8; 3] = cursor.read_array()?;
    if signature != SIGNATURE {
        return Err(DecodeError::BadSignature { found: signature });
    }

    Ok(FileHeader {
        signature,
        version: cursor.read_u8()?,
        reserved: cursor.read_array()?,
        model: cursor.read_counted_text(12)?,
        serial_number: cursor.read_counted_text(25)?,
        firmware: cursor.read_counted_text(7)?,
        user_id: cursor.read_counted_text(11)?,
        birth_time: cursor.read_u64()?,
        calibration_time: cursor.read_u64()?,
        sync_count: cursor.read_u32()?,
    })
}

fn decode_sync_detail(cursor: &mut ByteCursor<'_>, layout: SyncLayout) -> DecodeResult<SyncDetail> {
    let server_time = cursor.read_u64()?;
    let drift_ppm = cursor.read_f64()?;
    let signal_strength = match layout {
        SyncLayout::Basic => None,
        SyncLayout::WithSignalStrength => Some(cursor.read_f32()?),
    };
    Ok(SyncDetail {
        server_time,
        drift_ppm,
        signal_strength,
    })
}

fn decode_range(cursor: &mut ByteCursor<'_>) -> DecodeResult<Range> {
    let mut range = Range {
        start_time: cursor.read_u64()?,
        opaque: cursor.read_array()?,
        timezone_offset: cursor.read_i32()?,
        lmax: MetricSeries::new(Vec::new()),
        leq: MetricSeries::new(Vec::new()),
        lmin: MetricSeries::new(Vec::new()),
    };

    for metric in Metric::ORDER {
        *range.series_mut(metric) = decode_series(cursor)?;
    }
    Ok(range)
}

fn decode_series(cursor: &mut ByteCursor<'_>) -> DecodeResult<MetricSeries> {
    let opaque: [u8; 12] = cursor.read_array()?;
    let declared_count = cursor.read_u32()?;

    let available = (declared_count as usize).min(cursor.remaining_len() / SAMPLE_LEN);
    let mut samples = Vec::with_capacity(available);
    for _ in 0..available {
        samples.push(cursor.read_f32()?);
    }

    Ok(MetricSeries {
        opaque,
        declared_count,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file(version: u8) -> LongLogFile {
        let header = FileHeader {
            version,
            model: "LxT1".to_string(),
            serial_number: "0004321".to_string(),
            firmware: "2.404".to_string(),
            user_id: "site-a".to_string(),
            birth_time: 3_500_000_000,
            calibration_time: 3_600_000_000,
            sync_count: 2,
            ..FileHeader::default()
        };
        let signal = if version == 1 { None } else { Some(-71.5) };
        let sync_details = vec![
            SyncDetail {
                server_time: 3_700_000_000,
                drift_ppm: 1.5,
                signal_strength: signal,
            },
            SyncDetail {
                server_time: 3_700_003_600,
                drift_ppm: -0.25,
                signal_strength: signal,
            },
        ];
        let mut first = Range::new(
            3_700_000_000,
            vec![61.0, 62.5],
            vec![55.0, 56.25],
            vec![50.0, 49.5],
        );
        first.opaque = [7; 11];
        first.timezone_offset = -18_000;
        first.leq.opaque = [0xab; 12];
        let second = Range::new(3_700_003_600, vec![70.0], vec![65.0], vec![60.0]);

        LongLogFile {
            header,
            sync_details,
            ranges: vec![first, second],
        }
    }

    #[test]
    fn test_decode_round_trip_v1() {
        let file = sample_file(1);
        let bytes = file.to_bytes();
        assert_eq!(bytes.len(), expected_len(SyncLayout::Basic, 2, 2, 9));

        let decoded = decode_long_log(&bytes).unwrap();
        assert_eq!(decoded, file);
    }

    #[test]
    fn test_decode_round_trip_v2_uses_wider_sync_records() {
        let file = sample_file(2);
        let bytes = file.to_bytes();
        assert_eq!(bytes.len(), sample_file(1).to_bytes().len() + 2 * 4);

        let decoded = decode_long_log(&bytes).unwrap();
        assert_eq!(decoded.sync_details[0].signal_strength, Some(-71.5));
        assert_eq!(decoded, file);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let bytes = sample_file(1).to_bytes();
        assert_eq!(decode_long_log(&bytes).unwrap(), decode_long_log(&bytes).unwrap());
    }

    #[test]
    fn test_header_is_86_bytes() {
        let file = LongLogFile {
            header: FileHeader::default(),
            sync_details: Vec::new(),
            ranges: Vec::new(),
        };
        let bytes = file.to_bytes();
        assert_eq!(bytes.len(), HEADER_LEN + RANGE_COUNT_LEN);
        assert_eq!(&bytes[82..86], &[0, 0, 0, 0]);

        let decoded = decode_long_log(&bytes).unwrap();
        assert!(decoded.ranges.is_empty());
    }

    #[test]
    fn test_truncated_last_sample_is_malformed() {
        let mut bytes = sample_file(1).to_bytes();
        let full_len = bytes.len();
        bytes.truncate(full_len - SAMPLE_LEN);

        let err = decode_long_log(&bytes).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MalformedFile {
                raw_len: full_len - SAMPLE_LEN,
                sync_count: 2,
                record_count: 2,
                sample_count: 9,
            }
        );
    }

    #[test]
    fn test_mismatched_metric_counts_are_malformed() {
        let mut file = sample_file(1);
        file.ranges[0].lmax.samples.push(63.0);
        let bytes = file.to_bytes();
        assert_eq!(bytes.len(), expected_len(SyncLayout::Basic, 2, 2, 10));

        let err = decode_long_log(&bytes).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MalformedFile {
                raw_len: bytes.len(),
                sync_count: 2,
                record_count: 2,
                sample_count: 10,
            }
        );
    }

    #[test]
    fn test_uniform_counts() {
        let mut range = Range::new(0, vec![1.0; 3], vec![1.0; 3], vec![1.0; 3]);
        assert!(range.has_uniform_counts());
        range.lmin.declared_count = 2;
        assert!(!range.has_uniform_counts());
    }

    #[test]
    fn test_trailing_garbage_is_malformed() {
        let mut bytes = sample_file(1).to_bytes();
        bytes.extend_from_slice(&[0, 0]);
        assert!(matches!(
            decode_long_log(&bytes),
            Err(DecodeError::MalformedFile { .. })
        ));
    }

    #[test]
    fn test_truncated_header_fails() {
        let bytes = sample_file(1).to_bytes();
        assert!(matches!(
            decode_long_log(&bytes[..40]),
            Err(DecodeError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn test_bad_signature() {
        let mut bytes = sample_file(1).to_bytes();
        bytes[0] = b'X';
        assert_eq!(
            decode_long_log(&bytes).unwrap_err(),
            DecodeError::BadSignature { found: *b"XLS" }
        );
    }

    #[test]
    fn test_sync_layout_dispatch() {
        assert_eq!(SyncLayout::for_version(1).record_len(), 16);
        assert_eq!(SyncLayout::for_version(2).record_len(), 20);
        assert_eq!(SyncLayout::for_version(5).record_len(), 20);
    }
}
