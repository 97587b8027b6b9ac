//! # Raw-sample ("WLG") format
//!
//! ```text
//! 16 + (4 + T)*M + 2*N bytes for M frames and N samples
//!
//!   per frame:
//!      4 bytes    frame length, u32 (includes the file header on frame 0)
//!      16 bytes   opaque file header, first frame only
//!      n bytes    i16 samples, interleaved Lmax, Leq, Lmin triples
//!      T bytes    trailer (192, or 180 when the user id is absent)
//!
//!   trailer:
//!      0-15       opaque (two 8-byte fields)
//!      16-18      reserved
//!      19-31      model            (length byte + 12 chars)
//!      32-39      firmware         (length byte + 7 chars)
//!      40-65      serial number    (length byte + 25 chars)
//!      66-96      birth time text  (length byte + 30 chars)
//!      97-127     calibration text (length byte + 30 chars)
//!      128-139    user id          (length byte + 11 chars, standard layout only)
//!      +16        opaque
//!      +4         instrument tz, i32
//!      +8 +8 +8   start, server and meter time, u64
//!      +4         opaque
//!      +4         reserved
//! ```
//!
//! Samples are on a linear integer scale; use [`raw_to_decibels`] to
//! convert them. The trailer is carried for diagnostics only.

use super::Metric;
use crate::cursor::{ByteCursor, ByteWriter};
use crate::defaults;
use crate::error::{DecodeError, DecodeResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const FRAME_LEN_LEN: usize = 4;
pub const FILE_HEADER_LEN: usize = 16;
pub const SAMPLE_LEN: usize = 2;

/// Total length of the one known file shape whose trailers omit the user id.
pub const SHORT_SAMPLE_FILE_LEN: usize = 362;

/// Trailer shape, selected once per file from its total length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrailerLayout {
    Standard,
    WithoutUserId,
}

impl TrailerLayout {
    pub fn for_file_len(len: usize) -> Self {
        if len == SHORT_SAMPLE_FILE_LEN {
            TrailerLayout::WithoutUserId
        } else {
            TrailerLayout::Standard
        }
    }

    pub fn trailer_len(self) -> usize {
        match self {
            TrailerLayout::Standard => 192,
            TrailerLayout::WithoutUserId => 180,
        }
    }
}

/// Descriptive trailer closing every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTrailer {
    pub opaque_a: [u8; 8],
    pub opaque_b: [u8; 8],
    pub reserved: [u8; 3],
    pub model: String,
    pub firmware: String,
    pub serial_number: String,
    pub birth_text: String,
    pub calibration_text: String,
    pub user_id: Option<String>,
    pub opaque_c: [u8; 16],
    pub timezone_offset: i32,
    pub start_time: u64,
    pub server_time: u64,
    pub meter_time: u64,
    pub opaque_d: [u8; 4],
    pub reserved_tail: [u8; 4],
}

impl Default for RawTrailer {
    fn default() -> Self {
        Self {
            opaque_a: [0; 8],
            opaque_b: [0; 8],
            reserved: [0; 3],
            model: String::new(),
            firmware: String::new(),
            serial_number: String::new(),
            birth_text: String::new(),
            calibration_text: String::new(),
            user_id: None,
            opaque_c: [0; 16],
            timezone_offset: 0,
            start_time: 0,
            server_time: 0,
            meter_time: 0,
            opaque_d: [0; 4],
            reserved_tail: [0; 4],
        }
    }
}

/// One self-delimited frame of samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    /// Present on the first frame only.
    pub file_header: Option<[u8; 16]>,
    /// Interleaved Lmax, Leq, Lmin values on the raw integer scale.
    pub samples: Vec<i16>,
    pub trailer: RawTrailer,
}

impl RawFrame {
    /// Complete `(lmax, leq, lmin)` triples; a dangling partial triple is skipped.
    pub fn triples(&self) -> impl Iterator<Item = (i16, i16, i16)> + '_ {
        self.samples.chunks_exact(3).map(|t| (t[0], t[1], t[2]))
    }

    /// All values of one metric, in order.
    pub fn metric_values(&self, metric: Metric) -> impl Iterator<Item = i16> + '_ {
        let column = match metric {
            Metric::Lmax => 0,
            Metric::Leq => 1,
            Metric::Lmin => 2,
        };
        self.samples.chunks_exact(3).map(move |t| t[column])
    }
}

/// A fully decoded raw-sample file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSampleFile {
    pub trailer_layout: TrailerLayout,
    pub frames: Vec<RawFrame>,
}

impl RawSampleFile {
    pub fn sample_count(&self) -> usize {
        self.frames.iter().map(|f| f.samples.len()).sum()
    }

    /// Re-encode the file. The first frame always carries a file header
    /// (zeroed if none was recorded).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        for (index, frame) in self.frames.iter().enumerate() {
            let payload = frame.samples.len() * SAMPLE_LEN;
            if index == 0 {
                w.write_u32((payload + FILE_HEADER_LEN) as u32);
                w.write_bytes(&frame.file_header.unwrap_or([0; FILE_HEADER_LEN]));
            } else {
                w.write_u32(payload as u32);
            }
            for &sample in &frame.samples {
                w.write_i16(sample);
            }
            encode_trailer(&mut w, &frame.trailer, self.trailer_layout);
        }
        w.into_bytes()
    }
}

/// Convert a raw sample to decibels.
pub fn raw_to_decibels(raw: i16) -> f64 {
    defaults::RAW_DB_OFFSET + f64::from(raw) / defaults::RAW_DB_SCALE
}

/// Byte length a well-formed file must have for the given counts.
pub fn expected_len(layout: TrailerLayout, frame_count: usize, sample_count: usize) -> usize {
    FILE_HEADER_LEN
        + (FRAME_LEN_LEN + layout.trailer_len()) * frame_count
        + SAMPLE_LEN * sample_count
}

/// Decode a complete raw-sample buffer. An empty buffer holds no frames.
pub fn decode_raw_samples(bytes: &[u8]) -> DecodeResult<RawSampleFile> {
    let layout = TrailerLayout::for_file_len(bytes.len());
    let mut cursor = ByteCursor::new(bytes);
    let mut frames = Vec::new();

    while !cursor.is_empty() {
        frames.push(decode_frame(&mut cursor, layout, frames.is_empty())?);
    }

    let file = RawSampleFile {
        trailer_layout: layout,
        frames,
    };
    if file.frames.is_empty() {
        return Ok(file);
    }

    let frame_count = file.frames.len();
    let sample_count = file.sample_count();
    if bytes.len() != expected_len(layout, frame_count, sample_count) {
        return Err(DecodeError::MalformedFile {
            raw_len: bytes.len(),
            sync_count: 0,
            record_count: frame_count,
            sample_count,
        });
    }

    debug!(?layout, frame_count, sample_count, "decoded raw-sample file");
    Ok(file)
}

fn decode_frame(
    cursor: &mut ByteCursor<'_>,
    layout: TrailerLayout,
    first: bool,
) -> DecodeResult<RawFrame> {
    let offset = cursor.position();
    let length = cursor.read_u32()?;

    let (file_header, payload_len) = if first {
        let header: [u8; FILE_HEADER_LEN] = cursor.read_array()?;
        let payload_len = (length as usize)
            .checked_sub(FILE_HEADER_LEN)
            .ok_or(DecodeError::InvalidFrameLength { offset, length })?;
        (Some(header), payload_len)
    } else {
        (None, length as usize)
    };

    let payload = cursor.read_fixed(payload_len)?;
    let samples = payload
        .chunks_exact(SAMPLE_LEN)
        .map(|pair| i16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    Ok(RawFrame {
        file_header,
        samples,
        trailer: decode_trailer(cursor, layout)?,
    })
}

fn decode_trailer(cursor: &mut ByteCursor<'_>, layout: TrailerLayout) -> DecodeResult<RawTrailer> {
    Ok(RawTrailer {
        opaque_a: cursor.read_array()?,
        opaque_b: cursor.read_array()?,
        reserved: cursor.read_array()?,
        model: cursor.read_counted_text(12)?,
        firmware: cursor.read_counted_text(7)?,
        serial_number: cursor.read_counted_text(25)?,
        birth_text: cursor.read_counted_text(30)?,
        calibration_text: cursor.read_counted_text(30)?,
        user_id: match layout {
            TrailerLayout::Standard => Some(cursor.read_counted_text(11)?),
            TrailerLayout::WithoutUserId => None,
        },
        opaque_c: cursor.read_array()?,
        timezone_offset: cursor.read_i32()?,
        start_time: cursor.read_u64()?,
        server_time: cursor.read_u64()?,
        meter_time: cursor.read_u64()?,
        opaque_d: cursor.read_array()?,
        reserved_tail: cursor.read_array()?,
    })
}

fn encode_trailer(w: &mut ByteWriter, trailer: &RawTrailer, layout: TrailerLayout) {
    w.write_bytes(&trailer.opaque_a);
    w.write_bytes(&trailer.opaque_b);
    w.write_bytes(&trailer.reserved);
    w.write_counted_text(&trailer.model, 12);
    w.write_counted_text(&trailer.firmware, 7);
    w.write_counted_text(&trailer.serial_number, 25);
    w.write_counted_text(&trailer.birth_text, 30);
    w.write_counted_text(&trailer.calibration_text, 30);
    if layout == TrailerLayout::Standard {
        w.write_counted_text(trailer.user_id.as_deref().unwrap_or(""), 11);
    }
    w.write_bytes(&trailer.opaque_c);
    w.write_i32(trailer.timezone_offset);
    w.write_u64(trailer.start_time);
    w.write_u64(trailer.server_time);
    w.write_u64(trailer.meter_time);
    w.write_bytes(&trailer.opaque_d);
    w.write_bytes(&trailer.reserved_tail);
}
