//! Human-readable dumps of decoded files for debugging.
//!
//! Opaque fields are printed as hex, never interpreted.

use crate::abstime::describe;
use crate::format::long_log::{FileHeader, LongLogFile, Range, SyncDetail};
use crate::format::raw::{raw_to_decibels, RawFrame, RawSampleFile, RawTrailer};
use crate::format::{hex, Metric};
use crate::utils::round_to;
use std::fmt::{self, Write};

/// Dump a long-log file. With `with_samples`, every sample triple is listed.
pub fn dump_long_log(file: &LongLogFile, with_samples: bool) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_header(&mut out, &file.header)?;
    write_sync_details(&mut out, &file.sync_details)?;
    for (index, range) in file.ranges.iter().enumerate() {
        write_range(&mut out, index, range, with_samples)?;
    }
    Ok(out)
}

/// Dump a raw-sample file. With `with_samples`, every triple is listed in decibels.
pub fn dump_raw(file: &RawSampleFile, with_samples: bool) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for (index, frame) in file.frames.iter().enumerate() {
        write_frame(&mut out, index, frame, with_samples)?;
    }
    Ok(out)
}

fn write_header(out: &mut impl Write, h: &FileHeader) -> fmt::Result {
    writeln!(out, "====== HEADER =======")?;
    writeln!(out, "sig    = {}", String::from_utf8_lossy(&h.signature))?;
    writeln!(out, "ver    = {}", h.version)?;
    writeln!(out, "zero   = {}", hex(&h.reserved))?;
    writeln!(out, "model  = {}", h.model)?;
    writeln!(out, "serial = {}", h.serial_number)?;
    writeln!(out, "firm   = {}", h.firmware)?;
    writeln!(out, "user   = {}", h.user_id)?;
    writeln!(out, "birth  = {} ({})", h.birth_time, describe(h.birth_time))?;
    writeln!(
        out,
        "config = {} ({})",
        h.calibration_time,
        describe(h.calibration_time)
    )?;
    writeln!(out, "n sync = {}", h.sync_count)
}

fn write_sync_details(out: &mut impl Write, details: &[SyncDetail]) -> fmt::Result {
    if details.is_empty() {
        return Ok(());
    }
    writeln!(out, "====== SYNC DETAILS =======")?;
    for (index, d) in details.iter().enumerate() {
        write!(
            out,
            "{:02}, serv time = {} ({}), drift ppm {}",
            index,
            d.server_time,
            describe(d.server_time),
            d.drift_ppm
        )?;
        if let Some(rssi) = d.signal_strength {
            write!(out, ", rssi {}", rssi)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_range(
    out: &mut impl Write,
    index: usize,
    range: &Range,
    with_samples: bool,
) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "====== RANGE {:03} =======", index)?;
    writeln!(out, "--- RANGE HEADER ---")?;
    writeln!(
        out,
        "start  = {} ({})",
        range.start_time,
        describe(range.start_time)
    )?;
    writeln!(out, "???      {}", hex(&range.opaque))?;
    writeln!(out, "instTZ = {}", range.timezone_offset)?;

    for metric in Metric::ORDER {
        let series = range.series(metric);
        writeln!(out, "--- {} SUB HEADER ---", metric)?;
        writeln!(
            out,
            "??? {}, num samps = {}",
            hex(&series.opaque),
            series.declared_count
        )?;
    }

    if with_samples {
        writeln!(out, "--- SAMPLES ---")?;
        let rows = range
            .lmax
            .samples
            .iter()
            .zip(&range.leq.samples)
            .zip(&range.lmin.samples);
        for ((lmax, leq), lmin) in rows {
            writeln!(out, "{}, {}, {}", lmax, leq, lmin)?;
        }
    }
    Ok(())
}

fn write_frame(
    out: &mut impl Write,
    index: usize,
    frame: &RawFrame,
    with_samples: bool,
) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "====== FRAME {:03} =======", index)?;
    if let Some(header) = &frame.file_header {
        writeln!(out, "--- HEADER : {}", hex(header))?;
    }
    write_trailer(out, &frame.trailer)?;

    if with_samples {
        writeln!(out, "--- SAMPLES ---")?;
        for (lmax, leq, lmin) in frame.triples() {
            writeln!(
                out,
                "{}, {}, {}",
                round_to(raw_to_decibels(lmax), 4),
                round_to(raw_to_decibels(leq), 4),
                round_to(raw_to_decibels(lmin), 4)
            )?;
        }
    }
    Ok(())
}

fn write_trailer(out: &mut impl Write, t: &RawTrailer) -> fmt::Result {
    writeln!(out, "--- TRAILER ---")?;
    writeln!(out, "???    = {}", hex(&t.opaque_a))?;
    writeln!(out, "???    = {}", hex(&t.opaque_b))?;
    writeln!(out, "zero   = {}", hex(&t.reserved))?;
    writeln!(out, "mod    = {}", t.model)?;
    writeln!(out, "firm   = {}", t.firmware)?;
    writeln!(out, "ser    = {}", t.serial_number)?;
    writeln!(out, "t1     = {}", t.birth_text)?;
    writeln!(out, "t2     = {}", t.calibration_text)?;
    if let Some(user) = &t.user_id {
        writeln!(out, "user   = {}", user)?;
    }
    writeln!(out, "????   = {}", hex(&t.opaque_c))?;
    writeln!(out, "instTZ = {}", t.timezone_offset)?;
    writeln!(out, "start  = {} ({})", t.start_time, describe(t.start_time))?;
    writeln!(out, "serv t = {} ({})", t.server_time, describe(t.server_time))?;
    writeln!(out, "metr t = {} ({})", t.meter_time, describe(t.meter_time))?;
    writeln!(out, "???    = {}", hex(&t.opaque_d))?;
    writeln!(out, "zero   = {}", hex(&t.reserved_tail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::raw::TrailerLayout;

    #[test]
    fn test_dump_long_log_lists_ranges() {
        let file = LongLogFile {
            header: FileHeader {
                model: "LxT1".to_string(),
                ..FileHeader::default()
            },
            sync_details: vec![SyncDetail {
                server_time: 0,
                drift_ppm: 0.5,
                signal_strength: None,
            }],
            ranges: vec![Range::new(0, vec![61.0], vec![55.5], vec![50.0])],
        };

        let text = dump_long_log(&file, true).unwrap();
        assert!(text.contains("model  = LxT1"));
        assert!(text.contains("00, serv time = 0 (1904-01-01 00:00:00 UTC), drift ppm 0.5"));
        assert!(text.contains("====== RANGE 000 ======="));
        assert!(text.contains("--- Leq SUB HEADER ---"));
        assert!(text.contains("61, 55.5, 50"));
    }

    #[test]
    fn test_dump_raw_converts_samples() {
        let file = RawSampleFile {
            trailer_layout: TrailerLayout::Standard,
            frames: vec![RawFrame {
                file_header: Some([0; 16]),
                samples: vec![0, -200, 20],
                trailer: RawTrailer::default(),
            }],
        };

        let text = dump_raw(&file, true).unwrap();
        assert!(text.contains("====== FRAME 000 ======="));
        assert!(text.contains("124.7847, 114.7847, 125.7847"));
        assert!(!text.contains("user   ="));
    }

    struct Rejecting;

    impl Write for Rejecting {
        fn write_str(&mut self, _: &str) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[test]
    fn test_write_errors_are_returned() {
        let range = Range::new(0, vec![61.0], vec![55.5], vec![50.0]);
        assert!(write_header(&mut Rejecting, &FileHeader::default()).is_err());
        assert!(write_range(&mut Rejecting, 0, &range, true).is_err());
        assert!(write_trailer(&mut Rejecting, &RawTrailer::default()).is_err());
    }
}
