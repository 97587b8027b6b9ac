use crate::sync::SyncConfig;
use crate::utils::{parse_day, validate_bucket_width};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Acoustic Sync - decode sound level meter logs and build daily reports
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Verbose output (debug logging)
    #[clap(short = 'v', long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a long-log (WLS) file and dump its contents
    InspectLong {
        file: PathBuf,

        /// Emit the decoded structure as JSON
        #[clap(long, default_value_t = false)]
        json: bool,

        /// List every sample triple
        #[clap(long, default_value_t = false)]
        samples: bool,
    },

    /// Decode a raw-sample (WLG) file and dump its contents
    InspectRaw {
        file: PathBuf,

        /// Emit the decoded structure as JSON
        #[clap(long, default_value_t = false)]
        json: bool,

        /// List every sample triple in decibels
        #[clap(long, default_value_t = false)]
        samples: bool,
    },

    /// Build the report for one day from local long-log files
    Report {
        #[clap(required = true, num_args = 1..)]
        files: Vec<PathBuf>,

        /// Day to report on (YYYY-MM-DD, UTC)
        #[clap(long, value_parser = parse_day)]
        day: NaiveDate,

        /// Bucket width in seconds
        #[clap(long, default_value_t = crate::defaults::BUCKET_WIDTH_SECS)]
        bucket_width: u32,

        /// CSV output file (stdout if omitted)
        #[clap(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Run one day-sync cycle between local directories
    Sync {
        /// Directory holding CID_*.wls source files
        #[clap(long)]
        source_dir: PathBuf,

        /// Directory receiving SSND_*.csv reports
        #[clap(long)]
        report_dir: PathBuf,

        /// Instrument id
        #[clap(long, env = "SSND_CID")]
        cid: String,

        /// Current time as RFC 3339 (defaults to the system clock)
        #[clap(long, value_parser = parse_now)]
        now: Option<DateTime<Utc>>,

        /// Bucket width in seconds
        #[clap(long, default_value_t = crate::defaults::BUCKET_WIDTH_SECS)]
        bucket_width: u32,
    },
}

impl Command {
    /// Validate option values clap cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        match self {
            Command::Report { bucket_width, .. } | Command::Sync { bucket_width, .. } => {
                validate_bucket_width(*bucket_width)
            }
            Command::InspectLong { .. } | Command::InspectRaw { .. } => Ok(()),
        }
    }

    /// Sync settings, if this is the `sync` command.
    pub fn sync_config(&self) -> Option<SyncConfig> {
        match self {
            Command::Sync {
                cid, bucket_width, ..
            } => Some(SyncConfig {
                device_id: cid.clone(),
                bucket_width: *bucket_width,
            }),
            _ => None,
        }
    }
}

/// Parse an RFC 3339 timestamp into UTC.
fn parse_now(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("Invalid time '{}': {}", s, e))
}
