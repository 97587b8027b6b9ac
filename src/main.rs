//! # Acoustic Sync - Main Entry Point
//!
//! Command-line front end for the decoders and the day-sync cycle:
//!
//! 1. **Initialize logging**: colorized tracing output on stderr
//! 2. **Parse arguments**: subcommand and options, validated up front
//! 3. **Dispatch**: inspect a file, build one report from local files, or
//!    run a sync cycle between a source and a report directory
//!
//! Report CSV and file dumps go to stdout; everything else is logged.

use acoustic_sync::{
    cli::{Args, Command},
    decode_long_log, decode_raw_samples,
    dump::{dump_long_log, dump_raw},
    extract_long_log_ranges,
    logging::init_logging,
    results::render_csv,
    source::DirectorySource,
    store::DirectoryReportStore,
    sync::{build_day_report, DaySync},
    Range,
};
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    info!("Starting Acoustic Sync {}", acoustic_sync::VERSION);

    if let Err(e) = run(args.command).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(command: Command) -> Result<()> {
    // Reject bucket widths that do not split a day before touching any file
    command.validate()?;

    let sync_config = command.sync_config();
    match command {
        Command::InspectLong {
            file,
            json,
            samples,
        } => {
            // Inspect: decode one file and print it as JSON or text
            let bytes = read_file(&file).await?;
            let decoded = decode_long_log(&bytes)
                .with_context(|| format!("Failed to decode {}", file.display()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&decoded)?);
            } else {
                print!("{}", dump_long_log(&decoded, samples)?);
            }
        }
        Command::InspectRaw {
            file,
            json,
            samples,
        } => {
            let bytes = read_file(&file).await?;
            let decoded = decode_raw_samples(&bytes)
                .with_context(|| format!("Failed to decode {}", file.display()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&decoded)?);
            } else {
                print!("{}", dump_raw(&decoded, samples)?);
            }
        }
        Command::Report {
            files,
            day,
            bucket_width,
            output,
        } => {
            run_report(&files, day, bucket_width, output.as_deref()).await?;
        }
        Command::Sync {
            source_dir,
            report_dir,
            now,
            ..
        } => {
            // Sync: today, plus yesterday early in the morning
            let config = sync_config.context("Missing sync configuration")?;
            info!(
                "Syncing device {} from {} into {}",
                config.device_id,
                source_dir.display(),
                report_dir.display()
            );

            let sync = DaySync::new(
                DirectorySource::new(&source_dir),
                DirectoryReportStore::new(&report_dir),
                config,
            );
            for written in sync.run(now.unwrap_or_else(Utc::now)).await? {
                println!("{}", written);
            }
        }
    }
    Ok(())
}

/// Decode every readable file, aggregate `day` and emit CSV.
async fn run_report(
    files: &[PathBuf],
    day: NaiveDate,
    bucket_width: u32,
    output: Option<&Path>,
) -> Result<()> {
    // Unreadable or undecodable files are skipped, the rest still count
    let mut ranges: Vec<Range> = Vec::new();
    for file in files {
        let bytes = match read_file(file).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping {}: {:#}", file.display(), e);
                continue;
            }
        };
        match extract_long_log_ranges(&bytes) {
            Ok(found) => {
                info!("{}: {} ranges", file.display(), found.len());
                ranges.extend(found);
            }
            Err(e) => warn!("Skipping {}: {}", file.display(), e),
        }
    }

    let rows = build_day_report(&ranges, day, bucket_width)?;
    let csv = render_csv(&rows)?;

    // Write to file or stdout
    match output {
        Some(path) => {
            tokio::fs::write(path, &csv)
                .await
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            info!("Wrote {} rows to {}", rows.len(), path.display());
        }
        None => print!("{}", csv),
    }
    Ok(())
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}
