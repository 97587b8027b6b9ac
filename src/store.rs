//! Report persistence boundary.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the daily report for `device_id`, e.g. `SSND_1453_2020_03_10.csv`.
pub fn report_name(device_id: &str, day: NaiveDate) -> String {
    format!(
        "SSND_{}_{}_{:02}_{:02}.csv",
        device_id,
        day.year(),
        day.month(),
        day.day()
    )
}

/// Where daily reports are kept.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Existing report text, or `None` if there is none yet.
    async fn read_report(&self, name: &str) -> Result<Option<String>>;

    /// Store `body` under `name`, returning an identifier for the stored object.
    async fn write_report(&self, name: &str, body: &str) -> Result<String>;
}

/// [`ReportStore`] writing CSV files into a local directory.
#[derive(Debug, Clone)]
pub struct DirectoryReportStore {
    root: PathBuf,
}

impl DirectoryReportStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ReportStore for DirectoryReportStore {
    async fn read_report(&self, name: &str) -> Result<Option<String>> {
        let path = self.root.join(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read report: {}", path.display()))
            }
        }
    }

    async fn write_report(&self, name: &str, body: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create report directory: {}", self.root.display()))?;

        let path = self.root.join(name);
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        debug!("Wrote {} bytes to {}", body.len(), path.display());
        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_name() {
        let day = NaiveDate::from_ymd_opt(2020, 3, 9).unwrap();
        assert_eq!(report_name("1453", day), "SSND_1453_2020_03_09.csv");
    }

    #[tokio::test]
    async fn test_directory_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryReportStore::new(dir.path().join("reports"));

        assert_eq!(store.read_report("a.csv").await.unwrap(), None);
        let location = store.write_report("a.csv", "Time\n").await.unwrap();
        assert!(location.ends_with("a.csv"));
        assert_eq!(
            store.read_report("a.csv").await.unwrap().as_deref(),
            Some("Time\n")
        );
    }
}
