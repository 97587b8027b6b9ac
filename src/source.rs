//! Source files and the fetch boundary.
//!
//! The vendor service names long-log files `CID_<device>_<YYYY>_<MM>_<DD>__<HH>h<MM>m<SS>s`.
//! [`SourceFetcher`] abstracts where those files come from; the core only
//! ever sees the returned byte buffers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::debug;

const NAME_PREFIX: &str = "CID_";
const TIMESTAMP_FORMAT: &str = "%Y_%m_%d__%Hh%Mm%Ss";
const TIMESTAMP_LEN: usize = 21;

/// A parsed source file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFileName {
    pub name: String,
    pub device_id: String,
    /// Creation time embedded in the name. Not trusted for coverage.
    pub timestamp: NaiveDateTime,
}

impl SourceFileName {
    /// Parse a name, returning `None` if it does not follow the convention.
    pub fn parse(name: &str) -> Option<Self> {
        let rest = name.strip_prefix(NAME_PREFIX)?;
        let (device_id, stamp) = rest.split_once('_')?;
        if device_id.is_empty() || !device_id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if stamp.len() != TIMESTAMP_LEN {
            return None;
        }
        let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
        Some(Self {
            name: name.to_string(),
            device_id: device_id.to_string(),
            timestamp,
        })
    }
}

/// Pick the `far_back`-th most recent file for `device_id` (1 = latest).
pub fn select_recent(names: &[String], device_id: &str, far_back: usize) -> Option<String> {
    let mut ordered: Vec<SourceFileName> = names
        .iter()
        .filter_map(|n| SourceFileName::parse(n))
        .filter(|n| n.device_id == device_id)
        .collect();
    ordered.sort_by_key(|n| n.timestamp);

    if far_back == 0 || far_back > ordered.len() {
        return None;
    }
    Some(ordered.swap_remove(ordered.len() - far_back).name)
}

/// Where source files come from.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Names of every available source file.
    async fn list_files(&self) -> Result<Vec<String>>;

    /// Ask the source to bring `name` up to date before it is fetched.
    async fn refresh(&self, name: &str) -> Result<()>;

    /// Fetch the bytes of `name` covering `[start, end)` absolute seconds.
    async fn fetch_window(&self, name: &str, start: i64, end: i64) -> Result<Vec<u8>>;
}

/// [`SourceFetcher`] over a local directory of `<name>.wls` files.
///
/// Files are returned whole; the window is applied later when buckets
/// outside the requested day are discarded.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub const EXTENSION: &'static str = "wls";

    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", name, Self::EXTENSION))
    }
}

#[async_trait]
impl SourceFetcher for DirectorySource {
    async fn list_files(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .with_context(|| format!("Failed to read source directory: {}", self.root.display()))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(Self::EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        Ok(names)
    }

    async fn refresh(&self, name: &str) -> Result<()> {
        debug!("Local source {} needs no refresh", name);
        Ok(())
    }

    async fn fetch_window(&self, name: &str, start: i64, end: i64) -> Result<Vec<u8>> {
        let path = self.path_for(name);
        debug!(start, end, "Reading source file {}", path.display());
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read source file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_source_name() {
        let parsed = SourceFileName::parse("CID_1453_2020_03_10__09h44m22s").unwrap();
        assert_eq!(parsed.device_id, "1453");
        assert_eq!(
            parsed.timestamp,
            NaiveDate::from_ymd_opt(2020, 3, 10)
                .unwrap()
                .and_hms_opt(9, 44, 22)
                .unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_other_names() {
        assert!(SourceFileName::parse("CID_1453_2020_03_10").is_none());
        assert!(SourceFileName::parse("XID_1453_2020_03_10__09h44m22s").is_none());
        assert!(SourceFileName::parse("CID_abc_2020_03_10__09h44m22s").is_none());
        assert!(SourceFileName::parse("CID_1453_2020_03_10__09h44m22s.wls").is_none());
    }

    #[test]
    fn test_select_recent() {
        let names: Vec<String> = [
            "CID_1453_2020_03_10__09h44m22s",
            "CID_1453_2020_03_08__23h00m00s",
            "CID_9999_2020_03_11__00h00m00s",
            "CID_1453_2020_03_09__12h00m00s",
            "notes.txt",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        assert_eq!(
            select_recent(&names, "1453", 1).as_deref(),
            Some("CID_1453_2020_03_10__09h44m22s")
        );
        assert_eq!(
            select_recent(&names, "1453", 2).as_deref(),
            Some("CID_1453_2020_03_09__12h00m00s")
        );
        assert_eq!(select_recent(&names, "1453", 4), None);
        assert_eq!(select_recent(&names, "1453", 0), None);
        assert_eq!(select_recent(&names, "42", 1), None);
    }

    #[tokio::test]
    async fn test_directory_source_lists_and_reads() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("CID_1_2020_01_01__00h00m00s.wls"), b"abc").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"ignored").unwrap();

        let source = DirectorySource::new(dir.path());
        let names = source.list_files().await.unwrap();
        assert_eq!(names, vec!["CID_1_2020_01_01__00h00m00s".to_string()]);

        source.refresh(&names[0]).await.unwrap();
        let bytes = source.fetch_window(&names[0], 0, 86_400).await.unwrap();
        assert_eq!(bytes, b"abc");
        assert!(source.fetch_window("missing", 0, 1).await.is_err());
    }
}
