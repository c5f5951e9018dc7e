// # File Provider
//
// JSON-document implementation of DnsProvider with crash recovery.
//
// ## Purpose
//
// Keeps the records of any number of zones in one file. Works as a source
// (hand-edited or generated desired state) and as a target (a persistent
// mirror of another backend).
//
// ## Crash Recovery
//
// - Atomic writes: temp file, fsync, then rename over the document
// - Backup: the previous document is copied to `.backup` before each write
// - Recovery: a document that fails to parse falls back to the backup
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "zones": {
//     "example.com": [
//       { "dns_name": "www.example.com", "record_type": "A", "targets": ["192.0.2.1"], "ttl": 300 }
//     ]
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{apply_to, zone_key};
use crate::config::ProviderConfig;
use crate::plan::ChangeSet;
use crate::record::Record;
use crate::traits::{DnsProvider, DnsProviderFactory};
use crate::{Error, Result};

/// Document format version
const FILE_VERSION: &str = "1.0";

/// Serializable document format
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct ZoneFile {
    version: String,
    #[serde(default)]
    zones: BTreeMap<String, Vec<Record>>,
}

/// File-backed provider
///
/// The document is read on every listing, so edits made by other tools
/// are picked up on the next pass. Writes from this process are serialized.
///
/// # Example
///
/// ```rust,no_run
/// use dnssync_core::backends::FileProvider;
/// use dnssync_core::DnsProvider;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let provider = FileProvider::new("/var/lib/dnssync/zones.json");
///     let records = provider.records("example.com").await?;
///     println!("{} records", records.len());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileProvider {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileProvider {
    /// Create a provider for the document at `path`
    ///
    /// Nothing is read until the first listing; a missing file is an empty
    /// document.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, recovering from the backup if it is corrupted
    async fn load_with_recovery(&self) -> Result<ZoneFile> {
        match Self::load(&self.path).await {
            Ok(doc) => Ok(doc),
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Zone file {} appears corrupted: {}. Attempting recovery from backup.",
                    self.path.display(),
                    e
                );

                let backup_path = Self::backup_path(&self.path);
                if !backup_path.exists() {
                    return Err(Error::Json(e));
                }

                let doc = Self::load(&backup_path).await?;
                tracing::info!(
                    "Recovered zone file from backup: {} zones",
                    doc.zones.len()
                );
                Ok(doc)
            }
            Err(e) => Err(e),
        }
    }

    async fn load(path: &Path) -> Result<ZoneFile> {
        if !path.exists() {
            tracing::debug!("Zone file does not exist: {}", path.display());
            return Ok(ZoneFile {
                version: FILE_VERSION.to_string(),
                zones: BTreeMap::new(),
            });
        }

        let content = fs::read_to_string(path).await?;
        let mut doc: ZoneFile = serde_json::from_str(&content)?;
        doc.zones = normalize_zone_keys(doc.zones);

        if doc.version != FILE_VERSION {
            tracing::warn!(
                "Zone file version mismatch: expected {}, got {}. Attempting to load anyway.",
                FILE_VERSION,
                doc.version
            );
        }

        Ok(doc)
    }

    /// Write the document atomically
    async fn write(&self, doc: &ZoneFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(doc)?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(json.as_bytes()).await?;
            file.flush().await?;
            file.sync_all().await?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::provider(
                "file",
                format!(
                    "Failed to rename {} to {}: {}",
                    temp_path.display(),
                    self.path.display(),
                    e
                ),
            )
        })?;

        tracing::trace!("Zone file written: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

/// Re-key hand-written zone names (`"Example.com."`) to their lookup form
///
/// Keys that collapse onto the same zone are merged in key order.
fn normalize_zone_keys(zones: BTreeMap<String, Vec<Record>>) -> BTreeMap<String, Vec<Record>> {
    let mut normalized: BTreeMap<String, Vec<Record>> = BTreeMap::new();
    for (key, records) in zones {
        normalized.entry(zone_key(&key)).or_default().extend(records);
    }
    normalized
}

#[async_trait]
impl DnsProvider for FileProvider {
    async fn records(&self, zone: &str) -> Result<Vec<Record>> {
        let doc = self.load_with_recovery().await?;
        Ok(doc.zones.get(&zone_key(zone)).cloned().unwrap_or_default())
    }

    async fn apply_changes(&self, zone: &str, changes: &ChangeSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;

        let mut doc = self.load_with_recovery().await?;
        doc.version = FILE_VERSION.to_string();
        apply_to(doc.zones.entry(zone_key(zone)).or_default(), changes);

        self.write(&doc).await
    }

    fn provider_name(&self) -> &'static str {
        "file"
    }
}

/// Factory for [`FileProvider`]
pub struct FileProviderFactory;

impl DnsProviderFactory for FileProviderFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::File { path } => Ok(Box::new(FileProvider::new(path))),
            other => Err(Error::config(format!(
                "file factory cannot build a {} provider",
                other.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn www(ip: &str) -> Record {
        Record::new("www.example.com", "A", [ip]).with_ttl(300)
    }

    fn create(records: Vec<Record>) -> ChangeSet {
        ChangeSet {
            create: records,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_file_provider_basic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zones.json");

        let provider = FileProvider::new(&path);

        // Missing file is an empty zone
        assert!(provider.records("example.com").await.unwrap().is_empty());

        provider
            .apply_changes("example.com", &create(vec![www("192.0.2.1")]))
            .await
            .unwrap();

        // Verify file was written
        assert!(path.exists());

        // New instance sees the same records
        let provider2 = FileProvider::new(&path);
        assert_eq!(
            provider2.records("example.com.").await.unwrap(),
            vec![www("192.0.2.1")]
        );
    }

    #[tokio::test]
    async fn zones_are_kept_apart() {
        let dir = tempdir().unwrap();
        let provider = FileProvider::new(dir.path().join("zones.json"));

        provider
            .apply_changes("example.com", &create(vec![www("192.0.2.1")]))
            .await
            .unwrap();
        provider
            .apply_changes(
                "example.org",
                &create(vec![Record::new("www.example.org", "A", ["192.0.2.2"])]),
            )
            .await
            .unwrap();

        assert_eq!(provider.records("example.com").await.unwrap().len(), 1);
        assert_eq!(provider.records("example.org").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_change_set_does_not_touch_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zones.json");
        let provider = FileProvider::new(&path);

        provider
            .apply_changes("example.com", &ChangeSet::default())
            .await
            .unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_file_provider_corruption_recovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zones.json");
        let provider = FileProvider::new(&path);

        provider
            .apply_changes("example.com", &create(vec![www("192.0.2.1")]))
            .await
            .unwrap();
        // Second write leaves the first document in the backup
        provider
            .apply_changes("example.com", &create(vec![www("192.0.2.2")]))
            .await
            .unwrap();
        assert!(FileProvider::backup_path(&path).exists());

        fs::write(&path, b"corrupted json data").await.unwrap();

        let recovered = provider.records("example.com").await.unwrap();
        assert_eq!(recovered, vec![www("192.0.2.1")]);
    }

    #[tokio::test]
    async fn corruption_without_backup_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zones.json");
        fs::write(&path, b"{ not json").await.unwrap();

        let err = FileProvider::new(&path).records("example.com").await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[tokio::test]
    async fn reads_hand_written_documents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zones.json");
        fs::write(
            &path,
            br#"{
  "version": "1.0",
  "zones": {
    "example.com": [
      { "dns_name": "example.com", "record_type": "mx", "targets": ["10 mail.example.com"] }
    ]
  }
}"#,
        )
        .await
        .unwrap();

        let records = FileProvider::new(&path).records("example.com").await.unwrap();
        assert_eq!(records, vec![Record::new("example.com", "MX", ["10 mail.example.com"])]);
    }

    #[tokio::test]
    async fn zone_keys_are_case_and_dot_insensitive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zones.json");
        fs::write(
            &path,
            br#"{
  "version": "1.0",
  "zones": {
    "Example.COM.": [
      { "dns_name": "www.example.com", "record_type": "A", "targets": ["192.0.2.1"] }
    ],
    "example.com": [
      { "dns_name": "api.example.com", "record_type": "A", "targets": ["192.0.2.2"] }
    ]
  }
}"#,
        )
        .await
        .unwrap();

        let provider = FileProvider::new(&path);
        let records = provider.records("example.com").await.unwrap();
        assert_eq!(records.len(), 2);

        // Rewriting the document stores a single normalized key
        provider
            .apply_changes("example.com", &create(vec![www("192.0.2.3")]))
            .await
            .unwrap();
        let written = fs::read_to_string(&path).await.unwrap();
        assert!(!written.contains("Example.COM."));
        assert_eq!(provider.records("EXAMPLE.com.").await.unwrap().len(), 3);
    }
}
