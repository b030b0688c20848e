//! TLD server directory: which RDAP base URL and WHOIS server serve each TLD.
//!
//! The directory is pure data access. The resolver reads it and writes
//! discovery results into it; the bulk import service populates it from IANA.
//! Two implementations are provided: an in-memory map and a JSON file.

use crate::error::LookupError;
use crate::storage::JsonFile;
use crate::types::TldServerEntry;
use crate::utils::canonical_tld;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::RwLock;

/// Directory metadata key: version header of the last imported IANA TLD list.
pub const META_TLD_LIST_VERSION: &str = "tld_list_version";

/// Directory metadata key: `publication` of the last imported RDAP bootstrap.
pub const META_RDAP_PUBLICATION: &str = "rdap_publication";

/// Persistent TLD → servers store.
///
/// Keys are canonical TLDs (lowercase, leading dot); implementations
/// canonicalize whatever the caller passes.
#[async_trait]
pub trait TldServerDirectory: Send + Sync {
    /// Look up one TLD.
    async fn get(&self, tld: &str) -> Result<Option<TldServerEntry>, LookupError>;

    /// Insert or replace an entry (keyed by `entry.tld`).
    async fn upsert(&self, entry: TldServerEntry) -> Result<(), LookupError>;

    /// Remove an entry, returning whether it existed.
    async fn remove(&self, tld: &str) -> Result<bool, LookupError>;

    /// All entries, sorted by TLD.
    async fn list(&self) -> Result<Vec<TldServerEntry>, LookupError>;

    /// Read a directory-level metadata value.
    async fn get_meta(&self, key: &str) -> Result<Option<String>, LookupError>;

    /// Write a directory-level metadata value.
    async fn set_meta(&self, key: &str, value: &str) -> Result<(), LookupError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DirectoryData {
    #[serde(default)]
    entries: BTreeMap<String, TldServerEntry>,
    #[serde(default)]
    meta: BTreeMap<String, String>,
}

/// In-memory directory, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryTldDirectory {
    data: RwLock<DirectoryData>,
}

impl MemoryTldDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory pre-populated with entries.
    pub fn with_entries(entries: Vec<TldServerEntry>) -> Self {
        let mut data = DirectoryData::default();
        for mut entry in entries {
            entry.tld = canonical_tld(&entry.tld);
            data.entries.insert(entry.tld.clone(), entry);
        }
        Self {
            data: RwLock::new(data),
        }
    }
}

#[async_trait]
impl TldServerDirectory for MemoryTldDirectory {
    async fn get(&self, tld: &str) -> Result<Option<TldServerEntry>, LookupError> {
        Ok(self.data.read().await.entries.get(&canonical_tld(tld)).cloned())
    }

    async fn upsert(&self, mut entry: TldServerEntry) -> Result<(), LookupError> {
        entry.tld = canonical_tld(&entry.tld);
        self.data
            .write()
            .await
            .entries
            .insert(entry.tld.clone(), entry);
        Ok(())
    }

    async fn remove(&self, tld: &str) -> Result<bool, LookupError> {
        Ok(self
            .data
            .write()
            .await
            .entries
            .remove(&canonical_tld(tld))
            .is_some())
    }

    async fn list(&self) -> Result<Vec<TldServerEntry>, LookupError> {
        Ok(self.data.read().await.entries.values().cloned().collect())
    }

    async fn get_meta(&self, key: &str) -> Result<Option<String>, LookupError> {
        Ok(self.data.read().await.meta.get(key).cloned())
    }

    async fn set_meta(&self, key: &str, value: &str) -> Result<(), LookupError> {
        self.data
            .write()
            .await
            .meta
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Directory persisted as a single JSON document.
///
/// Nothing is cached: reads load the file and every write re-reads it under
/// the store's file lock before applying its one change, so several
/// processes can share the same directory file.
#[derive(Debug)]
pub struct FileTldDirectory {
    file: JsonFile,
}

impl FileTldDirectory {
    /// Open (or lazily create) a directory file.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, LookupError> {
        let file = JsonFile::new(path);
        let data: DirectoryData = file.load().await?;
        tracing::debug!(
            path = %file.path().display(),
            entries = data.entries.len(),
            "opened TLD directory"
        );
        Ok(Self { file })
    }

    async fn snapshot(&self) -> Result<DirectoryData, LookupError> {
        self.file.load().await
    }
}

#[async_trait]
impl TldServerDirectory for FileTldDirectory {
    async fn get(&self, tld: &str) -> Result<Option<TldServerEntry>, LookupError> {
        Ok(self.snapshot().await?.entries.remove(&canonical_tld(tld)))
    }

    async fn upsert(&self, mut entry: TldServerEntry) -> Result<(), LookupError> {
        entry.tld = canonical_tld(&entry.tld);
        self.file
            .update(|data: &mut DirectoryData| {
                data.entries.insert(entry.tld.clone(), entry);
                Ok(((), true))
            })
            .await
    }

    async fn remove(&self, tld: &str) -> Result<bool, LookupError> {
        let key = canonical_tld(tld);
        self.file
            .update(|data: &mut DirectoryData| {
                let existed = data.entries.remove(&key).is_some();
                Ok((existed, existed))
            })
            .await
    }

    async fn list(&self) -> Result<Vec<TldServerEntry>, LookupError> {
        Ok(self.snapshot().await?.entries.into_values().collect())
    }

    async fn get_meta(&self, key: &str) -> Result<Option<String>, LookupError> {
        Ok(self.snapshot().await?.meta.remove(key))
    }

    async fn set_meta(&self, key: &str, value: &str) -> Result<(), LookupError> {
        self.file
            .update(|data: &mut DirectoryData| {
                data.meta.insert(key.to_string(), value.to_string());
                Ok(((), true))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntrySource;

    fn entry(tld: &str, rdap: Option<&str>, whois: Option<&str>) -> TldServerEntry {
        let mut entry = TldServerEntry::new(tld, EntrySource::Manual);
        entry.rdap_base_url = rdap.map(String::from);
        entry.whois_server = whois.map(String::from);
        entry
    }

    #[test]
    fn test_memory_directory_canonicalizes_keys() {
        tokio_test::block_on(async {
            let dir = MemoryTldDirectory::new();
            dir.upsert(entry("COM", Some("https://rdap.verisign.com/com/v1/"), None))
                .await
                .unwrap();

            let found = dir.get(".com").await.unwrap().unwrap();
            assert_eq!(found.tld, ".com");
            assert!(dir.get("com").await.unwrap().is_some());
            assert!(dir.get("net").await.unwrap().is_none());
        });
    }

    #[test]
    fn test_memory_directory_one_entry_per_tld() {
        tokio_test::block_on(async {
            let dir = MemoryTldDirectory::new();
            dir.upsert(entry("org", None, None)).await.unwrap();
            dir.upsert(entry(".org", None, Some("whois.pir.org")))
                .await
                .unwrap();

            let all = dir.list().await.unwrap();
            assert_eq!(all.len(), 1);
            assert_eq!(all[0].whois_server.as_deref(), Some("whois.pir.org"));

            assert!(dir.remove("org").await.unwrap());
            assert!(!dir.remove("org").await.unwrap());
        });
    }

    #[test]
    fn test_memory_directory_meta() {
        tokio_test::block_on(async {
            let dir = MemoryTldDirectory::new();
            assert!(dir.get_meta(META_TLD_LIST_VERSION).await.unwrap().is_none());
            dir.set_meta(META_TLD_LIST_VERSION, "2026101700").await.unwrap();
            assert_eq!(
                dir.get_meta(META_TLD_LIST_VERSION).await.unwrap().as_deref(),
                Some("2026101700")
            );
        });
    }

    #[tokio::test]
    async fn test_file_directory_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("directory.json");

        {
            let dir = FileTldDirectory::open(&path).await.unwrap();
            dir.upsert(entry("uk", Some("https://rdap.nominet.uk/uk/"), Some("whois.nic.uk")))
                .await
                .unwrap();
            dir.upsert(entry("zz", None, None)).await.unwrap();
            dir.set_meta(META_RDAP_PUBLICATION, "2026-10-01T00:00:00Z")
                .await
                .unwrap();
        }

        let reopened = FileTldDirectory::open(&path).await.unwrap();
        let uk = reopened.get("uk").await.unwrap().unwrap();
        assert_eq!(uk.whois_server.as_deref(), Some("whois.nic.uk"));

        // Negative discovery results persist too
        let zz = reopened.get(".zz").await.unwrap().unwrap();
        assert!(!zz.has_endpoint());

        assert_eq!(
            reopened.get_meta(META_RDAP_PUBLICATION).await.unwrap().as_deref(),
            Some("2026-10-01T00:00:00Z")
        );
    }

    #[tokio::test]
    async fn test_file_directory_handles_do_not_overwrite_each_other() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("directory.json");

        // Two handles opened on the same file, as two processes would
        let importer = FileTldDirectory::open(&path).await.unwrap();
        let resolver = FileTldDirectory::open(&path).await.unwrap();

        importer
            .upsert(entry("com", Some("https://rdap.verisign.com/com/v1/"), None))
            .await
            .unwrap();
        resolver.upsert(entry("zz", None, None)).await.unwrap();
        importer
            .set_meta(META_TLD_LIST_VERSION, "2026101700")
            .await
            .unwrap();

        // Each handle sees the other's writes
        assert!(resolver.get("com").await.unwrap().is_some());
        assert!(importer.remove("zz").await.unwrap());
        assert!(resolver.get("zz").await.unwrap().is_none());

        let reopened = FileTldDirectory::open(&path).await.unwrap();
        let tlds: Vec<String> = reopened
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.tld)
            .collect();
        assert_eq!(tlds, vec![".com".to_string()]);
        assert_eq!(
            reopened.get_meta(META_TLD_LIST_VERSION).await.unwrap().as_deref(),
            Some("2026101700")
        );
    }
}
