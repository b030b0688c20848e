//! JSON file persistence shared by the file-backed stores.

use crate::error::LookupError;
use fs4::fs_std::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A JSON document on disk, replaced atomically on every save.
///
/// Writers from any process serialize on an OS lock held on a sibling
/// `.lock` file; readers never lock and see either the old or the new file.
#[derive(Debug, Clone)]
pub(crate) struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub(crate) fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    /// Load the document, or `T::default()` if the file does not exist yet.
    pub(crate) async fn load<T: DeserializeOwned + Default>(&self) -> Result<T, LookupError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                LookupError::storage(format!(
                    "Corrupt store file {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(LookupError::file_error(
                self.path.to_string_lossy(),
                e.to_string(),
            )),
        }
    }

    /// Re-read the document under the write lock, apply one change, and save.
    ///
    /// `apply` returns its result and whether the document changed; an
    /// unchanged document is not rewritten. Errors from `apply` leave the
    /// file untouched.
    pub(crate) async fn update<T, R, F>(&self, apply: F) -> Result<R, LookupError>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T) -> Result<(R, bool), LookupError>,
    {
        let _lock = self.lock().await?;

        let mut document: T = self.load().await?;
        let (result, changed) = apply(&mut document)?;
        if changed {
            self.write(&document).await?;
        }
        Ok(result)
    }

    /// Block (off the runtime) until the exclusive lock is ours.
    ///
    /// The lock is released when the returned handle is dropped.
    async fn lock(&self) -> Result<std::fs::File, LookupError> {
        self.create_parent().await?;
        let lock_path = self.lock_path();

        tokio::task::spawn_blocking(move || {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&lock_path)
                .map_err(|e| LookupError::file_error(lock_path.to_string_lossy(), e.to_string()))?;
            FileExt::lock_exclusive(&file)
                .map_err(|e| LookupError::file_error(lock_path.to_string_lossy(), e.to_string()))?;
            Ok::<_, LookupError>(file)
        })
        .await
        .map_err(|e| LookupError::storage(format!("Lock task failed: {}", e)))?
    }

    async fn create_parent(&self) -> Result<(), LookupError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    LookupError::file_error(parent.to_string_lossy(), e.to_string())
                })?;
            }
        }
        Ok(())
    }

    /// Write the document to a sibling temp file and rename it into place.
    async fn write<T: Serialize>(&self, value: &T) -> Result<(), LookupError> {
        let bytes = serde_json::to_vec_pretty(value)?;
        let tmp = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| LookupError::file_error(tmp.to_string_lossy(), e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| LookupError::file_error(self.path.to_string_lossy(), e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("nothing.json"));
        let value: BTreeMap<String, String> = file.load().await.unwrap();
        assert!(value.is_empty());
    }

    #[tokio::test]
    async fn test_update_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("nested").join("store.json"));

        file.update(|value: &mut BTreeMap<String, String>| {
            value.insert("com".to_string(), "whois.verisign-grs.com".to_string());
            Ok(((), true))
        })
        .await
        .unwrap();

        let loaded: BTreeMap<String, String> = file.load().await.unwrap();
        assert_eq!(loaded.get("com").map(String::as_str), Some("whois.verisign-grs.com"));
        assert!(!file.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_unchanged_update_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("store.json"));

        let len = file
            .update(|value: &mut BTreeMap<String, String>| Ok((value.len(), false)))
            .await
            .unwrap();
        assert_eq!(len, 0);
        assert!(!file.path().exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_from_separate_handles_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                // A fresh handle per writer, as separate processes would have
                let file = JsonFile::new(&path);
                tokio::spawn(async move {
                    file.update(|value: &mut BTreeMap<String, String>| {
                        value.insert(format!("key{}", i), i.to_string());
                        Ok(((), true))
                    })
                    .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let loaded: BTreeMap<String, String> = JsonFile::new(&path).load().await.unwrap();
        assert_eq!(loaded.len(), 16);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, b"{not json").unwrap();

        let result: Result<BTreeMap<String, String>, _> = JsonFile::new(&path).load().await;
        assert!(matches!(result, Err(LookupError::StorageError { .. })));
    }
}
