//! Persistence for import logs.

use super::{ImportLog, ImportStatus, ImportType};
use crate::error::LookupError;
use crate::storage::JsonFile;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::RwLock;

/// Storage for [`ImportLog`]s.
#[async_trait]
pub trait ImportLogStore: Send + Sync {
    /// Create a running log unless one of the same type is already running.
    ///
    /// Running logs not updated within `stale_after` are marked failed first.
    /// The check and the insert happen under one lock.
    async fn create_exclusive(
        &self,
        import_type: ImportType,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Result<ImportLog, LookupError>;

    async fn get(&self, id: u64) -> Result<Option<ImportLog>, LookupError>;

    /// Store `log` if the stored revision still equals `expected_revision`.
    ///
    /// On success the stored log has revision `expected_revision + 1` and
    /// `true` is returned; `false` means another writer got there first.
    async fn save_checkpoint(
        &self,
        log: &ImportLog,
        expected_revision: u64,
    ) -> Result<bool, LookupError>;

    /// All logs, newest first.
    async fn list(&self) -> Result<Vec<ImportLog>, LookupError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ImportLogData {
    next_id: u64,
    logs: Vec<ImportLog>,
}

impl ImportLogData {
    fn create_exclusive(
        &mut self,
        import_type: ImportType,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Result<ImportLog, LookupError> {
        for log in self
            .logs
            .iter_mut()
            .filter(|l| l.import_type == import_type && l.status == ImportStatus::Running)
        {
            if now - log.updated_at > stale_after {
                tracing::warn!(id = log.id, %import_type, "marking stale import as abandoned");
                log.mark_failed("abandoned: no progress before the stale timeout", now);
                log.revision += 1;
            } else {
                return Err(LookupError::import(format!(
                    "A {} import is already running (id {})",
                    import_type, log.id
                )));
            }
        }

        self.next_id += 1;
        let log = ImportLog::new(self.next_id, import_type, now);
        self.logs.push(log.clone());
        Ok(log)
    }

    fn get(&self, id: u64) -> Option<ImportLog> {
        self.logs.iter().find(|l| l.id == id).cloned()
    }

    fn save_checkpoint(&mut self, log: &ImportLog, expected_revision: u64) -> Result<bool, LookupError> {
        let stored = self
            .logs
            .iter_mut()
            .find(|l| l.id == log.id)
            .ok_or_else(|| LookupError::import(format!("Import {} not found", log.id)))?;

        if stored.revision != expected_revision {
            return Ok(false);
        }

        let mut next = log.clone();
        next.revision = expected_revision + 1;
        *stored = next;
        Ok(true)
    }

    fn list(&self) -> Vec<ImportLog> {
        let mut logs = self.logs.clone();
        logs.sort_by(|a, b| b.id.cmp(&a.id));
        logs
    }
}

/// In-memory import log store.
#[derive(Debug, Default)]
pub struct MemoryImportLogStore {
    data: RwLock<ImportLogData>,
}

impl MemoryImportLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImportLogStore for MemoryImportLogStore {
    async fn create_exclusive(
        &self,
        import_type: ImportType,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Result<ImportLog, LookupError> {
        self.data
            .write()
            .await
            .create_exclusive(import_type, now, stale_after)
    }

    async fn get(&self, id: u64) -> Result<Option<ImportLog>, LookupError> {
        Ok(self.data.read().await.get(id))
    }

    async fn save_checkpoint(
        &self,
        log: &ImportLog,
        expected_revision: u64,
    ) -> Result<bool, LookupError> {
        self.data.write().await.save_checkpoint(log, expected_revision)
    }

    async fn list(&self) -> Result<Vec<ImportLog>, LookupError> {
        Ok(self.data.read().await.list())
    }
}

/// Import log store persisted as a JSON document.
///
/// The running-import check and the revision compare-and-set both run
/// against the file, re-read under its lock, so they hold across processes.
#[derive(Debug)]
pub struct FileImportLogStore {
    file: JsonFile,
}

impl FileImportLogStore {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, LookupError> {
        let file = JsonFile::new(path);
        // Fail early on a corrupt file
        let _: ImportLogData = file.load().await?;
        Ok(Self { file })
    }

    async fn snapshot(&self) -> Result<ImportLogData, LookupError> {
        self.file.load().await
    }
}

#[async_trait]
impl ImportLogStore for FileImportLogStore {
    async fn create_exclusive(
        &self,
        import_type: ImportType,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Result<ImportLog, LookupError> {
        self.file
            .update(|data: &mut ImportLogData| {
                let log = data.create_exclusive(import_type, now, stale_after)?;
                Ok((log, true))
            })
            .await
    }

    async fn get(&self, id: u64) -> Result<Option<ImportLog>, LookupError> {
        Ok(self.snapshot().await?.get(id))
    }

    async fn save_checkpoint(
        &self,
        log: &ImportLog,
        expected_revision: u64,
    ) -> Result<bool, LookupError> {
        self.file
            .update(|data: &mut ImportLogData| {
                let saved = data.save_checkpoint(log, expected_revision)?;
                Ok((saved, saved))
            })
            .await
    }

    async fn list(&self) -> Result<Vec<ImportLog>, LookupError> {
        Ok(self.snapshot().await?.list())
    }
}
