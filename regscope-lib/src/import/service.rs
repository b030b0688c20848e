//! The bulk import workflow.

use super::{
    ImportCounters, ImportLog, ImportLogStore, ImportPhase, ImportStatus, ImportType, ImportUnit,
};
use crate::directory::{TldServerDirectory, META_RDAP_PUBLICATION, META_TLD_LIST_VERSION};
use crate::error::LookupError;
use crate::protocols::IanaDataSource;
use crate::types::{EntrySource, TldServerEntry};
use crate::utils::canonical_tld;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Batch sizes and timeouts for imports.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSettings {
    /// Units per `process_next_batch` call
    /// Default: 50
    pub batch_size: usize,

    /// Units per call in the WHOIS phase, which makes a network query per unit
    /// Default: 10
    pub whois_batch_size: usize,

    /// Running imports idle for longer than this are abandoned
    /// Default: 1 hour
    pub stale_after: Duration,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: 50,
            whois_batch_size: 10,
            stale_after: Duration::from_secs(3600),
        }
    }
}

impl ImportSettings {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_whois_batch_size(mut self, whois_batch_size: usize) -> Self {
        self.whois_batch_size = whois_batch_size.max(1);
        self
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }
}

/// Result of one `process_next_batch` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchProgress {
    pub id: u64,
    pub status: ImportStatus,
    /// Phase the cursor points at after this call
    pub phase: Option<ImportPhase>,
    /// Units processed by this call
    pub processed: usize,
    /// Units left in the current phase
    pub remaining: usize,
    pub counters: ImportCounters,
    pub error_message: Option<String>,
}

impl BatchProgress {
    fn from_log(log: &ImportLog, processed: usize) -> Self {
        Self {
            id: log.id,
            status: log.status,
            phase: log.current_phase(),
            processed,
            remaining: log.remaining_in_phase(),
            counters: log.counters,
            error_message: log.error_message.clone(),
        }
    }
}

/// Published vs. stored version of one IANA source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceVersionCheck {
    pub current: Option<String>,
    pub last: Option<String>,
    pub needs_update: bool,
}

impl SourceVersionCheck {
    fn compare(current: Option<String>, last: Option<String>) -> Self {
        let needs_update = match (&current, &last) {
            (Some(current), Some(last)) => current != last,
            (Some(_), None) => true,
            (None, _) => false,
        };
        Self {
            current,
            last,
            needs_update,
        }
    }
}

/// Report produced by [`BulkImportService::check_for_updates`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateCheck {
    pub needs_update: bool,
    pub tld_list: SourceVersionCheck,
    pub rdap: SourceVersionCheck,
    pub errors: Vec<String>,
}

enum UnitResult {
    New,
    Updated,
    Unchanged,
    Failed(String),
}

/// Populates the TLD directory from IANA in resumable batches.
pub struct BulkImportService {
    directory: Arc<dyn TldServerDirectory>,
    store: Arc<dyn ImportLogStore>,
    source: Arc<dyn IanaDataSource>,
    settings: ImportSettings,
}

impl BulkImportService {
    pub fn new(
        directory: Arc<dyn TldServerDirectory>,
        store: Arc<dyn ImportLogStore>,
        source: Arc<dyn IanaDataSource>,
    ) -> Self {
        Self {
            directory,
            store,
            source,
            settings: ImportSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ImportSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// Start an import.
    ///
    /// # Errors
    ///
    /// `LookupError::ImportError` if an import of the same type is running
    /// and has made progress within the stale timeout.
    pub async fn start_import(&self, import_type: ImportType) -> Result<ImportLog, LookupError> {
        let stale_after = chrono::Duration::from_std(self.settings.stale_after)
            .map_err(|e| LookupError::config(format!("Invalid stale timeout: {}", e)))?;
        let log = self
            .store
            .create_exclusive(import_type, Utc::now(), stale_after)
            .await?;
        tracing::info!(id = log.id, %import_type, "import started");
        Ok(log)
    }

    /// Look up an import log.
    pub async fn import_log(&self, id: u64) -> Result<ImportLog, LookupError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| LookupError::import(format!("Import {} not found", id)))
    }

    pub async fn list_imports(&self) -> Result<Vec<ImportLog>, LookupError> {
        self.store.list().await
    }

    /// Process the next batch of an import.
    ///
    /// Loads the current phase's units on first use, then processes up to the
    /// batch size from the stored cursor, checkpointing after every unit.
    /// Finishing a phase moves the cursor to the next one; finishing the last
    /// phase completes the import. Calling this on a terminal import returns
    /// its final state.
    ///
    /// # Errors
    ///
    /// `LookupError::ImportError` if the import does not exist or another
    /// caller advanced it concurrently; storage errors are passed through.
    /// Setup failures do not error: they mark the log failed.
    pub async fn process_next_batch(&self, id: u64) -> Result<BatchProgress, LookupError> {
        let mut log = self.import_log(id).await?;

        if log.status.is_terminal() {
            return Ok(BatchProgress::from_log(&log, 0));
        }

        let Some(phase) = log.current_phase() else {
            self.finish(&mut log).await?;
            return Ok(BatchProgress::from_log(&log, 0));
        };

        if log.units.is_none() {
            match self.load_units(phase).await {
                Ok((units, version)) => {
                    tracing::info!(id, %phase, units = units.len(), "import phase loaded");
                    log.counters.total += units.len() as u64;
                    log.units = Some(units);
                    log.source_version = version;
                    log.updated_at = Utc::now();
                }
                Err(e) => {
                    tracing::warn!(id, %phase, error = %e, "import setup failed");
                    log.mark_failed(e.to_string(), Utc::now());
                }
            }
            self.checkpoint(&mut log).await?;
            if log.status.is_terminal() {
                return Ok(BatchProgress::from_log(&log, 0));
            }
        }

        let limit = match phase {
            ImportPhase::Whois => self.settings.whois_batch_size,
            _ => self.settings.batch_size,
        };

        let mut processed = 0;
        while processed < limit {
            let Some(unit) = log
                .units
                .as_ref()
                .and_then(|units| units.get(log.cursor.offset))
                .cloned()
            else {
                break;
            };

            let result = self.process_unit(&unit, &mut log).await;
            match result {
                UnitResult::New => log.counters.new += 1,
                UnitResult::Updated => log.counters.updated += 1,
                UnitResult::Unchanged => {}
                UnitResult::Failed(reason) => {
                    tracing::warn!(id, ?unit, %reason, "import unit failed");
                    log.counters.failed += 1;
                }
            }
            log.counters.processed += 1;
            log.cursor.offset += 1;
            log.updated_at = Utc::now();
            self.checkpoint(&mut log).await?;
            processed += 1;
        }

        if log.remaining_in_phase() == 0 {
            self.complete_phase(&mut log, phase).await?;
        }

        tracing::debug!(
            id,
            processed,
            remaining = log.remaining_in_phase(),
            status = %log.status,
            "import batch done"
        );
        Ok(BatchProgress::from_log(&log, processed))
    }

    /// Compare the published IANA TLD list version and bootstrap publication
    /// with the values recorded by the last completed imports.
    ///
    /// Does not modify the directory. Source errors are collected in the
    /// report rather than returned.
    pub async fn check_for_updates(&self) -> Result<UpdateCheck, LookupError> {
        let mut errors = Vec::new();

        let current_version = match self.source.fetch_tld_list().await {
            Ok(list) => list.version,
            Err(e) => {
                errors.push(e.to_string());
                None
            }
        };
        let current_publication = match self.source.fetch_bootstrap().await {
            Ok(bootstrap) => bootstrap.publication.clone(),
            Err(e) => {
                errors.push(e.to_string());
                None
            }
        };

        let tld_list = SourceVersionCheck::compare(
            current_version,
            self.directory.get_meta(META_TLD_LIST_VERSION).await?,
        );
        let rdap = SourceVersionCheck::compare(
            current_publication,
            self.directory.get_meta(META_RDAP_PUBLICATION).await?,
        );

        let report = UpdateCheck {
            needs_update: tld_list.needs_update || rdap.needs_update,
            tld_list,
            rdap,
            errors,
        };
        tracing::info!(needs_update = report.needs_update, "checked IANA for updates");
        Ok(report)
    }

    async fn checkpoint(&self, log: &mut ImportLog) -> Result<(), LookupError> {
        if self.store.save_checkpoint(log, log.revision).await? {
            log.revision += 1;
            Ok(())
        } else {
            Err(LookupError::import(format!(
                "Import {} was advanced by another caller; retry to resume from its checkpoint",
                log.id
            )))
        }
    }

    async fn complete_phase(&self, log: &mut ImportLog, phase: ImportPhase) -> Result<(), LookupError> {
        if let Some(version) = log.source_version.take() {
            match phase {
                ImportPhase::TldList => {
                    self.directory.set_meta(META_TLD_LIST_VERSION, &version).await?
                }
                ImportPhase::Rdap => {
                    self.directory.set_meta(META_RDAP_PUBLICATION, &version).await?
                }
                _ => {}
            }
        }

        tracing::info!(id = log.id, %phase, "import phase complete");
        log.cursor.phase += 1;
        log.cursor.offset = 0;
        log.units = None;
        log.updated_at = Utc::now();

        if log.current_phase().is_none() {
            self.finish(log).await
        } else {
            self.checkpoint(log).await
        }
    }

    async fn finish(&self, log: &mut ImportLog) -> Result<(), LookupError> {
        let now = Utc::now();
        log.status = ImportStatus::Complete;
        log.updated_at = now;
        log.completed_at = Some(now);
        self.checkpoint(log).await?;
        tracing::info!(
            id = log.id,
            processed = log.counters.processed,
            new = log.counters.new,
            updated = log.counters.updated,
            failed = log.counters.failed,
            "import complete"
        );
        Ok(())
    }

    /// Build the frozen unit list for a phase.
    async fn load_units(
        &self,
        phase: ImportPhase,
    ) -> Result<(Vec<ImportUnit>, Option<String>), LookupError> {
        match phase {
            ImportPhase::TldList => {
                let list = self.source.fetch_tld_list().await?;
                let units = list
                    .tlds
                    .iter()
                    .map(|tld| ImportUnit::AddTld {
                        tld: canonical_tld(tld),
                    })
                    .collect();
                Ok((units, list.version))
            }
            ImportPhase::Rdap => {
                let bootstrap = self.source.fetch_bootstrap().await?;
                let units = bootstrap
                    .entries()
                    .into_iter()
                    .map(|(tld, url)| ImportUnit::RdapEndpoint {
                        tld: canonical_tld(&tld),
                        url,
                    })
                    .collect();
                Ok((units, bootstrap.publication.clone()))
            }
            ImportPhase::Whois => {
                let units = self
                    .directory
                    .list()
                    .await?
                    .into_iter()
                    .filter(|entry| entry.is_active && entry.whois_server.is_none())
                    .map(|entry| ImportUnit::WhoisLookup { tld: entry.tld })
                    .collect();
                Ok((units, None))
            }
            ImportPhase::CheckUpdates => Ok((vec![ImportUnit::CheckUpdates], None)),
        }
    }

    async fn process_unit(&self, unit: &ImportUnit, log: &mut ImportLog) -> UnitResult {
        let result = match unit {
            ImportUnit::AddTld { tld } => self.add_tld(tld).await,
            ImportUnit::RdapEndpoint { tld, url } => self.store_rdap_endpoint(tld, url).await,
            ImportUnit::WhoisLookup { tld } => self.lookup_whois_server(tld).await,
            ImportUnit::CheckUpdates => match self.check_for_updates().await {
                Ok(report) => serde_json::to_value(&report)
                    .map(|details| {
                        log.details = details;
                        UnitResult::Unchanged
                    })
                    .map_err(LookupError::from),
                Err(e) => Err(e),
            },
        };
        result.unwrap_or_else(|e| UnitResult::Failed(e.to_string()))
    }

    async fn add_tld(&self, tld: &str) -> Result<UnitResult, LookupError> {
        match self.directory.get(tld).await? {
            None => {
                self.directory
                    .upsert(TldServerEntry::new(tld, EntrySource::IanaTldList))
                    .await?;
                Ok(UnitResult::New)
            }
            Some(mut entry) if !entry.is_active => {
                entry.is_active = true;
                entry.last_updated = Utc::now();
                self.directory.upsert(entry).await?;
                Ok(UnitResult::Updated)
            }
            Some(_) => Ok(UnitResult::Unchanged),
        }
    }

    async fn store_rdap_endpoint(&self, tld: &str, url: &str) -> Result<UnitResult, LookupError> {
        match self.directory.get(tld).await? {
            None => {
                let mut entry = TldServerEntry::new(tld, EntrySource::IanaRdap);
                entry.rdap_base_url = Some(url.to_string());
                self.directory.upsert(entry).await?;
                Ok(UnitResult::New)
            }
            Some(entry) if entry.rdap_base_url.as_deref() == Some(url) => Ok(UnitResult::Unchanged),
            Some(mut entry) => {
                entry.rdap_base_url = Some(url.to_string());
                if entry.source == EntrySource::IanaTldList {
                    entry.source = EntrySource::IanaRdap;
                }
                entry.last_updated = Utc::now();
                self.directory.upsert(entry).await?;
                Ok(UnitResult::Updated)
            }
        }
    }

    /// IANA WHOIS first, then the root zone database page.
    async fn lookup_whois_server(&self, tld: &str) -> Result<UnitResult, LookupError> {
        let mut entry = self
            .directory
            .get(tld)
            .await?
            .unwrap_or_else(|| TldServerEntry::new(tld, EntrySource::IanaWhois));
        if entry.whois_server.is_some() {
            return Ok(UnitResult::Unchanged);
        }

        let mut errors = Vec::new();
        let mut found = None;

        match self.source.iana_whois(tld).await {
            Ok(info) => {
                entry.metadata.fill_from(&info.metadata);
                if let Some(server) = info.server() {
                    found = Some((server.to_string(), EntrySource::IanaWhois));
                }
            }
            Err(e) => errors.push(e.to_string()),
        }

        if found.is_none() {
            match self.source.root_db_page(tld).await {
                Ok(Some(page)) => {
                    entry.metadata.fill_from(&page.metadata);
                    found = page.whois_server.map(|server| (server, EntrySource::IanaHtml));
                }
                Ok(None) => {}
                Err(e) => errors.push(e.to_string()),
            }
        }

        match found {
            Some((server, source)) => {
                entry.whois_server = Some(server);
                if matches!(entry.source, EntrySource::IanaTldList) {
                    entry.source = source;
                }
                entry.last_updated = Utc::now();
                self.directory.upsert(entry).await?;
                Ok(UnitResult::Updated)
            }
            None if errors.len() == 2 => Ok(UnitResult::Failed(errors.join("; "))),
            None => {
                // Keep any metadata learned even without a server
                entry.last_updated = Utc::now();
                self.directory.upsert(entry).await?;
                Ok(UnitResult::Unchanged)
            }
        }
    }
}
