//! Checkpointed bulk import of TLD server data from IANA.
//!
//! An import is a sequence of phases. Each phase freezes a list of units the
//! first time it is processed, then works through that list a batch at a
//! time, writing a checkpoint to the [`ImportLogStore`] after every unit. A
//! caller drives the import by calling
//! [`BulkImportService::process_next_batch`] until the log is terminal.

mod service;
mod store;

pub use service::{
    BatchProgress, BulkImportService, ImportSettings, SourceVersionCheck, UpdateCheck,
};
pub use store::{FileImportLogStore, ImportLogStore, MemoryImportLogStore};

use crate::error::LookupError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What an import run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportType {
    TldList,
    Rdap,
    Whois,
    CheckUpdates,
    CompleteWorkflow,
}

impl ImportType {
    /// Phases run by this import type, in order.
    pub fn phases(&self) -> &'static [ImportPhase] {
        match self {
            ImportType::TldList => &[ImportPhase::TldList],
            ImportType::Rdap => &[ImportPhase::Rdap],
            ImportType::Whois => &[ImportPhase::Whois],
            ImportType::CheckUpdates => &[ImportPhase::CheckUpdates],
            ImportType::CompleteWorkflow => {
                &[ImportPhase::TldList, ImportPhase::Rdap, ImportPhase::Whois]
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportType::TldList => "tld_list",
            ImportType::Rdap => "rdap",
            ImportType::Whois => "whois",
            ImportType::CheckUpdates => "check_updates",
            ImportType::CompleteWorkflow => "complete_workflow",
        }
    }
}

impl fmt::Display for ImportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportType {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "tld_list" => Ok(ImportType::TldList),
            "rdap" => Ok(ImportType::Rdap),
            "whois" => Ok(ImportType::Whois),
            "check_updates" => Ok(ImportType::CheckUpdates),
            "complete_workflow" => Ok(ImportType::CompleteWorkflow),
            other => Err(LookupError::import(format!(
                "Unknown import type '{}'. Expected one of: tld_list, rdap, whois, check_updates, complete_workflow",
                other
            ))),
        }
    }
}

/// One stage of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPhase {
    /// Add TLDs from the IANA TLD list
    TldList,
    /// Store RDAP base URLs from the bootstrap registry
    Rdap,
    /// Look up WHOIS servers for entries lacking one
    Whois,
    /// Compare published IANA versions with the stored ones
    CheckUpdates,
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportPhase::TldList => "tld_list",
            ImportPhase::Rdap => "rdap",
            ImportPhase::Whois => "whois",
            ImportPhase::CheckUpdates => "check_updates",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

impl ImportStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStatus::Complete | ImportStatus::Failed)
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportStatus::Pending => "pending",
            ImportStatus::Running => "running",
            ImportStatus::Complete => "complete",
            ImportStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Position within an import: phase index and offset into that phase's units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCursor {
    pub phase: usize,
    pub offset: usize,
}

/// A single piece of import work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportUnit {
    /// Ensure a TLD from the IANA list exists and is active
    AddTld { tld: String },
    /// Store the bootstrap RDAP URL for a TLD
    RdapEndpoint { tld: String, url: String },
    /// Find the WHOIS server for a TLD
    WhoisLookup { tld: String },
    /// Run the update check
    CheckUpdates,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCounters {
    /// Units loaded across all phases set up so far
    pub total: u64,
    pub processed: u64,
    pub new: u64,
    pub updated: u64,
    pub failed: u64,
}

/// Persistent state of one import run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportLog {
    pub id: u64,
    pub import_type: ImportType,
    pub status: ImportStatus,
    pub cursor: ImportCursor,

    /// Frozen unit list of the current phase; `None` until the phase is set up
    #[serde(default)]
    pub units: Option<Vec<ImportUnit>>,

    /// IANA version or publication the current phase was loaded from
    #[serde(default)]
    pub source_version: Option<String>,

    pub counters: ImportCounters,

    #[serde(default)]
    pub error_message: Option<String>,

    /// Free-form report, e.g. the result of an update check
    #[serde(default)]
    pub details: serde_json::Value,

    /// Incremented by every stored checkpoint; compared on write
    pub revision: u64,

    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImportLog {
    /// A fresh running log.
    pub fn new(id: u64, import_type: ImportType, now: DateTime<Utc>) -> Self {
        Self {
            id,
            import_type,
            status: ImportStatus::Running,
            cursor: ImportCursor::default(),
            units: None,
            source_version: None,
            counters: ImportCounters::default(),
            error_message: None,
            details: serde_json::Value::Null,
            revision: 0,
            started_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// The phase the cursor points at, if any remain.
    pub fn current_phase(&self) -> Option<ImportPhase> {
        self.import_type.phases().get(self.cursor.phase).copied()
    }

    /// Units left in the current phase (0 before setup).
    pub fn remaining_in_phase(&self) -> usize {
        self.units
            .as_ref()
            .map(|units| units.len().saturating_sub(self.cursor.offset))
            .unwrap_or(0)
    }

    pub(crate) fn mark_failed(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
        self.status = ImportStatus::Failed;
        self.error_message = Some(message.into());
        self.updated_at = now;
        self.completed_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_type_phases() {
        assert_eq!(ImportType::TldList.phases(), &[ImportPhase::TldList]);
        assert_eq!(
            ImportType::CompleteWorkflow.phases(),
            &[ImportPhase::TldList, ImportPhase::Rdap, ImportPhase::Whois]
        );
    }

    #[test]
    fn test_import_type_parse() {
        assert_eq!(
            "complete-workflow".parse::<ImportType>().unwrap(),
            ImportType::CompleteWorkflow
        );
        assert_eq!("TLD_LIST".parse::<ImportType>().unwrap(), ImportType::TldList);
        assert!("everything".parse::<ImportType>().is_err());
    }

    #[test]
    fn test_unit_serialization() {
        let unit = ImportUnit::RdapEndpoint {
            tld: ".com".to_string(),
            url: "https://rdap.verisign.com/com/v1/".to_string(),
        };
        let json = serde_json::to_value(&unit).unwrap();
        assert_eq!(json["kind"], "rdap_endpoint");
        let back: ImportUnit = serde_json::from_value(json).unwrap();
        assert_eq!(back, unit);
    }

    #[test]
    fn test_new_log_is_running() {
        let log = ImportLog::new(1, ImportType::Rdap, Utc::now());
        assert_eq!(log.status, ImportStatus::Running);
        assert_eq!(log.current_phase(), Some(ImportPhase::Rdap));
        assert_eq!(log.remaining_in_phase(), 0);
        assert!(!log.status.is_terminal());
    }
}
