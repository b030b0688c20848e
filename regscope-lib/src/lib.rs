//! # Regscope Library
//!
//! Resolves registrar, expiration date, status and abuse contact for any domain
//! without knowing in advance which protocol or server answers for its TLD.
//!
//! The library discovers a TLD's RDAP and WHOIS endpoints from IANA, keeps them in
//! a [`TldServerDirectory`], queries RDAP first and falls back to WHOIS, and
//! normalizes every answer into one [`DomainRecord`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use regscope_lib::{ClientConfig, IanaDiscoveryClient, MemoryTldDirectory, Resolver};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::default();
//!     let directory = Arc::new(MemoryTldDirectory::new());
//!     let discovery = Arc::new(IanaDiscoveryClient::new(&config)?);
//!     let resolver = Resolver::new(directory, discovery, &config)?;
//!
//!     let record = resolver.resolve("example.com").await?;
//!     println!("{} expires {:?}", record.domain_name, record.expiration_date);
//!     println!("status: {}", record.lifecycle_status(30));
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **IANA discovery**: RDAP bootstrap, whois.iana.org and the root zone database
//! - **RDAP with WHOIS fallback**: explicit fallback order, WHOIS fills gaps in RDAP
//! - **Checkpointed imports**: bulk directory population resumable across calls
//! - **Offline classification**: lifecycle status from an expiration date and status tokens

pub use config::{
    load_env_config, ConfigManager, EnvConfig, FileConfig, Settings, DEFAULT_THRESHOLD_DAYS,
};
pub use directory::{FileTldDirectory, MemoryTldDirectory, TldServerDirectory};
pub use error::LookupError;
pub use import::{
    BatchProgress, BulkImportService, FileImportLogStore, ImportCounters, ImportLog,
    ImportLogStore, ImportPhase, ImportSettings, ImportStatus, ImportType, MemoryImportLogStore,
    UpdateCheck,
};
pub use protocols::{
    IanaDataSource, IanaDiscoveryClient, IanaSources, RdapClient, TldDiscovery, WhoisClient,
};
pub use resolver::{Resolution, Resolver, TraceEntry, TraceStep};
pub use status::classify as classify_status;
pub use types::{
    ClientConfig, DiscoveredServers, DomainRecord, EntrySource, LifecycleStatus, RawSource,
    TldMetadata, TldServerEntry,
};
pub use utils::{canonical_tld, normalize_domain, parse_registry_date};

pub mod config;
pub mod directory;
pub mod import;
pub mod protocols;
pub mod status;

mod error;
mod resolver;
mod storage;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, LookupError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
