//! Core data types for registration data resolution.
//!
//! This module defines the main data structures used throughout the library:
//! the normalized domain record, TLD directory entries, lifecycle statuses and
//! the client configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Normalized registration data for one domain.
///
/// A record always comes from a successful RDAP or WHOIS attempt. When every
/// attempt fails the resolver returns `LookupError::ResolutionFailed` instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainRecord {
    /// The domain name that was resolved (e.g., "example.com")
    pub domain_name: String,

    /// Registry suffix whose servers answered, canonical form (e.g., ".co.uk")
    pub tld: String,

    /// Sponsoring registrar, absent for available domains
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub abuse_email: Option<String>,

    /// Nameservers associated with the domain
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nameservers: Vec<String>,

    /// Raw registry status tokens, in the order the server reported them
    pub status: Vec<String>,

    /// Which protocol produced the record
    pub raw_source: RawSource,

    /// Whether WHOIS filled fields the RDAP answer lacked
    #[serde(default)]
    pub whois_supplemented: bool,
}

impl DomainRecord {
    /// Create an empty record for a domain answered by `source`.
    pub fn new(domain_name: &str, tld: &str, raw_source: RawSource) -> Self {
        Self {
            domain_name: domain_name.to_string(),
            tld: tld.to_string(),
            registrar: None,
            registrar_url: None,
            creation_date: None,
            expiration_date: None,
            updated_date: None,
            abuse_email: None,
            nameservers: Vec::new(),
            status: Vec::new(),
            raw_source,
            whois_supplemented: false,
        }
    }

    /// Record for a domain the registry reports as not registered.
    pub fn available(domain_name: &str, tld: &str, raw_source: RawSource) -> Self {
        let mut record = Self::new(domain_name, tld, raw_source);
        record.status = vec!["available".to_string()];
        record
    }

    /// Whether the registry reported the domain as unregistered.
    pub fn is_available(&self) -> bool {
        crate::status::has_availability_marker(&self.status)
    }

    /// Compute the lifecycle status against a caller-supplied threshold.
    pub fn lifecycle_status(&self, threshold_days: i64) -> LifecycleStatus {
        crate::status::classify(self.expiration_date, &self.status, threshold_days)
    }
}

/// Protocol that produced a `DomainRecord`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RawSource {
    #[serde(rename = "rdap")]
    Rdap,

    #[serde(rename = "whois")]
    Whois,
}

/// Derived lifecycle classification of a domain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStatus {
    Available,
    Expired,
    Expiring,
    Active,
    Unknown,
}

/// Where a TLD directory entry's data came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    /// Entered by an operator
    Manual,
    /// Created from the IANA TLD list, no endpoint yet
    IanaTldList,
    /// RDAP base URL from the IANA bootstrap registry
    IanaRdap,
    /// WHOIS server from whois.iana.org
    IanaWhois,
    /// WHOIS server scraped from the IANA root zone database page
    IanaHtml,
}

/// Registry metadata published by IANA for a TLD.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TldMetadata {
    /// URL for registration services
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_last_updated: Option<String>,
}

impl TldMetadata {
    /// Fill fields that are still empty from `other`.
    pub fn fill_from(&mut self, other: &TldMetadata) {
        if self.registry_url.is_none() {
            self.registry_url = other.registry_url.clone();
        }
        if self.registration_date.is_none() {
            self.registration_date = other.registration_date.clone();
        }
        if self.record_last_updated.is_none() {
            self.record_last_updated = other.record_last_updated.clone();
        }
    }
}

/// One row of the TLD server directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TldServerEntry {
    /// Canonical TLD key: lowercase with leading dot (".com", ".co.uk")
    pub tld: String,

    #[serde(default)]
    pub rdap_base_url: Option<String>,

    #[serde(default)]
    pub whois_server: Option<String>,

    pub is_active: bool,

    pub source: EntrySource,

    pub last_updated: DateTime<Utc>,

    #[serde(default)]
    pub metadata: TldMetadata,
}

impl TldServerEntry {
    /// Create an active entry with no endpoints.
    pub fn new(tld: &str, source: EntrySource) -> Self {
        Self {
            tld: crate::utils::canonical_tld(tld),
            rdap_base_url: None,
            whois_server: None,
            is_active: true,
            source,
            last_updated: Utc::now(),
            metadata: TldMetadata::default(),
        }
    }

    /// Build an entry from a discovery result.
    pub fn from_discovery(tld: &str, servers: &DiscoveredServers) -> Self {
        Self {
            rdap_base_url: servers.rdap_base_url.clone(),
            whois_server: servers.whois_server.clone(),
            metadata: servers.metadata.clone(),
            ..Self::new(tld, servers.source)
        }
    }

    /// Whether any protocol endpoint is known for this TLD.
    pub fn has_endpoint(&self) -> bool {
        self.rdap_base_url.is_some() || self.whois_server.is_some()
    }
}

/// Result of discovering a TLD's servers. Absence of both is a valid result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveredServers {
    pub rdap_base_url: Option<String>,
    pub whois_server: Option<String>,
    /// Most specific source that contributed an endpoint
    pub source: EntrySource,
    pub metadata: TldMetadata,
}

impl DiscoveredServers {
    /// A discovery that found nothing.
    pub fn empty() -> Self {
        Self {
            rdap_base_url: None,
            whois_server: None,
            source: EntrySource::IanaWhois,
            metadata: TldMetadata::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rdap_base_url.is_none() && self.whois_server.is_none()
    }
}

/// Configuration options for the protocol clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Total timeout for one RDAP request
    /// Default: 10 seconds
    pub rdap_timeout: Duration,

    /// Connect timeout and read timeout for one WHOIS query (each)
    /// Default: 10 seconds
    pub whois_timeout: Duration,

    /// Timeout for IANA HTTP sources (bootstrap, TLD list, root DB pages)
    /// Default: 20 seconds
    pub iana_timeout: Duration,

    /// User-Agent header for HTTP requests
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rdap_timeout: Duration::from_secs(10),
            whois_timeout: Duration::from_secs(10),
            iana_timeout: Duration::from_secs(20),
            user_agent: format!("regscope/{}", crate::VERSION),
        }
    }
}

impl ClientConfig {
    /// Set custom timeout for RDAP requests.
    pub fn with_rdap_timeout(mut self, timeout: Duration) -> Self {
        self.rdap_timeout = timeout;
        self
    }

    /// Set custom timeout for WHOIS connect and read.
    pub fn with_whois_timeout(mut self, timeout: Duration) -> Self {
        self.whois_timeout = timeout;
        self
    }

    /// Set custom timeout for IANA sources.
    pub fn with_iana_timeout(mut self, timeout: Duration) -> Self {
        self.iana_timeout = timeout;
        self
    }
}

impl std::fmt::Display for RawSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawSource::Rdap => write!(f, "RDAP"),
            RawSource::Whois => write!(f, "WHOIS"),
        }
    }
}

impl std::fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleStatus::Available => write!(f, "available"),
            LifecycleStatus::Expired => write!(f, "expired"),
            LifecycleStatus::Expiring => write!(f, "expiring"),
            LifecycleStatus::Active => write!(f, "active"),
            LifecycleStatus::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::fmt::Display for EntrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntrySource::Manual => "manual",
            EntrySource::IanaTldList => "iana_tld_list",
            EntrySource::IanaRdap => "iana_rdap",
            EntrySource::IanaWhois => "iana_whois",
            EntrySource::IanaHtml => "iana_html",
        };
        write!(f, "{}", name)
    }
}
