//! Protocol implementations for registration data lookups.
//!
//! This module contains the RDAP and WHOIS clients used for domain queries,
//! and the IANA sources used to find which servers answer for a TLD.

/// IANA bootstrap, TLD list, WHOIS and root zone database sources
pub mod iana;

/// RDAP (Registration Data Access Protocol) implementation
pub mod rdap;

/// WHOIS protocol implementation
pub mod whois;

// Re-export commonly used functions and types
pub use iana::{
    IanaDataSource, IanaDiscoveryClient, IanaSources, IanaWhoisInfo, RdapBootstrap, RootDbInfo,
    TldDiscovery, TldList,
};
pub use rdap::{RdapClient, RdapOutcome};
pub use whois::{WhoisClient, WhoisOutcome};
