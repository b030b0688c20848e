//! Registration data resolution.
//!
//! This module provides the `Resolver`, which finds the servers responsible
//! for a domain's TLD and queries them: RDAP first, WHOIS as fallback or to
//! fill fields RDAP left empty.

use crate::directory::TldServerDirectory;
use crate::error::LookupError;
use crate::protocols::{RdapClient, RdapOutcome, TldDiscovery, WhoisClient, WhoisOutcome};
use crate::types::{ClientConfig, DomainRecord, RawSource, TldServerEntry};
use crate::utils::{canonical_tld, normalize_domain, suffix_candidates};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;

/// IANA's own WHOIS server only describes TLDs, never domains.
const IANA_WHOIS_HOST: &str = "whois.iana.org";

/// Which part of a resolution produced a trace line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStep {
    Directory,
    Discovery,
    Rdap,
    Whois,
}

impl std::fmt::Display for TraceStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TraceStep::Directory => "directory",
            TraceStep::Discovery => "discovery",
            TraceStep::Rdap => "rdap",
            TraceStep::Whois => "whois",
        };
        f.write_str(name)
    }
}

/// One line of a resolution trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    pub step: TraceStep,
    pub detail: String,
}

/// The outcome of one resolution together with everything that was tried.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub domain: String,
    pub result: Result<DomainRecord, LookupError>,
    pub trace: Vec<TraceEntry>,
}

/// Resolution progress. Each state carries what the next step needs.
enum State {
    Start,
    TldResolved {
        entry: TldServerEntry,
    },
    RdapAttempted {
        entry: TldServerEntry,
        partial: Option<DomainRecord>,
    },
    WhoisAttempted {
        partial: Option<DomainRecord>,
    },
    Done(Result<DomainRecord, LookupError>),
}

/// Resolves domains to normalized registration records.
///
/// # Example
///
/// ```rust,no_run
/// use regscope_lib::{ClientConfig, IanaDiscoveryClient, MemoryTldDirectory, Resolver};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ClientConfig::default();
///     let resolver = Resolver::new(
///         Arc::new(MemoryTldDirectory::new()),
///         Arc::new(IanaDiscoveryClient::new(&config)?),
///         &config,
///     )?;
///     let record = resolver.resolve("example.com").await?;
///     println!("{:?} expires {:?}", record.registrar, record.expiration_date);
///     Ok(())
/// }
/// ```
pub struct Resolver {
    directory: Arc<dyn TldServerDirectory>,
    discovery: Arc<dyn TldDiscovery>,
    rdap_client: RdapClient,
    whois_client: WhoisClient,
}

impl Resolver {
    /// Create a resolver with protocol clients built from `config`.
    pub fn new(
        directory: Arc<dyn TldServerDirectory>,
        discovery: Arc<dyn TldDiscovery>,
        config: &ClientConfig,
    ) -> Result<Self, LookupError> {
        Ok(Self {
            directory,
            discovery,
            rdap_client: RdapClient::with_config(config)?,
            whois_client: WhoisClient::with_config(config),
        })
    }

    /// Replace the WHOIS client (e.g. to target a non-standard port).
    pub fn with_whois_client(mut self, whois_client: WhoisClient) -> Self {
        self.whois_client = whois_client;
        self
    }

    pub fn with_rdap_client(mut self, rdap_client: RdapClient) -> Self {
        self.rdap_client = rdap_client;
        self
    }

    pub fn directory(&self) -> &Arc<dyn TldServerDirectory> {
        &self.directory
    }

    /// Resolve one domain.
    ///
    /// # Arguments
    ///
    /// * `domain` - The domain name to resolve (e.g., "example.com")
    ///
    /// # Returns
    ///
    /// The normalized record, or `LookupError::ResolutionFailed` when neither
    /// protocol produced data.
    pub async fn resolve(&self, domain: &str) -> Result<DomainRecord, LookupError> {
        self.resolve_with_trace(domain).await.result
    }

    /// Resolve one domain and keep the trace of every attempt.
    pub async fn resolve_with_trace(&self, domain: &str) -> Resolution {
        let mut trace = Vec::new();

        let normalized = match normalize_domain(domain) {
            Ok(normalized) => normalized,
            Err(e) => {
                return Resolution {
                    domain: domain.to_string(),
                    result: Err(e),
                    trace,
                }
            }
        };

        let mut state = State::Start;
        let result = loop {
            state = match state {
                State::Start => match self.find_entry(&normalized, &mut trace).await {
                    Ok(Some(entry)) => State::TldResolved { entry },
                    Ok(None) => State::WhoisAttempted { partial: None },
                    Err(e) => State::Done(Err(e)),
                },
                State::TldResolved { entry } => self.attempt_rdap(&normalized, entry, &mut trace).await,
                State::RdapAttempted { entry, partial } => {
                    self.attempt_whois(&normalized, &entry, partial, &mut trace)
                        .await
                }
                State::WhoisAttempted { partial } => State::Done(partial.ok_or_else(|| {
                    LookupError::resolution_failed(&normalized, failure_details(&trace))
                })),
                State::Done(result) => break result,
            };
        };

        match &result {
            Ok(record) => tracing::info!(
                domain = %normalized,
                source = %record.raw_source,
                supplemented = record.whois_supplemented,
                "resolved"
            ),
            Err(e) => tracing::warn!(domain = %normalized, error = %e, "resolution failed"),
        }

        Resolution {
            domain: normalized,
            result,
            trace,
        }
    }

    /// Resolve several domains one after another.
    ///
    /// Results are yielded in input order; a failing domain does not stop the
    /// stream.
    pub fn resolve_many<'a>(
        &'a self,
        domains: &'a [String],
    ) -> Pin<Box<dyn Stream<Item = Result<DomainRecord, LookupError>> + Send + 'a>> {
        let stream = futures::stream::iter(domains).then(move |domain| self.resolve(domain));
        Box::pin(stream)
    }

    /// Re-run discovery for a TLD and update its directory entry.
    ///
    /// Newly discovered endpoints replace stored ones; an endpoint discovery
    /// did not find is kept. Registry metadata is filled, never cleared.
    pub async fn refresh_tld(&self, tld: &str) -> Result<TldServerEntry, LookupError> {
        let key = canonical_tld(tld);
        let discovered = self.discovery.discover(&key).await;

        let entry = match self.directory.get(&key).await? {
            Some(mut existing) => {
                if discovered.rdap_base_url.is_some() {
                    existing.rdap_base_url = discovered.rdap_base_url.clone();
                }
                if discovered.whois_server.is_some() {
                    existing.whois_server = discovered.whois_server.clone();
                }
                if !discovered.is_empty() {
                    existing.source = discovered.source;
                }
                let mut metadata = discovered.metadata.clone();
                metadata.fill_from(&existing.metadata);
                existing.metadata = metadata;
                existing.last_updated = chrono::Utc::now();
                existing
            }
            None => TldServerEntry::from_discovery(&key, &discovered),
        };

        self.directory.upsert(entry.clone()).await?;
        tracing::info!(tld = %key, found = entry.has_endpoint(), "refreshed TLD entry");
        Ok(entry)
    }

    /// First candidate suffix with an active entry that has an endpoint.
    ///
    /// Unknown suffixes are discovered and the result, even an empty one, is
    /// stored before moving on.
    async fn find_entry(
        &self,
        domain: &str,
        trace: &mut Vec<TraceEntry>,
    ) -> Result<Option<TldServerEntry>, LookupError> {
        for candidate in suffix_candidates(domain) {
            let key = canonical_tld(&candidate);

            let entry = match self.directory.get(&key).await? {
                Some(entry) => {
                    push(trace, TraceStep::Directory, format!("{} found in directory", key));
                    entry
                }
                None => {
                    let discovered = self.discovery.discover(&key).await;
                    let entry = TldServerEntry::from_discovery(&key, &discovered);
                    self.directory.upsert(entry.clone()).await?;
                    push(
                        trace,
                        TraceStep::Discovery,
                        format!(
                            "{} discovered: rdap={} whois={}",
                            key,
                            entry.rdap_base_url.as_deref().unwrap_or("none"),
                            entry.whois_server.as_deref().unwrap_or("none")
                        ),
                    );
                    entry
                }
            };

            if !entry.is_active {
                push(trace, TraceStep::Directory, format!("{} is inactive", key));
                continue;
            }
            if !entry.has_endpoint() {
                push(trace, TraceStep::Directory, format!("{} has no known servers", key));
                continue;
            }
            return Ok(Some(entry));
        }

        Ok(None)
    }

    async fn attempt_rdap(
        &self,
        domain: &str,
        entry: TldServerEntry,
        trace: &mut Vec<TraceEntry>,
    ) -> State {
        let Some(base_url) = entry.rdap_base_url.clone() else {
            return State::RdapAttempted {
                entry,
                partial: None,
            };
        };

        match self.rdap_client.query(&base_url, domain, &entry.tld).await {
            RdapOutcome::Available => {
                push(trace, TraceStep::Rdap, "available".to_string());
                State::Done(Ok(DomainRecord::available(domain, &entry.tld, RawSource::Rdap)))
            }
            RdapOutcome::Found(record) if record.expiration_date.is_some() => {
                push(trace, TraceStep::Rdap, "found".to_string());
                State::Done(Ok(record))
            }
            RdapOutcome::Found(record) => {
                push(trace, TraceStep::Rdap, "found without expiration date".to_string());
                State::RdapAttempted {
                    entry,
                    partial: Some(record),
                }
            }
            RdapOutcome::Failed(reason) => {
                tracing::warn!(%domain, %base_url, %reason, "RDAP attempt failed");
                push(trace, TraceStep::Rdap, format!("failed: {}", reason));
                State::RdapAttempted {
                    entry,
                    partial: None,
                }
            }
        }
    }

    async fn attempt_whois(
        &self,
        domain: &str,
        entry: &TldServerEntry,
        partial: Option<DomainRecord>,
        trace: &mut Vec<TraceEntry>,
    ) -> State {
        let server = match entry.whois_server.as_deref() {
            Some(server) if server.eq_ignore_ascii_case(IANA_WHOIS_HOST) => {
                push(trace, TraceStep::Whois, "skipped IANA server".to_string());
                return State::WhoisAttempted { partial };
            }
            Some(server) => server,
            None => return State::WhoisAttempted { partial },
        };

        match self.whois_client.lookup(server, domain, &entry.tld).await {
            WhoisOutcome::Available => match partial {
                // RDAP already returned a domain object; it stays authoritative
                Some(record) => {
                    push(
                        trace,
                        TraceStep::Whois,
                        "reported available, ignored after RDAP record".to_string(),
                    );
                    State::Done(Ok(record))
                }
                None => {
                    push(trace, TraceStep::Whois, "available".to_string());
                    State::Done(Ok(DomainRecord::available(domain, &entry.tld, RawSource::Whois)))
                }
            },
            WhoisOutcome::Found(whois) => {
                let record = match partial {
                    Some(rdap) => {
                        push(trace, TraceStep::Whois, "found, merged into RDAP record".to_string());
                        merge_records(rdap, whois)
                    }
                    None => {
                        push(trace, TraceStep::Whois, "found".to_string());
                        whois
                    }
                };
                State::Done(Ok(record))
            }
            WhoisOutcome::Failed(reason) => {
                tracing::warn!(%domain, %server, %reason, "WHOIS attempt failed");
                push(trace, TraceStep::Whois, format!("failed: {}", reason));
                State::WhoisAttempted { partial }
            }
        }
    }
}

fn push(trace: &mut Vec<TraceEntry>, step: TraceStep, detail: String) {
    tracing::debug!(?step, %detail, "resolution step");
    trace.push(TraceEntry { step, detail });
}

fn failure_details(trace: &[TraceEntry]) -> Vec<String> {
    trace
        .iter()
        .filter(|t| matches!(t.step, TraceStep::Rdap | TraceStep::Whois))
        .map(|t| {
            let protocol = if t.step == TraceStep::Rdap { "RDAP" } else { "WHOIS" };
            format!("{} {}", protocol, t.detail)
        })
        .collect()
}

/// Fill fields missing from the RDAP record with WHOIS values.
///
/// Populated fields are never overwritten. `whois_supplemented` is set when
/// at least one field was filled.
pub fn merge_records(mut rdap: DomainRecord, whois: DomainRecord) -> DomainRecord {
    let mut filled = false;

    macro_rules! fill {
        ($field:ident) => {
            if rdap.$field.is_none() && whois.$field.is_some() {
                rdap.$field = whois.$field;
                filled = true;
            }
        };
    }

    fill!(registrar);
    fill!(registrar_url);
    fill!(creation_date);
    fill!(expiration_date);
    fill!(updated_date);
    fill!(abuse_email);

    if rdap.status.is_empty() && !whois.status.is_empty() {
        rdap.status = whois.status;
        filled = true;
    }
    if rdap.nameservers.is_empty() && !whois.nameservers.is_empty() {
        rdap.nameservers = whois.nameservers;
        filled = true;
    }

    rdap.whois_supplemented = rdap.whois_supplemented || filled;
    rdap
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_merge_fills_only_missing_fields() {
        let mut rdap = DomainRecord::new("example.nl", ".nl", RawSource::Rdap);
        rdap.registrar = Some("RDAP Registrar".to_string());
        rdap.status = vec!["active".to_string()];

        let mut whois = DomainRecord::new("example.nl", ".nl", RawSource::Whois);
        whois.registrar = Some("WHOIS Registrar".to_string());
        whois.expiration_date = Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
        whois.status = vec!["ok".to_string()];
        whois.abuse_email = Some("abuse@example.nl".to_string());

        let merged = merge_records(rdap, whois);
        assert_eq!(merged.registrar.as_deref(), Some("RDAP Registrar"));
        assert_eq!(merged.status, vec!["active"]);
        assert!(merged.expiration_date.is_some());
        assert_eq!(merged.abuse_email.as_deref(), Some("abuse@example.nl"));
        assert_eq!(merged.raw_source, RawSource::Rdap);
        assert!(merged.whois_supplemented);
    }

    #[test]
    fn test_merge_with_nothing_to_add() {
        let mut rdap = DomainRecord::new("example.nl", ".nl", RawSource::Rdap);
        rdap.registrar = Some("RDAP Registrar".to_string());
        let whois = DomainRecord::new("example.nl", ".nl", RawSource::Whois);

        let merged = merge_records(rdap, whois);
        assert!(!merged.whois_supplemented);
    }

    struct NothingFound {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TldDiscovery for NothingFound {
        async fn discover(&self, _tld: &str) -> crate::types::DiscoveredServers {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            crate::types::DiscoveredServers::empty()
        }
    }

    #[tokio::test]
    async fn test_negative_discovery_is_cached_per_suffix() {
        let directory = Arc::new(crate::directory::MemoryTldDirectory::new());
        let discovery = Arc::new(NothingFound {
            calls: Default::default(),
        });
        let resolver =
            Resolver::new(directory.clone(), discovery.clone(), &ClientConfig::default()).unwrap();

        let first = resolver.resolve_with_trace("shop.example.co.uk").await;
        match first.result {
            Err(LookupError::ResolutionFailed { attempts, .. }) => assert!(attempts.is_empty()),
            other => panic!("expected ResolutionFailed, got {:?}", other),
        }
        assert_eq!(first.trace[0].step, TraceStep::Discovery);
        assert_eq!(discovery.calls.load(std::sync::atomic::Ordering::SeqCst), 2);

        // Both suffixes were stored, so nothing is rediscovered
        assert!(directory.get(".co.uk").await.unwrap().is_some());
        assert!(directory.get(".uk").await.unwrap().is_some());
        assert!(resolver.resolve("other.co.uk").await.is_err());
        assert_eq!(discovery.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resolve_many_keeps_input_order() {
        let resolver = Resolver::new(
            Arc::new(crate::directory::MemoryTldDirectory::new()),
            Arc::new(NothingFound {
                calls: Default::default(),
            }),
            &ClientConfig::default(),
        )
        .unwrap();

        let domains = vec!["bad domain".to_string(), "example.zz".to_string()];
        let results: Vec<_> = resolver.resolve_many(&domains).collect().await;
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(LookupError::InvalidDomain { .. })));
        assert!(matches!(results[1], Err(LookupError::ResolutionFailed { .. })));
    }

    #[tokio::test]
    async fn test_inactive_entry_is_skipped() {
        let mut entry = TldServerEntry::new("zz", crate::types::EntrySource::Manual);
        entry.whois_server = Some("whois.nic.zz".to_string());
        entry.is_active = false;
        let directory = Arc::new(crate::directory::MemoryTldDirectory::with_entries(vec![entry]));
        let discovery = Arc::new(NothingFound {
            calls: Default::default(),
        });
        let resolver = Resolver::new(directory, discovery, &ClientConfig::default()).unwrap();

        let resolution = resolver.resolve_with_trace("example.zz").await;
        assert!(resolution.result.is_err());
        assert!(resolution
            .trace
            .iter()
            .any(|t| t.detail == ".zz is inactive"));
    }

    #[test]
    fn test_failure_details_only_protocol_steps() {
        let trace = vec![
            TraceEntry {
                step: TraceStep::Discovery,
                detail: ".zz discovered".to_string(),
            },
            TraceEntry {
                step: TraceStep::Rdap,
                detail: "failed: HTTP 500".to_string(),
            },
            TraceEntry {
                step: TraceStep::Whois,
                detail: "failed: empty response".to_string(),
            },
        ];
        assert_eq!(
            failure_details(&trace),
            vec!["RDAP failed: HTTP 500", "WHOIS failed: empty response"]
        );
    }
}
