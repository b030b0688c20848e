//! IANA sources for TLD server discovery.
//!
//! Four sources are used:
//!
//! - the RDAP bootstrap registry (`dns.json`), mapping TLDs to RDAP base URLs
//! - `whois.iana.org`, which names each TLD's WHOIS server
//! - the root zone database page for a TLD, scraped as a last resort
//! - the TLD list (`tlds-alpha-by-domain.txt`), used by bulk imports
//!
//! [`IanaDiscoveryClient`] combines the first three behind the
//! [`TldDiscovery`] trait so the resolver can be tested with a fake.

use crate::error::LookupError;
use crate::protocols::whois::{parse_pairs, WhoisClient, WHOIS_PORT};
use crate::types::{ClientConfig, DiscoveredServers, EntrySource, TldMetadata};
use crate::utils::bare_tld;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// How long a fetched bootstrap document is reused.
const BOOTSTRAP_TTL: Duration = Duration::from_secs(24 * 3600);

lazy_static! {
    static ref HTML_WHOIS_SERVER: Regex =
        Regex::new(r"(?i)WHOIS Server:\s*(?:<[^>]*>\s*)*([^\s<]+)").expect("valid pattern");
    static ref HTML_LAST_UPDATED: Regex =
        Regex::new(r"(?i)Record last updated\s+(\d{4}-\d{2}-\d{2})").expect("valid pattern");
    static ref HTML_REGISTRY_URL: Regex =
        Regex::new(r#"(?i)URL for registration services:\s*(?:<[^>]*>\s*)*([^\s<"]+)"#)
            .expect("valid pattern");
    static ref HTML_REGISTRATION_DATE: Regex =
        Regex::new(r"(?i)Registration date\s+(\d{4}-\d{2}-\d{2})").expect("valid pattern");
    static ref TLD_LIST_VERSION: Regex =
        Regex::new(r"(?i)version\s+(\d+)").expect("valid pattern");
}

/// Discovers the servers responsible for a TLD.
///
/// Implementations never fail on "not found": an empty
/// [`DiscoveredServers`] is a valid answer.
#[async_trait]
pub trait TldDiscovery: Send + Sync {
    async fn discover(&self, tld: &str) -> DiscoveredServers;
}

/// The IANA data the bulk import service reads.
#[async_trait]
pub trait IanaDataSource: Send + Sync {
    async fn fetch_tld_list(&self) -> Result<TldList, LookupError>;
    async fn fetch_bootstrap(&self) -> Result<Arc<RdapBootstrap>, LookupError>;
    async fn iana_whois(&self, tld: &str) -> Result<IanaWhoisInfo, LookupError>;
    async fn root_db_page(&self, tld: &str) -> Result<Option<RootDbInfo>, LookupError>;
}

/// Locations of the IANA sources.
#[derive(Debug, Clone, PartialEq)]
pub struct IanaSources {
    pub bootstrap_url: String,
    pub tld_list_url: String,
    /// Root zone database base; pages live at `{base}/{tld}.html`
    pub root_db_base_url: String,
    pub whois_host: String,
    pub whois_port: u16,
}

impl Default for IanaSources {
    fn default() -> Self {
        Self {
            bootstrap_url: "https://data.iana.org/rdap/dns.json".to_string(),
            tld_list_url: "https://data.iana.org/TLD/tlds-alpha-by-domain.txt".to_string(),
            root_db_base_url: "https://www.iana.org/domains/root/db".to_string(),
            whois_host: "whois.iana.org".to_string(),
            whois_port: WHOIS_PORT,
        }
    }
}

/// One `services` row of the bootstrap registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapService {
    pub tlds: Vec<String>,
    pub urls: Vec<String>,
}

/// Parsed IANA RDAP bootstrap registry (RFC 9224).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RdapBootstrap {
    pub publication: Option<String>,
    pub version: Option<String>,
    pub services: Vec<BootstrapService>,
}

impl RdapBootstrap {
    /// Parse the registry JSON.
    pub fn parse(json: &serde_json::Value) -> Result<Self, LookupError> {
        let services = json
            .get("services")
            .and_then(|s| s.as_array())
            .ok_or_else(|| {
                LookupError::iana(
                    "rdap bootstrap",
                    "Invalid bootstrap JSON: missing or invalid 'services' array",
                )
            })?;

        let strings = |value: Option<&serde_json::Value>| -> Vec<String> {
            value
                .and_then(|v| v.as_array())
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|i| i.as_str())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default()
        };

        let services = services
            .iter()
            .filter_map(|service| service.as_array())
            .filter(|row| row.len() >= 2)
            .map(|row| BootstrapService {
                tlds: strings(row.first()),
                urls: strings(row.get(1)),
            })
            .filter(|service| !service.urls.is_empty())
            .collect();

        Ok(Self {
            publication: json
                .get("publication")
                .and_then(|p| p.as_str())
                .map(String::from),
            version: json.get("version").and_then(|v| v.as_str()).map(String::from),
            services,
        })
    }

    /// First RDAP URL of the service whose TLD list contains `tld`.
    pub fn lookup(&self, tld: &str) -> Option<&str> {
        let tld = bare_tld(tld);
        self.services
            .iter()
            .find(|service| service.tlds.iter().any(|t| t.eq_ignore_ascii_case(&tld)))
            .and_then(|service| service.urls.first())
            .map(String::as_str)
    }

    /// Every `(tld, first url)` pair in the registry.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.services
            .iter()
            .filter_map(|service| service.urls.first().map(|url| (service, url)))
            .flat_map(|(service, url)| {
                service
                    .tlds
                    .iter()
                    .map(move |tld| (tld.to_lowercase(), url.clone()))
            })
            .collect()
    }
}

/// Parsed IANA TLD list.
#[derive(Debug, Clone, PartialEq)]
pub struct TldList {
    /// Number from the `# Version NNNNNNNNNN, Last Updated ...` header
    pub version: Option<String>,
    /// Lowercase labels without dots
    pub tlds: Vec<String>,
}

impl TldList {
    pub fn parse(text: &str) -> Self {
        let mut version = None;
        let mut tlds = Vec::new();

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(header) = line.strip_prefix('#') {
                if version.is_none() {
                    version = TLD_LIST_VERSION
                        .captures(header)
                        .and_then(|c| c.get(1))
                        .map(|m| m.as_str().to_string());
                }
                continue;
            }
            tlds.push(line.to_lowercase());
        }

        Self { version, tlds }
    }
}

/// What `whois.iana.org` says about a TLD.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IanaWhoisInfo {
    /// The `domain:` the record describes, lowercased.
    pub domain: Option<String>,
    pub whois_server: Option<String>,
    pub refer: Option<String>,
    pub metadata: TldMetadata,
}

impl IanaWhoisInfo {
    /// `whois:` if present, else `refer:`.
    pub fn server(&self) -> Option<&str> {
        self.whois_server.as_deref().or(self.refer.as_deref())
    }

    /// Whether this record is about `tld` itself.
    ///
    /// For a name that is not a TLD, IANA answers with the parent TLD's
    /// record, which must not be attributed to the queried suffix.
    pub fn describes(&self, tld: &str) -> bool {
        self.domain.as_deref() == Some(bare_tld(tld).as_str())
    }
}

/// Parse a `whois.iana.org` TLD response.
pub fn parse_iana_whois(text: &str) -> IanaWhoisInfo {
    let mut info = IanaWhoisInfo::default();

    for (key, value) in parse_pairs(text) {
        match key.to_lowercase().as_str() {
            "domain" if info.domain.is_none() => info.domain = Some(value.to_lowercase()),
            "whois" if info.whois_server.is_none() => info.whois_server = Some(value),
            "refer" if info.refer.is_none() => info.refer = Some(value),
            "created" if info.metadata.registration_date.is_none() => {
                info.metadata.registration_date = Some(value)
            }
            "changed" if info.metadata.record_last_updated.is_none() => {
                info.metadata.record_last_updated = Some(value)
            }
            "remarks" if info.metadata.registry_url.is_none() => {
                if let Some((label, url)) = value.split_once(':') {
                    let url = url.trim();
                    if label.trim().eq_ignore_ascii_case("registration information")
                        && !url.is_empty()
                    {
                        info.metadata.registry_url = Some(url.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    info
}

/// Fields scraped from a root zone database page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootDbInfo {
    pub whois_server: Option<String>,
    pub metadata: TldMetadata,
}

/// Extract the WHOIS server and registry metadata from a root DB page.
pub fn parse_root_db_page(html: &str) -> RootDbInfo {
    let capture = |re: &Regex| {
        re.captures(html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    };

    RootDbInfo {
        whois_server: capture(&HTML_WHOIS_SERVER),
        metadata: TldMetadata {
            registry_url: capture(&HTML_REGISTRY_URL),
            registration_date: capture(&HTML_REGISTRATION_DATE),
            record_last_updated: capture(&HTML_LAST_UPDATED),
        },
    }
}

struct CachedBootstrap {
    fetched_at: Instant,
    document: Arc<RdapBootstrap>,
}

/// Client for the IANA discovery sources.
pub struct IanaDiscoveryClient {
    http_client: reqwest::Client,
    whois: WhoisClient,
    sources: IanaSources,
    bootstrap_cache: RwLock<Option<CachedBootstrap>>,
}

impl IanaDiscoveryClient {
    /// Create a client for the public IANA sources.
    pub fn new(config: &ClientConfig) -> Result<Self, LookupError> {
        Self::with_sources(config, IanaSources::default())
    }

    /// Create a client for custom source locations.
    pub fn with_sources(config: &ClientConfig, sources: IanaSources) -> Result<Self, LookupError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.iana_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                LookupError::network_with_source("Failed to create IANA HTTP client", e.to_string())
            })?;

        let whois = WhoisClient::with_config(config).with_port(sources.whois_port);

        Ok(Self {
            http_client,
            whois,
            sources,
            bootstrap_cache: RwLock::new(None),
        })
    }

    pub fn sources(&self) -> &IanaSources {
        &self.sources
    }

    async fn get_text(&self, url: &str, source: &str) -> Result<(StatusCode, String), LookupError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| LookupError::iana(source, format!("Request to {} failed: {}", url, e)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LookupError::iana(source, format!("Failed to read {}: {}", url, e)))?;
        Ok((status, body))
    }

    /// Download the bootstrap registry and refresh the cache.
    pub async fn fetch_bootstrap(&self) -> Result<Arc<RdapBootstrap>, LookupError> {
        let (status, body) = self
            .get_text(&self.sources.bootstrap_url, "rdap bootstrap")
            .await?;
        if !status.is_success() {
            return Err(LookupError::iana(
                "rdap bootstrap",
                format!("Bootstrap registry returned HTTP {}", status.as_u16()),
            ));
        }

        let json: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            LookupError::iana("rdap bootstrap", format!("Failed to parse bootstrap JSON: {}", e))
        })?;
        let document = Arc::new(RdapBootstrap::parse(&json)?);

        tracing::info!(
            services = document.services.len(),
            publication = document.publication.as_deref().unwrap_or("unknown"),
            "fetched RDAP bootstrap"
        );

        *self.bootstrap_cache.write().await = Some(CachedBootstrap {
            fetched_at: Instant::now(),
            document: Arc::clone(&document),
        });

        Ok(document)
    }

    /// The bootstrap registry, fetched at most once per TTL.
    pub async fn bootstrap(&self) -> Result<Arc<RdapBootstrap>, LookupError> {
        if let Some(cached) = self.bootstrap_cache.read().await.as_ref() {
            if cached.fetched_at.elapsed() < BOOTSTRAP_TTL {
                return Ok(Arc::clone(&cached.document));
            }
        }
        self.fetch_bootstrap().await
    }

    /// Download the IANA TLD list.
    pub async fn fetch_tld_list(&self) -> Result<TldList, LookupError> {
        let (status, body) = self.get_text(&self.sources.tld_list_url, "tld list").await?;
        if !status.is_success() {
            return Err(LookupError::iana(
                "tld list",
                format!("TLD list returned HTTP {}", status.as_u16()),
            ));
        }

        let list = TldList::parse(&body);
        if list.tlds.is_empty() {
            return Err(LookupError::iana("tld list", "TLD list is empty"));
        }
        Ok(list)
    }

    /// Ask `whois.iana.org` about a TLD.
    ///
    /// An answer about a different domain (the parent TLD of a multi-label
    /// suffix) yields an empty [`IanaWhoisInfo`].
    pub async fn iana_whois(&self, tld: &str) -> Result<IanaWhoisInfo, LookupError> {
        let text = self
            .whois
            .query(&self.sources.whois_host, &bare_tld(tld))
            .await?;
        let info = parse_iana_whois(&text);
        if !info.describes(tld) {
            tracing::debug!(
                %tld,
                answered_for = info.domain.as_deref().unwrap_or("-"),
                "IANA WHOIS answer is not about the queried suffix"
            );
            return Ok(IanaWhoisInfo::default());
        }
        Ok(info)
    }

    /// Fetch and scrape the root zone database page for a TLD.
    ///
    /// Returns `Ok(None)` when IANA has no page for it (HTTP 404).
    pub async fn root_db_page(&self, tld: &str) -> Result<Option<RootDbInfo>, LookupError> {
        let url = format!(
            "{}/{}.html",
            self.sources.root_db_base_url.trim_end_matches('/'),
            bare_tld(tld)
        );
        let (status, body) = self.get_text(&url, "root zone database").await?;

        match status {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(parse_root_db_page(&body))),
            s => Err(LookupError::iana(
                "root zone database",
                format!("{} returned HTTP {}", url, s.as_u16()),
            )),
        }
    }
}

#[async_trait]
impl IanaDataSource for IanaDiscoveryClient {
    async fn fetch_tld_list(&self) -> Result<TldList, LookupError> {
        IanaDiscoveryClient::fetch_tld_list(self).await
    }

    async fn fetch_bootstrap(&self) -> Result<Arc<RdapBootstrap>, LookupError> {
        IanaDiscoveryClient::fetch_bootstrap(self).await
    }

    async fn iana_whois(&self, tld: &str) -> Result<IanaWhoisInfo, LookupError> {
        IanaDiscoveryClient::iana_whois(self, tld).await
    }

    async fn root_db_page(&self, tld: &str) -> Result<Option<RootDbInfo>, LookupError> {
        IanaDiscoveryClient::root_db_page(self, tld).await
    }
}

#[async_trait]
impl TldDiscovery for IanaDiscoveryClient {
    async fn discover(&self, tld: &str) -> DiscoveredServers {
        let mut found = DiscoveredServers::empty();
        let mut whois_source = None;

        match self.bootstrap().await {
            Ok(bootstrap) => found.rdap_base_url = bootstrap.lookup(tld).map(String::from),
            Err(e) => tracing::warn!(%tld, error = %e, "RDAP bootstrap unavailable"),
        }

        match self.iana_whois(tld).await {
            Ok(info) => {
                if let Some(server) = info.server() {
                    found.whois_server = Some(server.to_string());
                    whois_source = Some(EntrySource::IanaWhois);
                }
                found.metadata.fill_from(&info.metadata);
            }
            Err(e) => tracing::warn!(%tld, error = %e, "IANA WHOIS query failed"),
        }

        if found.rdap_base_url.is_none() || found.whois_server.is_none() {
            match self.root_db_page(tld).await {
                Ok(Some(page)) => {
                    if found.whois_server.is_none() {
                        if let Some(server) = page.whois_server {
                            found.whois_server = Some(server);
                            whois_source = Some(EntrySource::IanaHtml);
                        }
                    }
                    found.metadata.fill_from(&page.metadata);
                }
                Ok(None) => tracing::debug!(%tld, "no root zone database page"),
                Err(e) => tracing::warn!(%tld, error = %e, "root zone database lookup failed"),
            }
        }

        found.source = if found.rdap_base_url.is_some() {
            EntrySource::IanaRdap
        } else {
            whois_source.unwrap_or(EntrySource::IanaWhois)
        };

        tracing::info!(
            %tld,
            rdap = found.rdap_base_url.as_deref().unwrap_or("-"),
            whois = found.whois_server.as_deref().unwrap_or("-"),
            "discovered TLD servers"
        );

        found
    }
}
