//! WHOIS protocol client (RFC 3912).
//!
//! Opens a plain TCP connection to a WHOIS server, sends the query line and
//! reads until the server closes the connection. Responses are free-form
//! text, so parsing is a best effort: availability phrases are checked first,
//! then `key: value` lines are mapped onto [`DomainRecord`] fields through
//! alias lists.

use crate::error::LookupError;
use crate::types::{ClientConfig, DomainRecord, RawSource};
use crate::utils::parse_registry_date;
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Standard WHOIS port.
pub const WHOIS_PORT: u16 = 43;

/// Upper bound on the bytes read from one response.
const MAX_RESPONSE_BYTES: u64 = 1024 * 1024;

lazy_static! {
    static ref AVAILABLE_LINE: Regex = Regex::new(
        r"^(?:(?:domain )?status:\s*)?(?:not found|no match|no entries found|no data found|domain not found|no such domain|available for registration|does not exist|queried object does not exist|is free|not registered)$"
    )
    .expect("availability pattern is valid");

    // Phrases that open a line and name the queried domain,
    // e.g. `No match for "EXAMPLE.COM".`
    static ref AVAILABLE_PREFIX: Regex =
        Regex::new(r"^(?:no match for|no entries found for|no data found for|not found:)\s")
            .expect("availability prefix pattern is valid");
}

const REGISTRAR_KEYS: &[&str] = &[
    "registrar",
    "sponsoring registrar",
    "registrar name",
    "registrar organization",
];
const REGISTRAR_URL_KEYS: &[&str] = &["registrar url", "referral url", "registrar website"];
const EXPIRATION_KEYS: &[&str] = &[
    "registry expiry date",
    "registrar registration expiration date",
    "expiration date",
    "expiry date",
    "expires on",
    "expires",
    "expire",
    "expiration time",
    "paid-till",
    "renewal date",
];
const UPDATED_KEYS: &[&str] = &[
    "updated date",
    "last updated",
    "last modified",
    "last update",
    "modified",
    "changed",
];
const CREATION_KEYS: &[&str] = &[
    "creation date",
    "created on",
    "created",
    "registered on",
    "registered",
    "registration time",
    "domain registration date",
];
const ABUSE_EMAIL_KEYS: &[&str] = &[
    "registrar abuse contact email",
    "abuse contact email",
    "abuse email",
    "abuse-mailbox",
];
const STATUS_KEYS: &[&str] = &["domain status", "status", "state"];
const NAMESERVER_KEYS: &[&str] = &["name server", "nameserver", "nameservers", "nserver"];

/// Result of a single WHOIS domain lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum WhoisOutcome {
    /// The response contained an availability phrase.
    Available,
    /// Parsed registration data.
    Found(DomainRecord),
    /// Connection failure, timeout, or a response with nothing to parse.
    Failed(String),
}

/// WHOIS client talking to servers over TCP.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    /// Applied separately to connecting and to reading the response
    timeout: Duration,
    port: u16,
}

impl WhoisClient {
    /// Create a new WHOIS client with default settings.
    pub fn new() -> Self {
        Self::with_config(&ClientConfig::default())
    }

    pub fn with_config(config: &ClientConfig) -> Self {
        Self {
            timeout: config.whois_timeout,
            port: WHOIS_PORT,
        }
    }

    /// Create a new WHOIS client with custom timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Connect to servers on `port` instead of 43.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Send one query and return the raw response text.
    ///
    /// # Arguments
    ///
    /// * `server` - WHOIS server hostname (e.g., "whois.verisign-grs.com")
    /// * `query` - Domain or TLD to ask about
    ///
    /// # Errors
    ///
    /// `LookupError::Timeout` if connecting or reading exceeds the timeout,
    /// `LookupError::NetworkError` for socket errors.
    pub async fn query(&self, server: &str, query: &str) -> Result<String, LookupError> {
        let address = format!("{}:{}", server, self.port);
        tracing::debug!(%address, %query, "WHOIS query");

        let mut stream = tokio::time::timeout(self.timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| LookupError::timeout(format!("WHOIS connect to {}", address), self.timeout))?
            .map_err(|e| {
                LookupError::network_with_source(
                    format!("Failed to connect to WHOIS server {}", address),
                    e.to_string(),
                )
            })?;

        let read = async {
            stream.write_all(format!("{}\r\n", query).as_bytes()).await?;
            let mut buffer = Vec::new();
            (&mut stream)
                .take(MAX_RESPONSE_BYTES)
                .read_to_end(&mut buffer)
                .await?;
            Ok::<_, std::io::Error>(buffer)
        };

        let buffer = tokio::time::timeout(self.timeout, read)
            .await
            .map_err(|_| LookupError::timeout(format!("WHOIS read from {}", address), self.timeout))?
            .map_err(|e| {
                LookupError::network_with_source(
                    format!("WHOIS exchange with {} failed", address),
                    e.to_string(),
                )
            })?;

        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Look up a domain on its registry's WHOIS server.
    ///
    /// # Arguments
    ///
    /// * `server` - The TLD's WHOIS server
    /// * `domain` - Normalized domain name
    /// * `tld` - Canonical suffix the server belongs to, copied into the record
    pub async fn lookup(&self, server: &str, domain: &str, tld: &str) -> WhoisOutcome {
        match self.query(server, domain).await {
            Ok(text) => interpret_response(&text, domain, tld),
            Err(e) => WhoisOutcome::Failed(e.to_string()),
        }
    }
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn raw response text into an outcome.
pub fn interpret_response(text: &str, domain: &str, tld: &str) -> WhoisOutcome {
    if detect_availability(text) {
        return WhoisOutcome::Available;
    }

    let pairs = parse_pairs(text);
    if pairs.is_empty() {
        return WhoisOutcome::Failed("empty response".to_string());
    }

    let record = record_from_pairs(&pairs, domain, tld);
    if !has_registration_fields(&record) {
        return WhoisOutcome::Failed("no registration fields in response".to_string());
    }

    WhoisOutcome::Found(record)
}

/// A record counts as found only if it names a registrar, a date or a status.
fn has_registration_fields(record: &DomainRecord) -> bool {
    record.registrar.is_some()
        || record.creation_date.is_some()
        || record.updated_date.is_some()
        || record.expiration_date.is_some()
        || !record.status.is_empty()
}

/// Whether any line of the response is an availability phrase, bare or as
/// the value of `status:` / `domain status:`, or opens with a "no match for"
/// style prefix.
pub fn detect_availability(text: &str) -> bool {
    text.lines().any(|line| {
        let line = line.trim().trim_end_matches('.').to_lowercase();
        AVAILABLE_LINE.is_match(&line) || AVAILABLE_PREFIX.is_match(&line)
    })
}

/// Split a response into `(key, value)` pairs.
///
/// Comment lines (`%`, `#`) and lines without a colon are skipped. Lines are
/// split on the first colon, both sides trimmed; pairs with an empty key or
/// value are dropped. Order and duplicates are preserved.
pub fn parse_pairs(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('%') && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let (key, value) = (key.trim(), value.trim());
            (!key.is_empty() && !value.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

/// Map parsed pairs onto a WHOIS-sourced record.
pub fn record_from_pairs(pairs: &[(String, String)], domain: &str, tld: &str) -> DomainRecord {
    let mut record = DomainRecord::new(domain, tld, RawSource::Whois);

    record.registrar = first_value(pairs, REGISTRAR_KEYS).map(String::from);
    record.registrar_url = first_value(pairs, REGISTRAR_URL_KEYS).map(String::from);
    record.abuse_email = first_value(pairs, ABUSE_EMAIL_KEYS).map(String::from);
    record.expiration_date = first_date(pairs, EXPIRATION_KEYS);
    record.updated_date = first_date(pairs, UPDATED_KEYS);
    record.creation_date = first_date(pairs, CREATION_KEYS);

    record.status = all_values(pairs, STATUS_KEYS)
        .into_iter()
        .map(strip_status_url)
        .filter(|s| !s.is_empty())
        .collect();

    record.nameservers = all_values(pairs, NAMESERVER_KEYS)
        .into_iter()
        .filter_map(|v| v.split_whitespace().next())
        .map(|ns| ns.trim_end_matches('.').to_lowercase())
        .collect();

    record
}

/// Value of the highest-priority alias present.
fn first_value<'a>(pairs: &'a [(String, String)], aliases: &[&str]) -> Option<&'a str> {
    aliases.iter().find_map(|alias| {
        pairs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(alias))
            .map(|(_, value)| value.as_str())
    })
}

/// Like [`first_value`], skipping values that are not dates.
fn first_date(pairs: &[(String, String)], aliases: &[&str]) -> Option<chrono::DateTime<chrono::Utc>> {
    aliases.iter().find_map(|alias| {
        pairs
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(alias))
            .find_map(|(_, value)| parse_registry_date(value))
    })
}

fn all_values<'a>(pairs: &'a [(String, String)], aliases: &[&str]) -> Vec<&'a str> {
    pairs
        .iter()
        .filter(|(key, _)| aliases.iter().any(|alias| key.eq_ignore_ascii_case(alias)))
        .map(|(_, value)| value.as_str())
        .collect()
}

/// `clientTransferProhibited https://icann.org/epp#clientTransferProhibited`
/// becomes `clientTransferProhibited`.
fn strip_status_url(value: &str) -> String {
    let cut = value
        .find(" http")
        .or_else(|| value.find(" (http"))
        .unwrap_or(value.len());
    value[..cut].trim().trim_end_matches('(').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    const VERISIGN_SAMPLE: &str = "   Domain Name: EXAMPLE.COM\r
   Registry Domain ID: 2336799_DOMAIN_COM-VRSN\r
   Registrar WHOIS Server: whois.iana.org\r
   Registrar URL: http://res-dom.iana.org\r
   Updated Date: 2024-08-14T07:01:34Z\r
   Creation Date: 1995-08-14T04:00:00Z\r
   Registry Expiry Date: 2030-08-13T04:00:00Z\r
   Registrar: RESERVED-Internet Assigned Numbers Authority\r
   Registrar IANA ID: 376\r
   Registrar Abuse Contact Email: abuse@iana.org\r
   Domain Status: clientDeleteProhibited https://icann.org/epp#clientDeleteProhibited\r
   Domain Status: clientTransferProhibited https://icann.org/epp#clientTransferProhibited\r
   Name Server: A.IANA-SERVERS.NET\r
   Name Server: B.IANA-SERVERS.NET\r
>>> Last update of whois database: 2026-10-17T10:00:00Z <<<\r
";

    #[test]
    fn test_availability_phrases() {
        assert!(detect_availability("Domain Status: is free\n"));
        assert!(detect_availability("% comment\nNOT FOUND\n"));
        assert!(detect_availability("status:   available for registration"));
        assert!(detect_availability("  No entries found.  "));

        // Phrases embedded in prose are not availability markers
        assert!(!detect_availability(
            "NOTICE: if the domain is not found here, try the registrar"
        ));
        assert!(!detect_availability(VERISIGN_SAMPLE));
    }

    const VERISIGN_NO_MATCH: &str = "No match for \"UNREGISTERED-ZQX.COM\".\r
>>> Last update of whois database: 2026-10-17T10:05:12Z <<<\r
\r
NOTICE: The expiration date displayed in this record is the date the\r
registrar's sponsorship of the domain name registration in the registry is\r
currently set to expire. This date does not necessarily reflect the expiration\r
date of the domain name registrant's agreement with the sponsoring\r
registrar.\r
\r
TERMS OF USE: You are not authorized to access or query our Whois\r
database through the use of electronic processes that are high-volume and\r
automated except as reasonably necessary to register domain names.\r
";

    #[test]
    fn test_verisign_no_match_is_available() {
        assert!(detect_availability(VERISIGN_NO_MATCH));
        assert_eq!(
            interpret_response(VERISIGN_NO_MATCH, "unregistered-zqx.com", ".com"),
            WhoisOutcome::Available
        );
    }

    #[test]
    fn test_boilerplate_without_registration_fields_fails() {
        let text = ">>> Last update of whois database: 2026-10-17T10:05:12Z <<<\n\
                    NOTICE: rate limit exceeded, try again later\n\
                    TERMS OF USE: automated queries are not permitted\n";
        assert!(matches!(
            interpret_response(text, "example.com", ".com"),
            WhoisOutcome::Failed(_)
        ));
    }

    #[test]
    fn test_is_free_wins_before_parsing() {
        let text = "Domain Name: vrij.nl\nDomain Status: is free\nRegistrar: Something\n";
        assert_eq!(
            interpret_response(text, "vrij.nl", ".nl"),
            WhoisOutcome::Available
        );
    }

    #[test]
    fn test_parse_pairs_keeps_order_and_duplicates() {
        let pairs = parse_pairs("# header\n% note\nA: 1\nB:2\nA: 3\nno colon here\nEmpty:\n");
        assert_eq!(
            pairs,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "2".to_string()),
                ("A".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_value_split_on_first_colon() {
        let pairs = parse_pairs("Registrar URL: https://www.example.net:8443/path");
        assert_eq!(pairs[0].1, "https://www.example.net:8443/path");
    }

    #[test]
    fn test_record_from_verisign_response() {
        let outcome = interpret_response(VERISIGN_SAMPLE, "example.com", ".com");
        let WhoisOutcome::Found(record) = outcome else {
            panic!("expected found, got {:?}", outcome);
        };

        assert_eq!(record.raw_source, RawSource::Whois);
        assert_eq!(
            record.registrar.as_deref(),
            Some("RESERVED-Internet Assigned Numbers Authority")
        );
        assert_eq!(record.registrar_url.as_deref(), Some("http://res-dom.iana.org"));
        assert_eq!(record.abuse_email.as_deref(), Some("abuse@iana.org"));
        assert_eq!(record.expiration_date.map(|d| d.year()), Some(2030));
        assert_eq!(record.creation_date.map(|d| d.year()), Some(1995));
        assert_eq!(record.updated_date.map(|d| d.year()), Some(2024));
        assert_eq!(
            record.status,
            vec!["clientDeleteProhibited", "clientTransferProhibited"]
        );
        assert_eq!(
            record.nameservers,
            vec!["a.iana-servers.net", "b.iana-servers.net"]
        );
    }

    #[test]
    fn test_cctld_aliases() {
        let text = "domain: example.ru\nstate: REGISTERED, DELEGATED, VERIFIED\nregistrar: RU-CENTER-RU\ncreated: 1999-01-01T00:00:00Z\npaid-till: 2030-02-01T00:00:00Z\nnserver: ns1.example.ru.\n";
        let WhoisOutcome::Found(record) = interpret_response(text, "example.ru", ".ru") else {
            panic!("expected found");
        };
        assert_eq!(record.registrar.as_deref(), Some("RU-CENTER-RU"));
        assert_eq!(record.expiration_date.map(|d| d.month()), Some(2));
        assert_eq!(record.status, vec!["REGISTERED, DELEGATED, VERIFIED"]);
        assert_eq!(record.nameservers, vec!["ns1.example.ru"]);
    }

    #[test]
    fn test_empty_response_fails() {
        assert_eq!(
            interpret_response("", "a.com", ".com"),
            WhoisOutcome::Failed("empty response".to_string())
        );
        assert!(matches!(
            interpret_response("% only comments\n# here\n", "a.com", ".com"),
            WhoisOutcome::Failed(_)
        ));
    }

    #[test]
    fn test_strip_status_url() {
        assert_eq!(
            strip_status_url("ok (https://icann.org/epp#ok)"),
            "ok"
        );
        assert_eq!(strip_status_url("active"), "active");
    }

    #[test]
    fn test_whois_client_creation() {
        let client = WhoisClient::new();
        assert_eq!(client.timeout, Duration::from_secs(10));
        assert_eq!(client.port, WHOIS_PORT);

        let custom = WhoisClient::new()
            .with_timeout(Duration::from_secs(2))
            .with_port(4343);
        assert_eq!(custom.timeout, Duration::from_secs(2));
        assert_eq!(custom.port, 4343);
    }

    #[tokio::test]
    async fn test_connection_refused_is_failed_outcome() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = WhoisClient::new()
            .with_port(port)
            .with_timeout(Duration::from_secs(2));
        let outcome = client.lookup("127.0.0.1", "example.com", ".com").await;
        assert!(matches!(outcome, WhoisOutcome::Failed(_)));
    }
}
