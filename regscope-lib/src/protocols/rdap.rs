//! RDAP (Registration Data Access Protocol) client.
//!
//! Issues one domain query against a registry's RDAP base URL and turns the
//! JSON answer into a [`DomainRecord`]. Per-attempt problems are reported as
//! [`RdapOutcome::Failed`] so the resolver can fall back to WHOIS; only client
//! construction returns an error.

use crate::error::LookupError;
use crate::types::{ClientConfig, DomainRecord, RawSource};
use crate::utils::parse_registry_date;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde_json::Value;

const RDAP_ACCEPT: &str = "application/rdap+json, application/json, */*";

/// Result of a single RDAP query.
#[derive(Debug, Clone, PartialEq)]
pub enum RdapOutcome {
    /// The registry says the domain is not registered.
    Available,
    /// The registry returned a domain object.
    Found(DomainRecord),
    /// Network error, timeout, unexpected status or unparseable body.
    Failed(String),
}

/// RDAP client for querying registry RDAP services.
#[derive(Clone)]
pub struct RdapClient {
    http_client: reqwest::Client,
}

impl RdapClient {
    /// Create a new RDAP client with default settings.
    pub fn new() -> Result<Self, LookupError> {
        Self::with_config(&ClientConfig::default())
    }

    /// Create a new RDAP client using the timeout and user agent from `config`.
    pub fn with_config(config: &ClientConfig) -> Result<Self, LookupError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(RDAP_ACCEPT));

        let http_client = reqwest::Client::builder()
            .timeout(config.rdap_timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| {
                LookupError::network_with_source("Failed to create RDAP HTTP client", e.to_string())
            })?;

        Ok(Self { http_client })
    }

    /// Query `domain` against the RDAP service rooted at `base_url`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - RDAP base URL from the TLD directory (e.g., "https://rdap.verisign.com/com/v1/")
    /// * `domain` - Normalized domain name
    /// * `tld` - Canonical suffix the base URL belongs to, copied into the record
    ///
    /// # Returns
    ///
    /// An [`RdapOutcome`]; this never fails as a `Result`.
    pub async fn query(&self, base_url: &str, domain: &str, tld: &str) -> RdapOutcome {
        let url = domain_url(base_url, domain);
        tracing::debug!(%url, "RDAP query");

        let response = match self.http_client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("RDAP request to {} timed out", url)
                } else {
                    format!("RDAP request to {} failed: {}", url, e)
                };
                return RdapOutcome::Failed(reason);
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return RdapOutcome::Failed(format!("Failed to read RDAP body: {}", e)),
        };

        let outcome = interpret_response(status, &body, domain, tld);
        tracing::debug!(%url, status = status.as_u16(), outcome = outcome_label(&outcome), "RDAP answer");
        outcome
    }
}

/// Build the domain query URL for an RDAP base.
///
/// A trailing slash is dropped, and a base that already ends in `/domain` is
/// not given a second one.
pub fn domain_url(base_url: &str, domain: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    if base.ends_with("/domain") {
        format!("{}/{}", base, domain)
    } else {
        format!("{}/domain/{}", base, domain)
    }
}

/// `errorCode` as a number, also accepting the quoted form some servers send.
fn parse_error_code(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Map an HTTP status and body to an outcome.
///
/// The checks run in order: RDAP error object with `errorCode` 404, a status
/// token that marks the name as free, a plain 200 domain object, and finally
/// failure.
pub fn interpret_response(status: StatusCode, body: &str, domain: &str, tld: &str) -> RdapOutcome {
    let json: Option<Value> = serde_json::from_str(body).ok();

    if let Some(json) = &json {
        let error_code = json.get("errorCode").and_then(parse_error_code);
        if (status == StatusCode::OK || status == StatusCode::NOT_FOUND) && error_code == Some(404) {
            return RdapOutcome::Available;
        }

        if status_tokens(json).iter().any(|token| {
            let token = token.to_lowercase();
            token.contains("free") || token.contains("available")
        }) {
            return RdapOutcome::Available;
        }

        if status == StatusCode::OK && json.is_object() && error_code.is_none() {
            return RdapOutcome::Found(extract_domain_record(json, domain, tld));
        }
    }

    if status == StatusCode::OK {
        RdapOutcome::Failed("RDAP server returned a body that is not a domain object".to_string())
    } else {
        RdapOutcome::Failed(format!("RDAP server returned HTTP {}", status.as_u16()))
    }
}

fn outcome_label(outcome: &RdapOutcome) -> &'static str {
    match outcome {
        RdapOutcome::Available => "available",
        RdapOutcome::Found(_) => "found",
        RdapOutcome::Failed(_) => "failed",
    }
}

fn status_tokens(json: &Value) -> Vec<String> {
    json.get("status")
        .and_then(|s| s.as_array())
        .map(|statuses| {
            statuses
                .iter()
                .filter_map(|s| s.as_str())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Extract registration details from an RDAP domain object.
///
/// # Arguments
///
/// * `json` - The RDAP JSON response
/// * `domain` - Domain name the record is for
/// * `tld` - Canonical suffix that answered
///
/// # Returns
///
/// A `DomainRecord` with `raw_source` RDAP. Missing fields stay `None`.
pub fn extract_domain_record(json: &Value, domain: &str, tld: &str) -> DomainRecord {
    let mut record = DomainRecord::new(domain, tld, RawSource::Rdap);

    let entities = json
        .get("entities")
        .and_then(|e| e.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    if let Some(registrar) = entities.iter().find(|e| has_role(e, "registrar")) {
        record.registrar =
            vcard_text(registrar, "fn")
                .or_else(|| vcard_text(registrar, "org"))
                .or_else(|| extract_entity_identifier(registrar));
        record.registrar_url = vcard_text(registrar, "url");
    }

    record.abuse_email = find_abuse_email(entities);

    if let Some(events) = json.get("events").and_then(|e| e.as_array()) {
        for event in events {
            let (Some(action), Some(date)) = (
                event.get("eventAction").and_then(|a| a.as_str()),
                event.get("eventDate").and_then(|d| d.as_str()),
            ) else {
                continue;
            };

            let parsed = parse_registry_date(date);
            match action.to_lowercase().as_str() {
                "expiration" => record.expiration_date = record.expiration_date.or(parsed),
                "registration" => record.creation_date = record.creation_date.or(parsed),
                "last changed" | "last update of rdap database" => {
                    record.updated_date = record.updated_date.or(parsed)
                }
                _ => {}
            }
        }
    }

    record.status = status_tokens(json);

    if let Some(nameservers) = json.get("nameservers").and_then(|ns| ns.as_array()) {
        record.nameservers = nameservers
            .iter()
            .filter_map(|ns| ns.get("ldhName").and_then(|n| n.as_str()))
            .map(|n| n.to_lowercase())
            .collect();
    }

    record
}

fn has_role(entity: &Value, role: &str) -> bool {
    entity
        .get("roles")
        .and_then(|r| r.as_array())
        .map(|roles| {
            roles
                .iter()
                .any(|r| r.as_str().is_some_and(|r| r.eq_ignore_ascii_case(role)))
        })
        .unwrap_or(false)
}

/// Abuse contact: an `abuse` entity nested under any top-level entity, or a
/// top-level one.
fn find_abuse_email(entities: &[Value]) -> Option<String> {
    for entity in entities {
        if has_role(entity, "abuse") {
            if let Some(email) = vcard_text(entity, "email") {
                return Some(email);
            }
        }
        if let Some(nested) = entity.get("entities").and_then(|e| e.as_array()) {
            if let Some(email) = find_abuse_email(nested) {
                return Some(email);
            }
        }
    }
    None
}

/// Read the text value of the first vCard property named `property`.
fn vcard_text(entity: &Value, property: &str) -> Option<String> {
    let items = entity
        .get("vcardArray")
        .and_then(|v| v.as_array())
        .and_then(|a| a.get(1))
        .and_then(|a| a.as_array())?;

    items.iter().find_map(|item| {
        let item = item.as_array()?;
        if item.len() < 4 || item.first().and_then(|f| f.as_str()) != Some(property) {
            return None;
        }
        let value = match &item[3] {
            Value::String(s) => s.trim().to_string(),
            // `org` may carry its units as an array
            Value::Array(parts) => parts
                .iter()
                .filter_map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            _ => return None,
        };
        let value = value.strip_prefix("mailto:").unwrap_or(&value).to_string();
        (!value.is_empty()).then_some(value)
    })
}

/// Extract entity identifier from publicIds or handle.
fn extract_entity_identifier(entity: &Value) -> Option<String> {
    if let Some(id) = entity
        .get("publicIds")
        .and_then(|p| p.as_array())
        .and_then(|ids| ids.first())
        .and_then(|id| id.get("identifier"))
        .and_then(|i| i.as_str())
    {
        return Some(id.to_string());
    }

    entity
        .get("handle")
        .or_else(|| entity.get("name"))
        .and_then(|h| h.as_str())
        .map(String::from)
}
