//! Utility functions for domain processing and validation.
//!
//! This module contains helper functions for domain name validation,
//! TLD canonicalization, suffix derivation and registry date parsing.

use crate::error::LookupError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Validate a domain name and return it normalized (trimmed, lowercase, no trailing dot).
///
/// # Arguments
///
/// * `domain` - The domain name to validate
///
/// # Returns
///
/// The normalized domain, or `Err(LookupError)` if invalid.
pub fn normalize_domain(domain: &str) -> Result<String, LookupError> {
    let normalized = domain.trim().trim_end_matches('.').to_lowercase();

    if normalized.is_empty() {
        return Err(LookupError::invalid_domain(
            domain,
            "Domain name cannot be empty",
        ));
    }

    if !is_valid_fqdn(&normalized) {
        return Err(LookupError::invalid_domain(
            domain,
            "Domain must be a fully qualified name like example.com",
        ));
    }

    Ok(normalized)
}

/// Canonical directory key for a TLD: lowercase with a single leading dot.
///
/// `"COM"`, `".com"` and `"com."` all become `".com"`.
pub fn canonical_tld(tld: &str) -> String {
    let bare = tld.trim().trim_matches('.').to_lowercase();
    format!(".{}", bare)
}

/// The TLD label without its leading dot, as sent to IANA sources.
pub fn bare_tld(tld: &str) -> String {
    tld.trim().trim_matches('.').to_lowercase()
}

/// Derive the candidate registry suffixes for a domain, most specific first.
///
/// Domains with three or more labels yield the two-label suffix and then the
/// single-label one (`shop.example.co.uk` -> `["co.uk", "uk"]`). Two-label
/// domains yield only the last label.
pub fn suffix_candidates(domain: &str) -> Vec<String> {
    let labels: Vec<&str> = domain.split('.').filter(|l| !l.is_empty()).collect();

    match labels.len() {
        0 | 1 => Vec::new(),
        2 => vec![labels[1].to_string()],
        n => vec![
            format!("{}.{}", labels[n - 2], labels[n - 1]),
            labels[n - 1].to_string(),
        ],
    }
}

/// Validate that an FQDN has basic valid structure.
pub(crate) fn is_valid_fqdn(domain: &str) -> bool {
    if domain.len() < 3 || domain.len() > 253 {
        return false;
    }

    if !domain.contains('.') {
        return false;
    }

    if domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }

    for part in domain.split('.') {
        if part.is_empty() || part.len() > 63 {
            return false;
        }

        if part.starts_with('-') || part.ends_with('-') {
            return false;
        }

        // IDNs are accepted in Unicode form as well as punycode
        if !part.chars().all(|c| c.is_alphanumeric() || c == '-') {
            return false;
        }
    }

    true
}

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y.%m.%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d-%b-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d", "%d.%m.%Y", "%d-%m-%Y", "%d/%m/%Y", "%d-%b-%Y", "%d %b %Y",
    "%b %d %Y",
];

/// Parse a registry date string into a UTC timestamp.
///
/// RDAP dates are RFC 3339; WHOIS servers use a zoo of formats. Trailing
/// timezone labels like `UTC`, `(UTC)` or `GMT` are ignored. Returns `None`
/// for anything unrecognized.
pub fn parse_registry_date(raw: &str) -> Option<DateTime<Utc>> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let cleaned = value
        .trim_end_matches("(UTC)")
        .trim_end_matches("UTC")
        .trim_end_matches("GMT")
        .trim_end_matches('Z')
        .trim();

    if let Ok(dt) = DateTime::parse_from_str(cleaned, "%Y-%m-%d %H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }

    for format in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(cleaned, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    // Compact YYYYMMDD, used by a few ccTLD registries
    if cleaned.len() == 8 && cleaned.chars().all(|c| c.is_ascii_digit()) {
        let year = cleaned[0..4].parse().ok()?;
        let month = cleaned[4..6].parse().ok()?;
        let day = cleaned[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|n| Utc.from_utc_datetime(&n));
    }

    // Date-only values, possibly followed by a time part we failed to understand
    let date_part = cleaned.split_whitespace().next().unwrap_or(cleaned);
    for candidate in [cleaned, date_part] {
        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(candidate, format) {
                return date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
            }
        }
    }

    None
}
