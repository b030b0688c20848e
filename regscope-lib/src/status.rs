//! Lifecycle status classification.
//!
//! Pure functions: the expiring threshold is always supplied by the caller.

use crate::types::LifecycleStatus;
use chrono::{DateTime, Utc};

const SECONDS_PER_DAY: i64 = 86_400;

/// Whether any raw status token marks the domain as unregistered.
///
/// Matches `available` and `free` as substrings (RDAP registries such as SIDN
/// report `"free"`) and the WHOIS phrase `not registered`.
pub fn has_availability_marker(tokens: &[String]) -> bool {
    tokens.iter().any(|token| {
        let token = token.to_lowercase();
        token.contains("available") || token.contains("free") || token.contains("not registered")
    })
}

/// Classify a domain's lifecycle status relative to now.
///
/// # Arguments
///
/// * `expiration_date` - Registry expiration date, if known
/// * `tokens` - Raw registry status tokens
/// * `threshold_days` - Days before expiration at which a domain counts as expiring
pub fn classify(
    expiration_date: Option<DateTime<Utc>>,
    tokens: &[String],
    threshold_days: i64,
) -> LifecycleStatus {
    classify_at(expiration_date, tokens, threshold_days, Utc::now())
}

/// Classify a domain's lifecycle status relative to an explicit `now`.
pub fn classify_at(
    expiration_date: Option<DateTime<Utc>>,
    tokens: &[String],
    threshold_days: i64,
    now: DateTime<Utc>,
) -> LifecycleStatus {
    if has_availability_marker(tokens) {
        return LifecycleStatus::Available;
    }

    let Some(expiration) = expiration_date else {
        return LifecycleStatus::Unknown;
    };

    let days_left = (expiration - now).num_seconds().div_euclid(SECONDS_PER_DAY);

    if days_left < 0 {
        LifecycleStatus::Expired
    } else if days_left <= threshold_days {
        LifecycleStatus::Expiring
    } else {
        LifecycleStatus::Active
    }
}
