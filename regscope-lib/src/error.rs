//! Error handling for registration data resolution.
//!
//! Per-attempt protocol failures are not errors in this library: RDAP and WHOIS
//! return tagged outcomes so the resolver can fall back. The variants here cover
//! what a caller actually has to handle: invalid input, a resolution where every
//! attempt failed, storage problems, and setup failures of bulk imports.

use std::fmt;

/// Main error type for resolution, discovery and import operations.
#[derive(Debug, Clone)]
pub enum LookupError {
    /// Invalid domain name or TLD format
    InvalidDomain {
        domain: String,
        reason: String,
    },

    /// Network-related errors (connection, timeout, etc.)
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// Every available attempt for a domain failed
    ResolutionFailed {
        domain: String,
        attempts: Vec<String>,
    },

    /// An IANA source could not be fetched or understood
    IanaSource {
        source_name: String,
        message: String,
    },

    /// JSON or text parsing errors
    ParseError {
        message: String,
    },

    /// Configuration errors (invalid settings, etc.)
    ConfigError {
        message: String,
    },

    /// TLD directory or import log storage failures
    StorageError {
        message: String,
    },

    /// Bulk import lifecycle errors (duplicate running import, unknown log, ...)
    ImportError {
        message: String,
    },

    /// File I/O errors when reading configuration or stores
    FileError {
        path: String,
        message: String,
    },

    /// Timeout errors when operations take too long
    Timeout {
        operation: String,
        duration: std::time::Duration,
    },

}

impl LookupError {
    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a resolution failure carrying the reason of each failed attempt.
    pub fn resolution_failed<D: Into<String>>(domain: D, attempts: Vec<String>) -> Self {
        Self::ResolutionFailed {
            domain: domain.into(),
            attempts,
        }
    }

    /// Create a new IANA source error.
    pub fn iana<S: Into<String>, M: Into<String>>(source_name: S, message: M) -> Self {
        Self::IanaSource {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a new parse error.
    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new storage error.
    pub fn storage<M: Into<String>>(message: M) -> Self {
        Self::StorageError {
            message: message.into(),
        }
    }

    /// Create a new import lifecycle error.
    pub fn import<M: Into<String>>(message: M) -> Self {
        Self::ImportError {
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomain { domain, reason } => {
                write!(f, "Invalid domain '{}': {}", domain, reason)
            }
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::ResolutionFailed { domain, attempts } => {
                if attempts.is_empty() {
                    write!(
                        f,
                        "Unable to retrieve registration data for '{}': no RDAP or WHOIS server known",
                        domain
                    )
                } else {
                    write!(
                        f,
                        "Unable to retrieve registration data for '{}': {}",
                        domain,
                        attempts.join("; ")
                    )
                }
            }
            Self::IanaSource {
                source_name,
                message,
            } => {
                write!(f, "IANA {} error: {}", source_name, message)
            }
            Self::ParseError { message } => {
                write!(f, "Parse error: {}", message)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::StorageError { message } => {
                write!(f, "Storage error: {}", message)
            }
            Self::ImportError { message } => {
                write!(f, "Import error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
        }
    }
}

impl std::error::Error for LookupError {}

// Implement From conversions for common error types
impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout("HTTP request", std::time::Duration::from_secs(10))
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError {
            message: format!("JSON parsing failed: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_failed_display_lists_attempts() {
        let err = LookupError::resolution_failed(
            "example.zz",
            vec![
                "rdap: HTTP 503".to_string(),
                "whois: connection refused".to_string(),
            ],
        );
        let text = err.to_string();
        assert!(text.contains("Unable to retrieve registration data"));
        assert!(text.contains("rdap: HTTP 503; whois: connection refused"));
    }

    #[test]
    fn test_resolution_failed_without_attempts() {
        let err = LookupError::resolution_failed("example.zz", Vec::new());
        assert!(err.to_string().contains("no RDAP or WHOIS server known"));
    }

    #[test]
    fn test_parse_error_display() {
        let err = LookupError::parse("Unrecognized date 'soon'");
        assert_eq!(err.to_string(), "Parse error: Unrecognized date 'soon'");
    }
}
