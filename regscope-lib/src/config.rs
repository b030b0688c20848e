//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `RS_*`
//! environment variables, merging them with proper precedence rules, and
//! turning the result into the settings the library components take.

use crate::error::LookupError;
use crate::import::ImportSettings;
use crate::protocols::IanaSources;
use crate::types::ClientConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default days-before-expiration threshold for the `expiring` status.
pub const DEFAULT_THRESHOLD_DAYS: i64 = 30;

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<DirectoryConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub import: Option<ImportConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub classify: Option<ClassifyConfig>,

    /// Overrides for IANA source locations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iana: Option<IanaConfig>,
}

/// Timeouts and HTTP identity.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct NetworkConfig {
    /// RDAP request timeout (as string, e.g., "10s", "1m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rdap_timeout: Option<String>,

    /// WHOIS connect and read timeout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_timeout: Option<String>,

    /// Timeout for IANA downloads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iana_timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DirectoryConfig {
    /// Directory holding the TLD directory and import log files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ImportConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_batch_size: Option<usize>,

    /// Idle time after which a running import is abandoned (e.g., "1h")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_after: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClassifyConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct IanaConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tld_list_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_db_base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_port: Option<u16>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to log which config files were found
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The parsed configuration or an error if reading, parsing or
    /// validation fails.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, LookupError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LookupError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            LookupError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            LookupError::config(format!(
                "Failed to parse TOML configuration {}: {}",
                path.display(),
                e
            ))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is loaded first, then the home directory file, then the
    /// local file; later files win per field. Files that fail to parse are
    /// skipped with a warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, LookupError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping config file"),
            }
        }

        if self.verbose {
            for path in &loaded_files {
                tracing::info!(path = %path.display(), "loaded config file");
            }
        }

        Ok(merged_config)
    }

    /// Get the local configuration file path.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./regscope.toml", "./.regscope.toml"]
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Get the global configuration file path in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        let path = Path::new(&home).join(".regscope.toml");
        path.exists().then_some(path)
    }

    /// Get the XDG configuration file path.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("regscope").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations with proper precedence.
    ///
    /// Values from `higher` take precedence over values from `lower`.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            network: merge_section(lower.network, higher.network, |lower, higher| NetworkConfig {
                rdap_timeout: higher.rdap_timeout.or(lower.rdap_timeout),
                whois_timeout: higher.whois_timeout.or(lower.whois_timeout),
                iana_timeout: higher.iana_timeout.or(lower.iana_timeout),
                user_agent: higher.user_agent.or(lower.user_agent),
            }),
            directory: merge_section(lower.directory, higher.directory, |lower, higher| {
                DirectoryConfig {
                    data_dir: higher.data_dir.or(lower.data_dir),
                }
            }),
            import: merge_section(lower.import, higher.import, |lower, higher| ImportConfig {
                batch_size: higher.batch_size.or(lower.batch_size),
                whois_batch_size: higher.whois_batch_size.or(lower.whois_batch_size),
                stale_after: higher.stale_after.or(lower.stale_after),
            }),
            classify: merge_section(lower.classify, higher.classify, |lower, higher| {
                ClassifyConfig {
                    threshold_days: higher.threshold_days.or(lower.threshold_days),
                }
            }),
            iana: merge_section(lower.iana, higher.iana, |lower, higher| IanaConfig {
                bootstrap_url: higher.bootstrap_url.or(lower.bootstrap_url),
                tld_list_url: higher.tld_list_url.or(lower.tld_list_url),
                root_db_base_url: higher.root_db_base_url.or(lower.root_db_base_url),
                whois_host: higher.whois_host.or(lower.whois_host),
                whois_port: higher.whois_port.or(lower.whois_port),
            }),
        }
    }

    /// Validate a configuration for common issues.
    pub fn validate_config(&self, config: &FileConfig) -> Result<(), LookupError> {
        if let Some(network) = &config.network {
            for (name, value) in [
                ("rdap_timeout", &network.rdap_timeout),
                ("whois_timeout", &network.whois_timeout),
                ("iana_timeout", &network.iana_timeout),
            ] {
                if let Some(value) = value {
                    validate_timeout(name, value)?;
                }
            }
        }

        if let Some(import) = &config.import {
            if let Some(batch_size) = import.batch_size {
                validate_batch_size("batch_size", batch_size, 1000)?;
            }
            if let Some(whois_batch_size) = import.whois_batch_size {
                validate_batch_size("whois_batch_size", whois_batch_size, 100)?;
            }
            if let Some(stale_after) = &import.stale_after {
                validate_timeout("stale_after", stale_after)?;
            }
        }

        if let Some(threshold) = config.classify.as_ref().and_then(|c| c.threshold_days) {
            validate_threshold(threshold)?;
        }

        if let Some(iana) = &config.iana {
            for (name, value) in [
                ("bootstrap_url", &iana.bootstrap_url),
                ("tld_list_url", &iana.tld_list_url),
                ("root_db_base_url", &iana.root_db_base_url),
            ] {
                if let Some(url) = value {
                    if !(url.starts_with("http://") || url.starts_with("https://")) {
                        return Err(LookupError::config(format!(
                            "iana.{} must be an http(s) URL, got '{}'",
                            name, url
                        )));
                    }
                }
            }
            if iana.whois_port == Some(0) {
                return Err(LookupError::config("iana.whois_port cannot be 0"));
            }
        }

        Ok(())
    }
}

fn merge_section<T>(lower: Option<T>, higher: Option<T>, merge: impl FnOnce(T, T) -> T) -> Option<T> {
    match (lower, higher) {
        (Some(lower), Some(higher)) => Some(merge(lower, higher)),
        (None, higher) => higher,
        (lower, None) => lower,
    }
}

fn validate_timeout(name: &str, value: &str) -> Result<(), LookupError> {
    match parse_timeout_string(value) {
        Some(seconds) if seconds > 0 => Ok(()),
        _ => Err(LookupError::config(format!(
            "Invalid {} '{}'. Use format like '10s', '2m', '1h'",
            name, value
        ))),
    }
}

fn validate_batch_size(name: &str, value: usize, max: usize) -> Result<(), LookupError> {
    if value == 0 || value > max {
        return Err(LookupError::config(format!(
            "{} must be between 1 and {}",
            name, max
        )));
    }
    Ok(())
}

fn validate_threshold(days: i64) -> Result<(), LookupError> {
    if !(0..=3650).contains(&days) {
        return Err(LookupError::config(
            "threshold_days must be between 0 and 3650",
        ));
    }
    Ok(())
}

/// Environment variable configuration.
///
/// Values set via `RS_*` environment variables; they override config files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub rdap_timeout: Option<String>,
    pub whois_timeout: Option<String>,
    pub data_dir: Option<String>,
    pub batch_size: Option<usize>,
    pub threshold_days: Option<i64>,
    /// Explicit config file path
    pub config: Option<String>,
}

/// Load configuration from the process environment.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Load configuration from an arbitrary variable lookup.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(value) = non_empty("RS_RDAP_TIMEOUT") {
        if validate_timeout("RS_RDAP_TIMEOUT", &value).is_ok() {
            env_config.rdap_timeout = Some(value);
        } else {
            tracing::warn!(%value, "invalid RS_RDAP_TIMEOUT, use format like '10s' or '2m'");
        }
    }

    if let Some(value) = non_empty("RS_WHOIS_TIMEOUT") {
        if validate_timeout("RS_WHOIS_TIMEOUT", &value).is_ok() {
            env_config.whois_timeout = Some(value);
        } else {
            tracing::warn!(%value, "invalid RS_WHOIS_TIMEOUT, use format like '10s' or '2m'");
        }
    }

    env_config.data_dir = non_empty("RS_DATA_DIR");

    if let Some(value) = non_empty("RS_BATCH_SIZE") {
        match value.trim().parse::<usize>() {
            Ok(size) if validate_batch_size("RS_BATCH_SIZE", size, 1000).is_ok() => {
                env_config.batch_size = Some(size)
            }
            _ => tracing::warn!(%value, "invalid RS_BATCH_SIZE, must be 1-1000"),
        }
    }

    if let Some(value) = non_empty("RS_THRESHOLD_DAYS") {
        match value.trim().parse::<i64>() {
            Ok(days) if validate_threshold(days).is_ok() => env_config.threshold_days = Some(days),
            _ => tracing::warn!(%value, "invalid RS_THRESHOLD_DAYS, must be 0-3650"),
        }
    }

    env_config.config = non_empty("RS_CONFIG");

    env_config
}

/// Effective settings after applying defaults, files and environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientConfig,
    pub iana: IanaSources,
    pub import: ImportSettings,
    pub threshold_days: i64,
    pub data_dir: PathBuf,
}

impl Settings {
    /// Build settings; environment values win over file values.
    pub fn resolve(file: &FileConfig, env_config: &EnvConfig) -> Result<Self, LookupError> {
        let network = file.network.clone().unwrap_or_default();
        let import = file.import.clone().unwrap_or_default();
        let iana = file.iana.clone().unwrap_or_default();

        let mut client = ClientConfig::default();
        if let Some(timeout) = env_config.rdap_timeout.as_ref().or(network.rdap_timeout.as_ref()) {
            client.rdap_timeout = timeout_duration("rdap_timeout", timeout)?;
        }
        if let Some(timeout) = env_config
            .whois_timeout
            .as_ref()
            .or(network.whois_timeout.as_ref())
        {
            client.whois_timeout = timeout_duration("whois_timeout", timeout)?;
        }
        if let Some(timeout) = &network.iana_timeout {
            client.iana_timeout = timeout_duration("iana_timeout", timeout)?;
        }
        if let Some(user_agent) = network.user_agent {
            client.user_agent = user_agent;
        }

        let defaults = IanaSources::default();
        let iana = IanaSources {
            bootstrap_url: iana.bootstrap_url.unwrap_or(defaults.bootstrap_url),
            tld_list_url: iana.tld_list_url.unwrap_or(defaults.tld_list_url),
            root_db_base_url: iana.root_db_base_url.unwrap_or(defaults.root_db_base_url),
            whois_host: iana.whois_host.unwrap_or(defaults.whois_host),
            whois_port: iana.whois_port.unwrap_or(defaults.whois_port),
        };

        let mut import_settings = ImportSettings::default();
        if let Some(size) = env_config.batch_size.or(import.batch_size) {
            import_settings = import_settings.with_batch_size(size);
        }
        if let Some(size) = import.whois_batch_size {
            import_settings = import_settings.with_whois_batch_size(size);
        }
        if let Some(stale_after) = &import.stale_after {
            import_settings =
                import_settings.with_stale_after(timeout_duration("stale_after", stale_after)?);
        }

        let threshold_days = env_config
            .threshold_days
            .or(file.classify.as_ref().and_then(|c| c.threshold_days))
            .unwrap_or(DEFAULT_THRESHOLD_DAYS);
        validate_threshold(threshold_days)?;

        let data_dir = env_config
            .data_dir
            .clone()
            .or(file.directory.as_ref().and_then(|d| d.data_dir.clone()))
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        Ok(Self {
            client,
            iana,
            import: import_settings,
            threshold_days,
            data_dir,
        })
    }

    /// Path of the TLD directory file.
    pub fn directory_path(&self) -> PathBuf {
        self.data_dir.join("tld-directory.json")
    }

    /// Path of the import log file.
    pub fn import_log_path(&self) -> PathBuf {
        self.data_dir.join("imports.json")
    }
}

/// `$XDG_DATA_HOME/regscope`, `~/.local/share/regscope`, or `./.regscope`.
pub fn default_data_dir() -> PathBuf {
    env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".local").join("share")))
        .map(|base| base.join("regscope"))
        .unwrap_or_else(|| PathBuf::from(".regscope"))
}

fn timeout_duration(name: &str, value: &str) -> Result<Duration, LookupError> {
    validate_timeout(name, value)?;
    parse_timeout_string(value)
        .map(Duration::from_secs)
        .ok_or_else(|| LookupError::config(format!("Invalid {} '{}'", name, value)))
}

/// Parse a timeout string like "5s", "2m", "1h" into seconds.
///
/// # Arguments
///
/// * `timeout_str` - String representation of timeout
///
/// # Returns
///
/// Number of seconds, or None if parsing fails.
pub fn parse_timeout_string(timeout_str: &str) -> Option<u64> {
    let timeout_str = timeout_str.trim().to_lowercase();

    if let Some(seconds) = timeout_str.strip_suffix('s') {
        seconds.trim().parse::<u64>().ok()
    } else if let Some(minutes) = timeout_str.strip_suffix('m') {
        minutes.trim().parse::<u64>().ok().map(|m| m * 60)
    } else if let Some(hours) = timeout_str.strip_suffix('h') {
        hours.trim().parse::<u64>().ok().map(|h| h * 3600)
    } else {
        // Assume seconds if no unit
        timeout_str.parse::<u64>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_parse_timeout_string() {
        assert_eq!(parse_timeout_string("5s"), Some(5));
        assert_eq!(parse_timeout_string("30s"), Some(30));
        assert_eq!(parse_timeout_string("2m"), Some(120));
        assert_eq!(parse_timeout_string("1h"), Some(3600));
        assert_eq!(parse_timeout_string("5"), Some(5));
        assert_eq!(parse_timeout_string("invalid"), None);
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"
[network]
rdap_timeout = "15s"
user_agent = "ops-bot/1.0"

[import]
batch_size = 100
stale_after = "30m"

[classify]
threshold_days = 14

[iana]
whois_host = "whois.example.test"
whois_port = 4343
"#,
        );

        let manager = ConfigManager::new(false);
        let config = manager.load_file(temp_file.path()).unwrap();

        let network = config.network.unwrap();
        assert_eq!(network.rdap_timeout.as_deref(), Some("15s"));
        assert_eq!(network.user_agent.as_deref(), Some("ops-bot/1.0"));
        assert_eq!(config.import.unwrap().batch_size, Some(100));
        assert_eq!(config.classify.unwrap().threshold_days, Some(14));
        assert_eq!(config.iana.unwrap().whois_port, Some(4343));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let manager = ConfigManager::new(false);

        let bad_timeout = write_config("[network]\nrdap_timeout = \"soon\"\n");
        assert!(matches!(
            manager.load_file(bad_timeout.path()),
            Err(LookupError::ConfigError { .. })
        ));

        let bad_batch = write_config("[import]\nbatch_size = 0\n");
        assert!(manager.load_file(bad_batch.path()).is_err());

        let bad_url = write_config("[iana]\nbootstrap_url = \"ftp://example\"\n");
        assert!(manager.load_file(bad_url.path()).is_err());

        let bad_toml = write_config("[network\n");
        assert!(manager.load_file(bad_toml.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let manager = ConfigManager::new(false);
        assert!(matches!(
            manager.load_file("/nonexistent/regscope.toml"),
            Err(LookupError::FileError { .. })
        ));
    }

    #[test]
    fn test_merge_higher_wins_per_field() {
        let manager = ConfigManager::new(false);

        let lower = FileConfig {
            network: Some(NetworkConfig {
                rdap_timeout: Some("5s".to_string()),
                whois_timeout: Some("7s".to_string()),
                ..Default::default()
            }),
            classify: Some(ClassifyConfig {
                threshold_days: Some(10),
            }),
            ..Default::default()
        };
        let higher = FileConfig {
            network: Some(NetworkConfig {
                rdap_timeout: Some("20s".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let merged = manager.merge_configs(lower, higher);
        let network = merged.network.unwrap();
        assert_eq!(network.rdap_timeout.as_deref(), Some("20s"));
        assert_eq!(network.whois_timeout.as_deref(), Some("7s"));
        assert_eq!(merged.classify.unwrap().threshold_days, Some(10));
    }

    #[test]
    fn test_env_config_parsing() {
        let vars: HashMap<&str, &str> = [
            ("RS_RDAP_TIMEOUT", "3s"),
            ("RS_WHOIS_TIMEOUT", "nonsense"),
            ("RS_BATCH_SIZE", "25"),
            ("RS_THRESHOLD_DAYS", "-5"),
            ("RS_DATA_DIR", "/var/lib/regscope"),
            ("RS_CONFIG", "  "),
        ]
        .into_iter()
        .collect();

        let env_config = load_env_config_from(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(env_config.rdap_timeout.as_deref(), Some("3s"));
        assert_eq!(env_config.whois_timeout, None);
        assert_eq!(env_config.batch_size, Some(25));
        assert_eq!(env_config.threshold_days, None);
        assert_eq!(env_config.data_dir.as_deref(), Some("/var/lib/regscope"));
        assert_eq!(env_config.config, None);
    }

    #[test]
    fn test_settings_resolution_precedence() {
        let file = FileConfig {
            network: Some(NetworkConfig {
                rdap_timeout: Some("20s".to_string()),
                whois_timeout: Some("4s".to_string()),
                ..Default::default()
            }),
            directory: Some(DirectoryConfig {
                data_dir: Some("/from/file".to_string()),
            }),
            import: Some(ImportConfig {
                batch_size: Some(80),
                whois_batch_size: Some(5),
                stale_after: Some("2h".to_string()),
            }),
            classify: Some(ClassifyConfig {
                threshold_days: Some(14),
            }),
            iana: Some(IanaConfig {
                whois_port: Some(4343),
                ..Default::default()
            }),
        };
        let env_config = EnvConfig {
            rdap_timeout: Some("2s".to_string()),
            threshold_days: Some(60),
            ..Default::default()
        };

        let settings = Settings::resolve(&file, &env_config).unwrap();
        assert_eq!(settings.client.rdap_timeout, Duration::from_secs(2));
        assert_eq!(settings.client.whois_timeout, Duration::from_secs(4));
        assert_eq!(settings.threshold_days, 60);
        assert_eq!(settings.import.batch_size, 80);
        assert_eq!(settings.import.whois_batch_size, 5);
        assert_eq!(settings.import.stale_after, Duration::from_secs(7200));
        assert_eq!(settings.iana.whois_port, 4343);
        assert_eq!(settings.iana.whois_host, "whois.iana.org");
        assert_eq!(settings.data_dir, PathBuf::from("/from/file"));
        assert_eq!(
            settings.directory_path(),
            PathBuf::from("/from/file/tld-directory.json")
        );
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::resolve(&FileConfig::default(), &EnvConfig::default()).unwrap();
        assert_eq!(settings.threshold_days, DEFAULT_THRESHOLD_DAYS);
        assert_eq!(settings.import, ImportSettings::default());
        assert_eq!(settings.iana, IanaSources::default());
    }
}
