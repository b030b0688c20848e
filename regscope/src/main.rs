//! Regscope CLI Application
//!
//! An operator command-line interface over regscope-lib: resolve domains,
//! inspect and maintain the TLD server directory, and drive checkpointed
//! IANA imports from a terminal.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use regscope_lib::{
    classify_status, load_env_config, parse_registry_date, BulkImportService, ConfigManager,
    EntrySource, FileConfig, FileImportLogStore, FileTldDirectory, IanaDiscoveryClient,
    ImportType, LookupError, Resolver, Settings, TldDiscovery, TldServerDirectory,
    TldServerEntry,
};
use std::process;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// CLI arguments for regscope
#[derive(Parser, Debug)]
#[command(name = "regscope")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve registrar, expiry and status for any domain via IANA, RDAP and WHOIS")]
#[command(
    long_about = "Resolve domain registration data without knowing which server is authoritative.\n\nDiscovers RDAP and WHOIS endpoints from IANA, keeps them in a local TLD directory, queries RDAP first and falls back to WHOIS."
)]
#[command(styles = STYLES)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", global = true, help_heading = "Configuration")]
    pub config: Option<String>,

    /// Directory holding the TLD directory and import logs
    #[arg(long = "data-dir", value_name = "DIR", global = true, help_heading = "Configuration")]
    pub data_dir: Option<String>,

    /// Show debug logging
    #[arg(short = 'd', long = "debug", global = true, help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", global = true, help_heading = "Configuration")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve registration data for one or more domains
    Resolve {
        /// Domain names to resolve
        #[arg(value_name = "DOMAINS", required = true)]
        domains: Vec<String>,

        /// Days before expiration at which a domain counts as expiring
        #[arg(long = "threshold", value_name = "DAYS")]
        threshold: Option<i64>,

        /// Output results in JSON format
        #[arg(short = 'j', long = "json")]
        json: bool,

        /// Show every discovery and protocol step
        #[arg(long = "trace")]
        trace: bool,
    },

    /// Run IANA discovery for a TLD without storing the result
    Discover {
        #[arg(value_name = "TLD")]
        tld: String,

        #[arg(short = 'j', long = "json")]
        json: bool,
    },

    /// Re-run discovery for a TLD and update its directory entry
    Refresh {
        #[arg(value_name = "TLD")]
        tld: String,

        #[arg(short = 'j', long = "json")]
        json: bool,
    },

    /// Run a checkpointed import to completion
    Import {
        /// tld_list, rdap, whois, check_updates or complete_workflow
        #[arg(value_name = "TYPE")]
        import_type: String,

        /// Resume an existing import instead of starting a new one
        #[arg(long = "resume", value_name = "ID")]
        resume: Option<u64>,

        /// Stop after this many batches (the import stays resumable)
        #[arg(long = "max-batches", value_name = "N")]
        max_batches: Option<usize>,

        #[arg(short = 'j', long = "json")]
        json: bool,
    },

    /// List recorded imports, newest first
    Imports {
        #[arg(short = 'j', long = "json")]
        json: bool,
    },

    /// Compare published IANA versions with the directory
    CheckUpdates {
        #[arg(short = 'j', long = "json")]
        json: bool,
    },

    /// Classify a lifecycle status offline
    Classify {
        /// Expiration date (RFC 3339, YYYY-MM-DD, or a registry date format)
        #[arg(long = "expires", value_name = "DATE")]
        expires: Option<String>,

        /// Raw registry status tokens (comma-separated or repeated)
        #[arg(long = "status", value_name = "TOKEN", value_delimiter = ',', action = clap::ArgAction::Append)]
        status: Vec<String>,

        #[arg(long = "threshold", value_name = "DAYS")]
        threshold: Option<i64>,
    },

    /// Inspect or edit the TLD server directory
    Directory {
        #[command(subcommand)]
        action: DirectoryAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum DirectoryAction {
    /// List all entries
    List {
        #[arg(short = 'j', long = "json")]
        json: bool,
    },

    /// Show one entry
    Show {
        #[arg(value_name = "TLD")]
        tld: String,
    },

    /// Create or edit an entry by hand
    Set {
        #[arg(value_name = "TLD")]
        tld: String,

        #[arg(long = "rdap", value_name = "URL")]
        rdap: Option<String>,

        #[arg(long = "whois", value_name = "HOST")]
        whois: Option<String>,

        /// Mark the entry inactive so resolution skips it
        #[arg(long = "inactive")]
        inactive: bool,
    },

    /// Remove an entry
    Remove {
        #[arg(value_name = "TLD")]
        tld: String,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_tracing(args.verbose, args.debug);

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Install the stderr subscriber. `-d`/`-v` win over `RUST_LOG`.
fn init_tracing(verbose: bool, debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> CliResult {
    let settings = load_settings(&args)?;

    match args.command {
        Command::Resolve {
            domains,
            threshold,
            json,
            trace,
        } => {
            let threshold = checked_threshold(threshold.unwrap_or(settings.threshold_days))?;
            run_resolve(&settings, &domains, threshold, json, trace).await
        }
        Command::Discover { tld, json } => run_discover(&settings, &tld, json).await,
        Command::Refresh { tld, json } => run_refresh(&settings, &tld, json).await,
        Command::Import {
            import_type,
            resume,
            max_batches,
            json,
        } => {
            let import_type: ImportType = import_type.parse()?;
            run_import(&settings, import_type, resume, max_batches, json).await
        }
        Command::Imports { json } => {
            let service = import_service(&settings).await?;
            let logs = service.list_imports().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&logs)?);
            } else {
                ui::print_import_list(&logs);
            }
            Ok(())
        }
        Command::CheckUpdates { json } => {
            let service = import_service(&settings).await?;
            let check = service.check_for_updates().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&check)?);
            } else {
                ui::print_update_check(&check);
            }
            Ok(())
        }
        Command::Classify {
            expires,
            status,
            threshold,
        } => {
            let threshold = checked_threshold(threshold.unwrap_or(settings.threshold_days))?;
            run_classify(expires.as_deref(), &status, threshold)
        }
        Command::Directory { action } => run_directory(&settings, action).await,
    }
}

/// Config file(s), then `RS_*` environment, then command line flags.
fn load_settings(args: &Args) -> Result<Settings, LookupError> {
    let env_config = load_env_config();
    let manager = ConfigManager::new(args.verbose);

    let file_config: FileConfig = match args.config.as_ref().or(env_config.config.as_ref()) {
        Some(path) => manager.load_file(path)?,
        None => manager.discover_and_load()?,
    };

    let mut settings = Settings::resolve(&file_config, &env_config)?;
    if let Some(data_dir) = &args.data_dir {
        settings.data_dir = data_dir.into();
    }
    tracing::debug!(data_dir = %settings.data_dir.display(), "settings loaded");
    Ok(settings)
}

fn checked_threshold(days: i64) -> Result<i64, LookupError> {
    if days < 0 {
        return Err(LookupError::config("threshold must not be negative"));
    }
    Ok(days)
}

async fn open_directory(settings: &Settings) -> Result<Arc<FileTldDirectory>, LookupError> {
    Ok(Arc::new(FileTldDirectory::open(settings.directory_path()).await?))
}

fn discovery_client(settings: &Settings) -> Result<Arc<IanaDiscoveryClient>, LookupError> {
    Ok(Arc::new(IanaDiscoveryClient::with_sources(
        &settings.client,
        settings.iana.clone(),
    )?))
}

async fn build_resolver(settings: &Settings) -> Result<Resolver, LookupError> {
    let directory = open_directory(settings).await?;
    let discovery = discovery_client(settings)?;
    Resolver::new(directory, discovery, &settings.client)
}

async fn import_service(settings: &Settings) -> Result<BulkImportService, LookupError> {
    let directory = open_directory(settings).await?;
    let store = Arc::new(FileImportLogStore::open(settings.import_log_path()).await?);
    let source = discovery_client(settings)?;
    Ok(BulkImportService::new(directory, store, source).with_settings(settings.import.clone()))
}

async fn run_resolve(
    settings: &Settings,
    domains: &[String],
    threshold: i64,
    json: bool,
    trace: bool,
) -> CliResult {
    let resolver = build_resolver(settings).await?;
    let mut failures = 0usize;
    let mut json_results = Vec::new();

    for domain in domains {
        let spinner = ui::Spinner::start(format!("Resolving {}...", domain));
        let resolution = resolver.resolve_with_trace(domain).await;
        spinner.stop().await;

        if json {
            let mut value = match &resolution.result {
                Ok(record) => {
                    let mut value = serde_json::to_value(record)?;
                    value["lifecycle_status"] =
                        serde_json::to_value(record.lifecycle_status(threshold))?;
                    value
                }
                Err(e) => serde_json::json!({
                    "domain_name": resolution.domain,
                    "error": e.to_string(),
                }),
            };
            if trace {
                value["trace"] = serde_json::to_value(&resolution.trace)?;
            }
            json_results.push(value);
        } else {
            match &resolution.result {
                Ok(record) => ui::print_record(record, threshold),
                Err(e) => ui::print_failure(&resolution.domain, &e.to_string()),
            }
            if trace {
                ui::print_trace(&resolution.trace);
            }
        }

        if resolution.result.is_err() {
            failures += 1;
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&json_results)?);
    }

    if failures == domains.len() {
        return Err(format!(
            "{} of {} domain(s) could not be resolved",
            failures,
            domains.len()
        )
        .into());
    }
    Ok(())
}

async fn run_discover(settings: &Settings, tld: &str, json: bool) -> CliResult {
    let discovery = discovery_client(settings)?;
    let key = regscope_lib::canonical_tld(tld);
    let discovered = discovery.discover(&key).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&discovered)?);
    } else if discovered.is_empty() {
        println!("  {} no RDAP or WHOIS server published", key);
    } else {
        ui::print_entry(&TldServerEntry::from_discovery(&key, &discovered));
    }
    Ok(())
}

async fn run_refresh(settings: &Settings, tld: &str, json: bool) -> CliResult {
    let resolver = build_resolver(settings).await?;
    let entry = resolver.refresh_tld(tld).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        ui::print_entry(&entry);
    }
    Ok(())
}

async fn run_import(
    settings: &Settings,
    import_type: ImportType,
    resume: Option<u64>,
    max_batches: Option<usize>,
    json: bool,
) -> CliResult {
    let service = import_service(settings).await?;
    let started = Instant::now();

    let id = match resume {
        Some(id) => {
            let log = service.import_log(id).await?;
            if log.import_type != import_type {
                return Err(format!(
                    "import #{} is a {} import, not {}",
                    id, log.import_type, import_type
                )
                .into());
            }
            id
        }
        None => service.start_import(import_type).await?.id,
    };

    let mut batches = 0usize;
    loop {
        let progress = service.process_next_batch(id).await?;
        batches += 1;
        if !json {
            ui::print_batch(&progress);
        }
        if progress.status.is_terminal() {
            break;
        }
        if max_batches.is_some_and(|max| batches >= max) {
            tracing::info!(id, batches, "batch limit reached, import left resumable");
            break;
        }
    }

    let log = service.import_log(id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&log)?);
    } else {
        ui::print_import_summary(&log, started.elapsed());
    }

    if log.status == regscope_lib::ImportStatus::Failed {
        return Err(log
            .error_message
            .unwrap_or_else(|| format!("import #{} failed", id))
            .into());
    }
    Ok(())
}

fn run_classify(expires: Option<&str>, status: &[String], threshold: i64) -> CliResult {
    let expiration = match expires {
        Some(raw) => Some(
            parse_registry_date(raw)
                .ok_or_else(|| LookupError::parse(format!("Unrecognized date '{}'", raw)))?,
        ),
        None => None,
    };

    println!("{}", classify_status(expiration, status, threshold));
    Ok(())
}

async fn run_directory(settings: &Settings, action: DirectoryAction) -> CliResult {
    let directory = open_directory(settings).await?;

    match action {
        DirectoryAction::List { json } => {
            let entries = directory.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                ui::print_directory(&entries);
            }
        }
        DirectoryAction::Show { tld } => match directory.get(&tld).await? {
            Some(entry) => ui::print_entry(&entry),
            None => return Err(format!("{} is not in the directory", tld).into()),
        },
        DirectoryAction::Set {
            tld,
            rdap,
            whois,
            inactive,
        } => {
            let mut entry = directory
                .get(&tld)
                .await?
                .unwrap_or_else(|| TldServerEntry::new(&tld, EntrySource::Manual));
            if rdap.is_some() {
                entry.rdap_base_url = rdap;
            }
            if whois.is_some() {
                entry.whois_server = whois;
            }
            entry.is_active = !inactive;
            entry.source = EntrySource::Manual;
            entry.last_updated = chrono::Utc::now();
            directory.upsert(entry.clone()).await?;
            ui::print_entry(&entry);
        }
        DirectoryAction::Remove { tld } => {
            if !directory.remove(&tld).await? {
                return Err(format!("{} is not in the directory", tld).into());
            }
            println!("  removed {}", regscope_lib::canonical_tld(&tld));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_resolve_args() {
        let args = Args::parse_from([
            "regscope",
            "resolve",
            "example.com",
            "example.org",
            "--threshold",
            "14",
            "--trace",
        ]);
        match args.command {
            Command::Resolve {
                domains,
                threshold,
                trace,
                json,
            } => {
                assert_eq!(domains, vec!["example.com", "example.org"]);
                assert_eq!(threshold, Some(14));
                assert!(trace);
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["regscope", "directory", "list", "--data-dir", "/tmp/rs", "-v"]);
        assert_eq!(args.data_dir.as_deref(), Some("/tmp/rs"));
        assert!(args.verbose);
    }

    #[test]
    fn test_classify_status_tokens_split() {
        let args = Args::parse_from(["regscope", "classify", "--status", "active,clientHold"]);
        match args.command {
            Command::Classify { status, .. } => assert_eq!(status, vec!["active", "clientHold"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_negative_threshold_rejected() {
        assert!(checked_threshold(-1).is_err());
        assert_eq!(checked_threshold(0).unwrap(), 0);
    }
}
