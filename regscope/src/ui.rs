//! Terminal display logic for the regscope CLI.
//!
//! Colored record output, resolution traces, directory tables, import
//! progress lines and a spinner. Uses only the `console` crate.

use console::{pad_str, style, Alignment, Term};
use regscope_lib::{
    BatchProgress, DomainRecord, ImportLog, LifecycleStatus, TldServerEntry, TraceEntry,
    UpdateCheck,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner that writes to stderr so stdout stays clean.
///
/// Does nothing when stderr is not a terminal.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    pub fn start(message: String) -> Self {
        let running = Arc::new(AtomicBool::new(true));

        if !Term::stderr().is_term() {
            return Self {
                running,
                handle: None,
            };
        }

        let running_clone = running.clone();
        let handle = tokio::spawn(async move {
            let term = Term::stderr();
            let mut idx = 0usize;
            while running_clone.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let _ = term.clear_line();
                let _ = term.write_str(&format!("{} {}", style(frame).cyan(), message));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            let _ = term.clear_line();
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Stop the spinner and clear the line.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

// ── Records ──────────────────────────────────────────────────────────────────

fn styled_status(status: LifecycleStatus) -> String {
    let label = status.to_string().to_uppercase();
    match status {
        LifecycleStatus::Available => style(label).green().bold().to_string(),
        LifecycleStatus::Active => style(label).cyan().bold().to_string(),
        LifecycleStatus::Expiring => style(label).yellow().bold().to_string(),
        LifecycleStatus::Expired => style(label).red().bold().to_string(),
        LifecycleStatus::Unknown => style(label).dim().to_string(),
    }
}

fn field(name: &str, value: Option<String>) {
    if let Some(value) = value {
        println!(
            "    {} {}",
            style(pad_str(name, 12, Alignment::Left, None)).dim(),
            value
        );
    }
}

/// Print one resolved record.
pub fn print_record(record: &DomainRecord, threshold_days: i64) {
    let via = if record.whois_supplemented {
        format!("{} + WHOIS", record.raw_source)
    } else {
        record.raw_source.to_string()
    };

    println!(
        "  {}  {}  {}",
        style(&record.domain_name).white().bold(),
        styled_status(record.lifecycle_status(threshold_days)),
        style(format!("via {}", via)).dim()
    );

    let date = |d: Option<chrono::DateTime<chrono::Utc>>| d.map(|d| d.format("%Y-%m-%d").to_string());

    field("registrar", record.registrar.clone());
    field("url", record.registrar_url.clone());
    field("created", date(record.creation_date));
    field("updated", date(record.updated_date));
    field("expires", date(record.expiration_date));
    field("abuse", record.abuse_email.clone());
    if !record.status.is_empty() {
        field("status", Some(record.status.join(", ")));
    }
    if !record.nameservers.is_empty() {
        field("nameservers", Some(record.nameservers.join(", ")));
    }
}

/// Print a domain whose resolution failed.
pub fn print_failure(domain: &str, message: &str) {
    println!(
        "  {}  {}  {}",
        style(domain).white().bold(),
        style("FAILED").red(),
        style(message).dim()
    );
}

pub fn print_trace(trace: &[TraceEntry]) {
    for entry in trace {
        println!(
            "    {} {} {}",
            style("└─").dim(),
            style(pad_str(&entry.step.to_string(), 9, Alignment::Left, None)).cyan(),
            style(&entry.detail).dim()
        );
    }
}

// ── Directory ────────────────────────────────────────────────────────────────

pub fn print_entry(entry: &TldServerEntry) {
    let active = if entry.is_active {
        String::new()
    } else {
        format!(" {}", style("(inactive)").yellow())
    };
    println!(
        "  {}{}  {}",
        style(&entry.tld).white().bold(),
        active,
        style(format!("source: {}", entry.source)).dim()
    );
    field("rdap", entry.rdap_base_url.clone());
    field("whois", entry.whois_server.clone());
    field("registry", entry.metadata.registry_url.clone());
    field("registered", entry.metadata.registration_date.clone());
    field("last change", entry.metadata.record_last_updated.clone());
}

/// Print the directory as one line per TLD.
pub fn print_directory(entries: &[TldServerEntry]) {
    let dash = || style("-").dim().to_string();
    for entry in entries {
        println!(
            "  {}  {}  {}",
            pad_str(&entry.tld, 14, Alignment::Left, None),
            entry.rdap_base_url.clone().unwrap_or_else(dash),
            entry.whois_server.clone().unwrap_or_else(dash),
        );
    }

    let with_rdap = entries.iter().filter(|e| e.rdap_base_url.is_some()).count();
    let with_whois = entries.iter().filter(|e| e.whois_server.is_some()).count();
    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    println!(
        "  {} TLDs  {}  {} with RDAP  {}  {} with WHOIS",
        style(entries.len()).bold(),
        style("|").dim(),
        style(with_rdap).green(),
        style("|").dim(),
        style(with_whois).cyan(),
    );
}

// ── Imports ──────────────────────────────────────────────────────────────────

pub fn print_batch(progress: &BatchProgress) {
    let phase = progress
        .phase
        .map(|p| p.to_string())
        .unwrap_or_else(|| "done".to_string());
    println!(
        "  {} {}  {} processed, {} left in phase  {}",
        style(format!("[#{}]", progress.id)).dim(),
        style(pad_str(&phase, 13, Alignment::Left, None)).cyan(),
        progress.processed,
        progress.remaining,
        style(format!(
            "new {} | updated {} | failed {}",
            progress.counters.new, progress.counters.updated, progress.counters.failed
        ))
        .dim()
    );
}

pub fn print_import_summary(log: &ImportLog, duration: Duration) {
    let status = match log.status {
        regscope_lib::ImportStatus::Complete => style(log.status.to_string()).green().bold(),
        regscope_lib::ImportStatus::Failed => style(log.status.to_string()).red().bold(),
        _ => style(log.status.to_string()).yellow(),
    };
    println!(
        "  import #{} ({}) {} in {:.1}s: {} processed, {} new, {} updated, {} failed",
        log.id,
        log.import_type,
        status,
        duration.as_secs_f64(),
        log.counters.processed,
        log.counters.new,
        log.counters.updated,
        log.counters.failed,
    );
    if let Some(message) = &log.error_message {
        println!("  {} {}", style("└─").dim(), style(message).red());
    }
}

pub fn print_import_list(logs: &[ImportLog]) {
    if logs.is_empty() {
        println!("  {}", style("No imports recorded").dim());
        return;
    }
    for log in logs {
        println!(
            "  {}  {}  {}  {}  {}",
            style(format!("#{}", log.id)).bold(),
            pad_str(log.import_type.as_str(), 17, Alignment::Left, None),
            pad_str(&log.status.to_string(), 8, Alignment::Left, None),
            style(log.started_at.format("%Y-%m-%d %H:%M:%S")).dim(),
            style(format!("{}/{} units", log.counters.processed, log.counters.total)).dim(),
        );
    }
}

pub fn print_update_check(check: &UpdateCheck) {
    let line = |name: &str, check: &regscope_lib::import::SourceVersionCheck| {
        let marker = if check.needs_update {
            style("update available").yellow().to_string()
        } else {
            style("up to date").green().to_string()
        };
        println!(
            "  {}  published {}  stored {}  {}",
            pad_str(name, 9, Alignment::Left, None),
            check.current.as_deref().unwrap_or("-"),
            check.last.as_deref().unwrap_or("-"),
            marker
        );
    };
    line("tld list", &check.tld_list);
    line("rdap", &check.rdap);
    for error in &check.errors {
        println!("  {} {}", style("└─").dim(), style(error).red());
    }
}
