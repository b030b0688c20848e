// regscope/tests/cli_integration.rs
//
// Offline commands only: nothing here touches the network.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// A command isolated from the user's config files and `RS_*` variables.
fn regscope(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("regscope").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env_remove("RS_RDAP_TIMEOUT")
        .env_remove("RS_WHOIS_TIMEOUT")
        .env_remove("RS_DATA_DIR")
        .env_remove("RS_BATCH_SIZE")
        .env_remove("RS_THRESHOLD_DAYS")
        .env_remove("RS_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    regscope(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("check-updates"))
        .stdout(predicate::str::contains("classify"))
        .stdout(predicate::str::contains("directory"));
}

#[test]
fn test_classify_far_future_is_active() {
    let home = TempDir::new().unwrap();
    regscope(&home)
        .args(["classify", "--expires", "2999-01-01"])
        .assert()
        .success()
        .stdout(predicate::str::diff("active\n"));
}

#[test]
fn test_classify_past_is_expired() {
    let home = TempDir::new().unwrap();
    regscope(&home)
        .args(["classify", "--expires", "2001-03-04T00:00:00Z"])
        .assert()
        .success()
        .stdout(predicate::str::diff("expired\n"));
}

#[test]
fn test_classify_availability_token_wins() {
    let home = TempDir::new().unwrap();
    regscope(&home)
        .args(["classify", "--expires", "2001-03-04", "--status", "free"])
        .assert()
        .success()
        .stdout(predicate::str::diff("available\n"));
}

#[test]
fn test_classify_without_date_is_unknown() {
    let home = TempDir::new().unwrap();
    regscope(&home)
        .args(["classify", "--status", "clientTransferProhibited"])
        .assert()
        .success()
        .stdout(predicate::str::diff("unknown\n"));
}

#[test]
fn test_classify_rejects_bad_date() {
    let home = TempDir::new().unwrap();
    regscope(&home)
        .args(["classify", "--expires", "someday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unrecognized date"));
}

#[test]
fn test_classify_uses_config_threshold() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("regscope.toml");
    fs::write(&config, "[classify]\nthreshold_days = 3650\n").unwrap();

    // Expires within ten years, so the configured threshold makes it expiring
    let expires = (chrono::Utc::now() + chrono::Duration::days(400))
        .format("%Y-%m-%d")
        .to_string();

    regscope(&home)
        .args(["classify", "--expires", &expires])
        .assert()
        .success()
        .stdout(predicate::str::diff("expiring\n"));

    regscope(&home)
        .args(["classify", "--expires", &expires, "--threshold", "30"])
        .assert()
        .success()
        .stdout(predicate::str::diff("active\n"));
}

#[test]
fn test_invalid_config_file_fails() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("broken.toml");
    fs::write(&config, "[network]\nrdap_timeout = \"whenever\"\n").unwrap();

    regscope(&home)
        .args(["classify", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("rdap_timeout"));
}

#[test]
fn test_directory_manual_entry_lifecycle() {
    let home = TempDir::new().unwrap();
    let data_dir = home.path().join("state");
    let data_dir = data_dir.to_str().unwrap();

    regscope(&home)
        .args(["directory", "set", "EXAMPLE", "--whois", "whois.nic.example"])
        .args(["--data-dir", data_dir])
        .assert()
        .success()
        .stdout(predicate::str::contains(".example"))
        .stdout(predicate::str::contains("whois.nic.example"));

    regscope(&home)
        .args(["directory", "list", "--json", "--data-dir", data_dir])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tld\": \".example\""))
        .stdout(predicate::str::contains("\"source\": \"manual\""));

    regscope(&home)
        .args(["directory", "remove", ".example", "--data-dir", data_dir])
        .assert()
        .success();

    regscope(&home)
        .args(["directory", "show", "example", "--data-dir", data_dir])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not in the directory"));
}

#[test]
fn test_unknown_import_type_fails() {
    let home = TempDir::new().unwrap();
    regscope(&home)
        .args(["import", "everything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown import type"));
}

#[test]
fn test_imports_empty() {
    let home = TempDir::new().unwrap();
    regscope(&home)
        .arg("imports")
        .assert()
        .success()
        .stdout(predicate::str::contains("No imports recorded"));
}
