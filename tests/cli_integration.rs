use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/listing.json")
}

fn tabula(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("tabula").unwrap();
    cmd.current_dir(data_dir)
        .env_remove("TABULA_HOST")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .env("TABULA_HOME", data_dir)
        .arg("--host")
        .arg(fixture());
    cmd
}

const SCENARIO: &str = r#"{
  "columns": [
    {"id": "title", "field_key": "@title", "label": "Title", "sortable": true},
    {"id": "price", "field_key": "price", "label": "Price", "sortable": true,
     "display_settings": {"display": "single"}},
    {"id": "status", "field_key": "@status", "label": "Status", "filterable": true}
  ],
  "settings": {"default_sort": {"column": "title", "order": "asc"}}
}"#;

fn save_scenario(dir: &Path) {
    let file = dir.join("columns.json");
    std::fs::write(&file, SCENARIO).unwrap();
    tabula(dir)
        .arg("save")
        .arg("listing")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved 3 column(s) for listing."));
}

#[test]
fn scopes_lists_content_types() {
    let dir = tempfile::tempdir().unwrap();
    tabula(dir.path())
        .arg("scopes")
        .assert()
        .success()
        .stdout(predicate::str::contains("listing"))
        .stdout(predicate::str::contains("Events"));
}

#[test]
fn fields_lists_groups() {
    let dir = tempfile::tempdir().unwrap();
    tabula(dir.path())
        .args(["fields", "listing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pricing_tiers"))
        .stdout(predicate::str::contains("@tax:region"))
        .stdout(predicate::str::contains("Guest Rating"));
}

#[test]
fn columns_shows_default_until_saved() {
    let dir = tempfile::tempdir().unwrap();
    tabula(dir.path())
        .args(["columns", "listing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("@author"))
        .stdout(predicate::str::contains("host default"));

    save_scenario(dir.path());
    tabula(dir.path())
        .args(["columns", "listing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("@status"))
        .stdout(predicate::str::contains("host default").not());

    tabula(dir.path())
        .args(["reset", "listing"])
        .assert()
        .success();
    tabula(dir.path())
        .args(["columns", "listing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("host default"));
}

#[test]
fn list_sorts_and_filters() {
    let dir = tempfile::tempdir().unwrap();
    save_scenario(dir.path());

    let output = tabula(dir.path())
        .args(["list", "listing", "--filter", "status=published"])
        .args(["--orderby", "price", "--order", "desc"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let studio = stdout.find("City Studio").unwrap();
    let loft = stdout.find("Harbour View Loft").unwrap();
    let cottage = stdout.find("Garden Cottage").unwrap();
    assert!(studio < loft && loft < cottage);
    assert!(!stdout.contains("Mountain Cabin"));
}

#[test]
fn list_html_renders_table() {
    let dir = tempfile::tempdir().unwrap();
    tabula(dir.path())
        .args(["list", "listing", "--html"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<table class=\"tabula-list tabula-listing\">"))
        .stdout(predicate::str::contains("data-id=\"104\""));
}

#[test]
fn export_writes_suggested_file() {
    let dir = tempfile::tempdir().unwrap();
    save_scenario(dir.path());

    tabula(dir.path())
        .args(["export", "listing", "--columns", "price,title", "--filter", "status=published"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 3 row(s)"));

    let written: Vec<PathBuf> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("listing-export-") && n.ends_with(".csv"))
        })
        .collect();
    assert_eq!(written.len(), 1);
    let csv = std::fs::read_to_string(&written[0]).unwrap();
    assert_eq!(
        csv,
        "Price,Title\n320,City Studio\n95,Garden Cottage\n180,Harbour View Loft\n"
    );
}

#[test]
fn export_to_stdout_uses_configured_delimiter() {
    let dir = tempfile::tempdir().unwrap();
    save_scenario(dir.path());
    tabula(dir.path())
        .args(["config", "export-delimiter", ";"])
        .assert()
        .success();

    tabula(dir.path())
        .args(["export", "listing", "--columns", "title,status", "-o", "-"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Title;Status\n"))
        .stdout(predicate::str::contains("Mountain Cabin;Draft"));
}

#[test]
fn config_get_and_set() {
    let dir = tempfile::tempdir().unwrap();
    tabula(dir.path())
        .args(["config", "placeholder"])
        .assert()
        .success()
        .stdout("—\n");

    tabula(dir.path())
        .args(["config", "placeholder", "n/a"])
        .assert()
        .success();
    tabula(dir.path())
        .args(["config", "placeholder"])
        .assert()
        .success()
        .stdout("n/a\n");

    tabula(dir.path())
        .args(["config", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key: nope"));
}

#[test]
fn unknown_scope_fails() {
    let dir = tempfile::tempdir().unwrap();
    tabula(dir.path())
        .args(["columns", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown scope: nowhere"));
}

#[test]
fn missing_host_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("tabula")
        .unwrap()
        .current_dir(dir.path())
        .env_remove("TABULA_HOST")
        .arg("--data-dir")
        .arg(dir.path())
        .arg("scopes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Host file not found"));
}
