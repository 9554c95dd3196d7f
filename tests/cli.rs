use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn root(&self) -> std::path::PathBuf {
        self.dir.path().join("output")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("transcript-scraper").unwrap();
        cmd.env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.dir.path().join("config.yaml"))
            .arg("--root")
            .arg(self.root());
        cmd
    }
}

#[test]
fn creates_and_lists_projects() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["projects", "create", "beta"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Project created"));
    ws.cmd().args(["projects", "create", "alpha"]).assert().success();

    ws.cmd()
        .args(["projects", "list"])
        .assert()
        .success()
        .stdout(predicate::str::diff("alpha\nbeta\n"));
}

#[test]
fn duplicate_project_fails_and_keeps_contents() {
    let ws = Workspace::new();
    ws.cmd().args(["projects", "create", "alpha"]).assert().success();
    fs::write(ws.root().join("alpha").join("keep.json"), "{}").unwrap();

    ws.cmd()
        .args(["projects", "create", "alpha"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Project 'alpha' already exists."));

    assert!(ws.root().join("alpha").join("keep.json").exists());
}

#[test]
fn subproject_needs_existing_project() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["subprojects", "create", "ghost", "sub"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Project 'ghost' does not exist."));
    assert!(!ws.root().join("ghost").exists());

    ws.cmd().args(["projects", "create", "alpha"]).assert().success();
    ws.cmd()
        .args(["subprojects", "create", "alpha", "sub"])
        .assert()
        .success();
    ws.cmd()
        .args(["subprojects", "list", "alpha"])
        .assert()
        .success()
        .stdout(predicate::str::diff("sub\n"));
}

#[test]
fn stats_totals_saved_transcripts() {
    let ws = Workspace::new();
    let project = ws.root().join("alpha");
    fs::create_dir_all(project.join("sub")).unwrap();
    fs::write(project.join("a.json"), r#"{"token_count": 1200}"#).unwrap();
    fs::write(project.join("sub").join("b.json"), r#"{"token_count": 34}"#).unwrap();

    ws.cmd()
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("PROJECT"))
        .stdout(predicate::str::is_match(r"alpha\s+2\s+1,234\s").unwrap());

    ws.cmd()
        .args(["stats", "--subprojects"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"alpha\s+sub\s+1\s+34\s").unwrap());
}

#[test]
fn tokens_writes_csv_report() {
    let ws = Workspace::new();
    let project = ws.root().join("alpha");
    fs::create_dir_all(&project).unwrap();
    fs::write(project.join("a.json"), r#"{"token_count": 10}"#).unwrap();
    fs::write(project.join("b.json"), r#"{"token_count": 5}"#).unwrap();

    ws.cmd()
        .args(["tokens", "alpha"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total tokens: 15"));

    let csv = fs::read_to_string(project.join("tokens").join("tokens.csv")).unwrap();
    assert_eq!(csv, "file,token_count\na.json,10\nb.json,5\nTOTAL,15\n");

    ws.cmd()
        .args(["tokens", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Project 'missing' does not exist."));
}

#[test]
fn config_show_writes_defaults() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Language: id"))
        .stdout(predicate::str::contains("socks5h://127.0.0.1:9050"));

    assert!(ws.dir.path().join("config.yaml").exists());
}

#[test]
fn fetch_into_missing_project_fails_before_network() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["fetch", "dQw4w9WgXcQ", "-p", "ghost", "--no-proxy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Project 'ghost' does not exist."));
}
