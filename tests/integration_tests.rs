use std::fs;
use std::path::Path;
use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

fn szz() -> Command {
    Command::cargo_bin("szz").expect("binary exists")
}

fn fixtures_dir() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures")
}

fn fixture(name: &str) -> String {
    format!("{}/{name}", fixtures_dir())
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("command runs");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON")
}

fn git(dir: &Path, args: &[&str], date: &str) {
    let status = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_DATE", date)
        .env("GIT_COMMITTER_DATE", date)
        .output()
        .expect("git runs");
    assert!(status.status.success(), "git {args:?} failed");
}

fn java_source(changed_line: &str) -> String {
    let mut lines: Vec<String> = (1..=10).map(|i| format!("    // line {i}")).collect();
    lines[4] = changed_line.to_string();
    lines.join("\n") + "\n"
}

/// Repository with one initial commit and one fix commit for DEMO-7.
fn create_demo_repo() -> TempDir {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();

    git(dir, &["init", "-q"], "2020-01-15T12:00:00Z");
    git(dir, &["config", "user.email", "dev@example.com"], "2020-01-15T12:00:00Z");
    git(dir, &["config", "user.name", "Dev"], "2020-01-15T12:00:00Z");
    git(dir, &["config", "commit.gpgsign", "false"], "2020-01-15T12:00:00Z");

    fs::create_dir_all(dir.join("src/main")).unwrap();
    fs::write(dir.join("src/main/A.java"), java_source("    run();")).unwrap();
    fs::write(dir.join("src/main/B.java"), java_source("    stop();")).unwrap();
    git(dir, &["add", "."], "2020-01-15T12:00:00Z");
    git(dir, &["commit", "-q", "-m", "initial import"], "2020-01-15T12:00:00Z");

    fs::write(
        dir.join("src/main/A.java"),
        java_source("    if (x != null) run();"),
    )
    .unwrap();
    git(dir, &["add", "."], "2020-05-01T12:00:00Z");
    git(
        dir,
        &["commit", "-q", "-m", "DEMO-7 guard against null"],
        "2020-05-01T12:00:00Z",
    );

    let metadata = json!({
        "project": "DEMO",
        "releases": [
            { "name": "1.0.0", "date": "2020-01-01" },
            { "name": "1.1.0", "date": "2020-03-01" },
            { "name": "1.2.0", "date": "2020-06-01" },
            { "name": "1.3.0", "date": "2020-09-01" }
        ],
        "tickets": [{
            "id": "DEMO-7",
            "created": "2020-04-01",
            "fix_versions": [{ "name": "1.3.0", "date": "2020-09-01" }],
            "affected_versions": ["1.1.0"]
        }]
    });
    fs::write(dir.join("DEMO.json"), metadata.to_string()).unwrap();

    let mut methods = Vec::new();
    for release in ["1.0.0", "1.1.0", "1.2.0"] {
        methods.push(json!({
            "name": "A.run()", "file": "src/main/A.java", "release": release,
            "start_line": 2, "end_line": 8
        }));
        methods.push(json!({
            "name": "A.tail()", "file": "src/main/A.java", "release": release,
            "start_line": 8, "end_line": 10
        }));
        methods.push(json!({
            "name": "B.stop()", "file": "src/main/B.java", "release": release,
            "start_line": 2, "end_line": 8
        }));
    }
    fs::write(dir.join("methods.json"), Value::Array(methods).to_string()).unwrap();

    temp
}

// ---------------------------------------------------------------------------
// CLI smoke tests
// ---------------------------------------------------------------------------

#[test]
fn test_help_output() {
    szz()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("buggy methods"));
}

#[test]
fn test_subcommand_help() {
    szz()
        .args(["label", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--methods"));
}

#[test]
fn test_missing_metadata_file_fails() {
    let temp = TempDir::new().unwrap();
    szz()
        .current_dir(temp.path())
        .args(["estimate", "-m", "missing.json", "--proportion", "1.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading project metadata"));
}

#[test]
fn test_link_requires_git_repo() {
    let temp = TempDir::new().unwrap();
    szz()
        .current_dir(temp.path())
        .args(["link", "-m", &fixture("DEMO.json")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("git repository"));
}

#[test]
fn test_invalid_config_fails() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("szz.toml"), "[cold_start]\nproportion = 0.0\n").unwrap();
    szz()
        .current_dir(temp.path())
        .args(["cold-start"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("proportion"));
}

// ---------------------------------------------------------------------------
// Cold start
// ---------------------------------------------------------------------------

#[test]
fn test_cold_start_json() {
    let value = stdout_json(szz().args([
        "-f",
        "json",
        "cold-start",
        "--metadata-dir",
        &fixture("metadata"),
        "--project",
        "AVRO",
        "--project",
        "ZOOKEEPER",
    ]));

    assert_eq!(value["proportion"], 0.75);
    assert_eq!(value["projects"][0]["project"], "AVRO");
    assert_eq!(value["projects"][0]["kept"], 2);
    assert!(value["projects"][1]["error"].is_string());
}

#[test]
fn test_cold_start_without_data_falls_back() {
    let temp = TempDir::new().unwrap();
    let value = stdout_json(
        szz()
            .current_dir(temp.path())
            .args(["-f", "json", "cold-start"]),
    );
    assert_eq!(value["proportion"], 1.0);
    assert_eq!(value["projects"].as_array().unwrap().len(), 4);
}

#[test]
fn test_cold_start_markdown() {
    szz()
        .args([
            "-f",
            "markdown",
            "cold-start",
            "--metadata-dir",
            &fixture("metadata"),
            "--project",
            "AVRO",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Cold-start proportion"))
        .stdout(predicate::str::contains("| AVRO | 2 | 0.750 |"));
}

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

#[test]
fn test_estimate_json() {
    let value = stdout_json(szz().args([
        "-f",
        "json",
        "estimate",
        "-m",
        &fixture("DEMO.json"),
        "--proportion",
        "1.0",
    ]));

    assert_eq!(value["proportion"], 1.0);
    assert_eq!(value["proportion_source"], "cold_start");
    assert_eq!(value["valid_tickets"], 1);

    let tickets = value["tickets"].as_array().unwrap();
    assert_eq!(tickets.len(), 3);

    assert_eq!(tickets[0]["ticket"], "DEMO-1");
    assert_eq!(tickets[0]["source"], "proportion");
    assert_eq!(tickets[0]["injected_version"], "1.1.0");
    assert_eq!(tickets[0]["releases"], json!(["1.1.0", "1.2.0"]));

    assert_eq!(tickets[1]["ticket"], "DEMO-2");
    assert_eq!(tickets[1]["source"], "affected_versions");
    assert_eq!(tickets[1]["releases"], json!(["1.0.0", "1.1.0", "1.2.0"]));

    assert_eq!(tickets[2]["ticket"], "DEMO-3");
    assert_eq!(tickets[2]["releases"], json!([]));
}

#[test]
fn test_estimate_text() {
    szz()
        .args(["estimate", "-m", &fixture("DEMO.json"), "--proportion", "1.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Buggy release estimation"))
        .stdout(predicate::str::contains("1.000 (cold start)"));
}

// ---------------------------------------------------------------------------
// Linking and labeling on a real repository
// ---------------------------------------------------------------------------

#[test]
fn test_link_finds_fix_commit() {
    let repo = create_demo_repo();
    let value = stdout_json(szz().current_dir(repo.path()).args([
        "-f",
        "json",
        "link",
        "-m",
        "DEMO.json",
    ]));

    assert_eq!(value["by_message"]["commits"], 1);
    assert_eq!(value["tickets"][0]["ticket"], "DEMO-7");
    assert_eq!(value["tickets"][0]["fixed_files"], json!(["src/main/A.java"]));
}

#[test]
fn test_label_writes_dataset() {
    let repo = create_demo_repo();
    let value = stdout_json(szz().current_dir(repo.path()).args([
        "-f",
        "json",
        "label",
        "-m",
        "DEMO.json",
        "--methods",
        "methods.json",
        "-o",
        "labeled.json",
        "--proportion",
        "1.0",
        "--events",
    ]));

    assert_eq!(value["labeled_from_affected_versions"], 2);
    assert_eq!(value["labeled_from_proportion"], 0);
    assert_eq!(value["processed_tickets"], 1);
    assert_eq!(value["events"].as_array().unwrap().len(), 2);

    let labeled: Vec<Value> =
        serde_json::from_str(&fs::read_to_string(repo.path().join("labeled.json")).unwrap())
            .unwrap();
    assert_eq!(labeled.len(), 9);
    let buggy: Vec<(&str, &str)> = labeled
        .iter()
        .filter(|m| m["buggy"] == true)
        .map(|m| (m["name"].as_str().unwrap(), m["release"].as_str().unwrap()))
        .collect();
    assert_eq!(buggy, vec![("A.run()", "1.1.0"), ("A.run()", "1.2.0")]);
}

#[test]
fn test_label_all_formats_succeed() {
    let repo = create_demo_repo();
    for format in ["json", "markdown", "text"] {
        szz()
            .current_dir(repo.path())
            .args([
                "-f",
                format,
                "label",
                "-m",
                "DEMO.json",
                "--methods",
                "methods.json",
                "--proportion",
                "1.0",
            ])
            .assert()
            .success();
    }
}

#[test]
fn test_verbose_logs_repository_and_reference_dir() {
    let repo = create_demo_repo();
    szz()
        .current_dir(repo.path())
        .env_remove("RUST_LOG")
        .args(["-v", "-f", "json", "link", "-m", "DEMO.json"])
        .assert()
        .success()
        .stderr(predicate::str::contains("opened repository"));

    szz()
        .env_remove("RUST_LOG")
        .args([
            "-v",
            "cold-start",
            "--metadata-dir",
            &fixture("metadata"),
            "--project",
            "AVRO",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("reading reference project metadata"));
}
