// ABOUTME: Integration tests for the rigger CLI commands.
// ABOUTME: Validates --help output, init, and an archive/trigger/tail round through the binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn rigger_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("rigger"))
}

#[test]
fn help_shows_commands() {
    rigger_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("archive"))
        .stdout(predicate::str::contains("trigger"))
        .stdout(predicate::str::contains("tail"))
        .stdout(predicate::str::contains("compact"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("rigger.yml");

    rigger_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--project", "web"])
        .assert()
        .success();

    assert!(config_path.exists(), "rigger.yml should be created");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("name: web"), "Config should name the project");
    assert!(content.contains("targets:"), "Config should have targets");
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("rigger.yml");

    fs::write(&config_path, "existing: config").unwrap();

    rigger_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn missing_config_is_reported() {
    let temp_dir = tempfile::tempdir().unwrap();

    rigger_cmd()
        .current_dir(temp_dir.path())
        .arg("targets")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn targets_lists_configured_targets() {
    let temp_dir = tempfile::tempdir().unwrap();
    rigger_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--project", "web"])
        .assert()
        .success();

    rigger_cmd()
        .current_dir(temp_dir.path())
        .args(["targets", "--as", "alice"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web: Code Coverage"));
}

#[test]
fn bad_execution_id_is_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    rigger_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .success();

    rigger_cmd()
        .current_dir(temp_dir.path())
        .args(["tail", "not-an-id"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid execution id"));
}

#[cfg(unix)]
#[test]
fn archive_trigger_and_tail() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();
    fs::write(
        root.join("rigger.yml"),
        r#"
permissions:
  alice: [run.update]
env:
  STAGE: prod
projects:
  - name: web
    targets:
      - name: Code Coverage
        source: build/coverage
        script: run.sh
"#,
    )
    .unwrap();
    fs::create_dir_all(root.join("build/coverage")).unwrap();
    fs::write(root.join("build/coverage/run.sh"), "echo ${STAGE}\n").unwrap();

    rigger_cmd()
        .current_dir(root)
        .args(["archive", "web", "3", "--status", "success"])
        .assert()
        .success();

    rigger_cmd()
        .current_dir(root)
        .args(["trigger", "web", "3", "Code Coverage", "--as", "bob"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("lacks"));

    rigger_cmd()
        .current_dir(root)
        .args(["--quiet", "trigger", "web", "3", "Code Coverage", "--as", "alice", "--follow"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("prod\n"));

    rigger_cmd()
        .current_dir(root)
        .args(["compact", "web/3/Code_Coverage"])
        .assert()
        .success();

    rigger_cmd()
        .current_dir(root)
        .args(["tail", "web/3/Code_Coverage"])
        .assert()
        .success()
        .stdout("prod\n");
}
