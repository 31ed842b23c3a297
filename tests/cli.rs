#![cfg(feature = "local")]

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

const RUNBOOK: &str = "# Runbook\n\n```bash\necho hello\n```\n\n```\n# config.yaml\nname: demo\n```\n";

#[allow(deprecated)]
fn cli(root: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("md-playground").unwrap();
    cmd.current_dir(root).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_list_json() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.md"), "# Alpha\n\nbody\n").unwrap();
    fs::create_dir(dir.path().join("notes")).unwrap();
    fs::write(dir.path().join("notes").join("b.md"), "Beta line\n").unwrap();
    fs::write(dir.path().join("ignore.txt"), "not a doc").unwrap();

    let output = cli(dir.path()).args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "docs": [
                { "title": "Alpha", "path": "a.md" },
                { "title": "Beta line", "path": "notes/b.md" }
            ]
        })
    );
}

#[test]
fn test_detect_plain() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("run.md"), RUNBOOK).unwrap();

    cli(dir.path())
        .args(["detect", "run.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1\tbash\t-\trun"))
        .stdout(predicate::str::contains("2\tyaml\tconfig.yaml\tsave"));
}

#[test]
fn test_detect_json() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("run.md"), RUNBOOK).unwrap();

    let output = cli(dir.path())
        .args(["detect", "run.md", "--json"])
        .output()
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["blocks"][0]["index"], 1);
    assert_eq!(json["blocks"][0]["executable"], true);
    assert_eq!(json["blocks"][1]["filename"], "config.yaml");
    assert_eq!(json["blocks"][1]["language"], "yaml");
}

#[test]
fn test_missing_document_fails() {
    let dir = tempdir().unwrap();
    cli(dir.path())
        .args(["detect", "missing.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: document not found: missing.md"));
}

#[test]
fn test_fmt_prints_and_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("messy.md");
    fs::write(&path, "# Title\n\n\n\nbody\n").unwrap();

    cli(dir.path())
        .args(["fmt", "messy.md"])
        .assert()
        .success()
        .stdout("# Title\n\nbody\n");
    assert_eq!(fs::read_to_string(&path).unwrap(), "# Title\n\n\n\nbody\n");

    cli(dir.path())
        .args(["fmt", "messy.md", "--write"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Formatted messy.md"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "# Title\n\nbody\n");

    cli(dir.path())
        .args(["fmt", "messy.md", "--write"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already formatted"));
}

#[test]
fn test_fmt_write_leaves_code_untouched() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("code.md");
    fs::write(&path, "Intro  \n\n\n```python\ndef a():  \n\n\n    pass\n```\n").unwrap();

    cli(dir.path())
        .args(["fmt", "code.md", "--write"])
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "Intro\n\n```python\ndef a():  \n\n\n    pass\n```\n"
    );
}

#[test]
fn test_read_only_config_refuses_write() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("doc.md"), "a\n\n\nb\n").unwrap();
    fs::write(dir.path().join("config.json"), r#"{ "editEnabled": false }"#).unwrap();

    cli(dir.path())
        .args(["--config", "config.json", "fmt", "doc.md", "--write"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("editing is disabled"));
    assert_eq!(
        fs::read_to_string(dir.path().join("doc.md")).unwrap(),
        "a\n\n\nb\n"
    );
}

#[test]
fn test_unreadable_config_falls_back_to_read_only() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("doc.md"), "a\n\n\nb\n").unwrap();

    cli(dir.path())
        .args(["--config", "nope.json", "fmt", "doc.md", "--write"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("editing is disabled"));
}

#[test]
fn test_run_executes_shell_blocks() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("run.md"), RUNBOOK).unwrap();

    cli(dir.path())
        .args(["run", "run.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("$ echo hello\nhello\n"));
    assert!(!dir.path().join("config.yaml").exists());
}

#[test]
fn test_run_with_save_writes_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("run.md"), RUNBOOK).unwrap();

    cli(dir.path())
        .args(["run", "run.md", "--save"])
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(dir.path().join("config.yaml")).unwrap(),
        "name: demo\n"
    );
}

#[test]
fn test_run_single_block() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("two.md"),
        "```bash\necho first\n```\n\n```bash\necho second\n```\n",
    )
    .unwrap();

    cli(dir.path())
        .args(["run", "two.md", "--block", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("second").and(predicate::str::contains("first").not()));

    cli(dir.path())
        .args(["run", "two.md", "--block", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("block 5 is not a code block"));
}

#[test]
fn test_run_reports_exit_status() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("fail.md"), "```sh\nexit 4\n```\n").unwrap();

    cli(dir.path())
        .args(["run", "fail.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("exit status 4"));
}
