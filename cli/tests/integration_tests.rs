use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::{Value, json};

fn borg_command(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_borg-command"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run borg-command")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

/// Path to the shell stand-in for borg shared with the exec crate tests.
#[cfg(unix)]
fn fake_borg() -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../exec/tests/fixtures/fake-borg");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("failed to mark fake borg executable");
    path
}

// ---------------------------------------------------------------------------
// commands / build / paths
// ---------------------------------------------------------------------------

#[test]
fn commands_lists_every_builtin() {
    let output = borg_command(&["commands"]);

    assert!(output.status.success());
    let value = stdout_json(&output);
    let names: Vec<&str> = value["commands"]
        .as_array()
        .expect("commands array")
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert_eq!(
        names,
        vec!["init", "create", "list", "info", "config", "export-tar"]
    );
    assert_eq!(value["commands"][0]["mandatory"], json!(true));
    assert!(value["shared"].is_array());
}

#[test]
fn commands_yaml_output() {
    let output = borg_command(&["commands", "--format", "yaml"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: export-tar"));
}

#[test]
fn build_prints_command_vector() {
    let output = borg_command(&["build", "list", "--", "/srv/repo", "--short"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout_json(&output),
        json!({
            "name": "list",
            "argv": ["borg", "--log-json", "list", "--short", "--json", "/srv/repo"],
            "capture_mode": "buffered",
            "positional_start": 5,
        })
    );
}

#[test]
fn build_json_lines_selects_streaming() {
    let output = borg_command(&["build", "list", "--", "--json-lines", "/srv/repo::monday"]);

    assert!(output.status.success());
    let value = stdout_json(&output);
    assert_eq!(value["capture_mode"], json!("streaming"));
    assert_eq!(
        value["argv"],
        json!(["borg", "--log-json", "list", "--json-lines", "/srv/repo::monday"])
    );
}

#[test]
fn build_init_without_encryption_fails() {
    let output = borg_command(&["build", "init", "--", "/srv/repo"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: Neither '-e MODE' nor '--encryption MODE'"));
}

#[test]
fn build_rejects_bad_parameter() {
    let output = borg_command(&["build", "info", "--", "--last", "many", "/srv/repo"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Option --last does not match expected parameter expression"));
}

#[test]
fn paths_lists_create_sources() {
    let output = borg_command(&[
        "paths",
        "create",
        "--archive",
        "weekly",
        "--",
        "/srv/repo::weekly",
        "/var/www",
        "--exclude",
        "*.tmp",
        "/home",
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["/var/www", "/home"]);
}

#[test]
fn unknown_command_is_rejected_by_parser() {
    let output = borg_command(&["build", "prune", "--", "/srv/repo"]);

    assert!(!output.status.success());
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn run_prints_decoded_outcome() {
    let fake = fake_borg();
    let output = borg_command(&[
        "run",
        "list",
        "--program",
        fake.to_str().unwrap(),
        "--env",
        r#"FAKE_BORG_STDOUT={"archives": []}"#,
        "--",
        "/srv/repo",
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let value = stdout_json(&output);
    assert_eq!(value["exit_code"], json!(0));
    assert_eq!(value["exit_class"], json!("Success"));
    assert_eq!(value["stdout_records"], json!([{"archives": []}]));
    assert_eq!(
        value["stderr_records"][0]["message"],
        json!("--log-json list --json /srv/repo")
    );
}

#[cfg(unix)]
#[test]
fn run_propagates_borg_exit_code() {
    let fake = fake_borg();
    let output = borg_command(&[
        "run",
        "info",
        "--program",
        fake.to_str().unwrap(),
        "--env",
        "FAKE_BORG_EXIT=2",
        "--",
        "/srv/repo",
    ]);

    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stdout_json(&output)["exit_class"], json!("Error"));
}

#[cfg(unix)]
#[test]
fn run_strict_reports_failure() {
    let fake = fake_borg();
    let output = borg_command(&[
        "run",
        "info",
        "--strict",
        "--program",
        fake.to_str().unwrap(),
        "--env",
        "FAKE_BORG_EXIT=2",
        "--",
        "/srv/repo",
    ]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: The command \""));
    assert!(stderr.contains("Exit Code: 2(Error)"));
}

#[cfg(unix)]
#[test]
fn run_strict_accepts_warning() {
    let fake = fake_borg();
    let output = borg_command(&[
        "run",
        "info",
        "--strict",
        "--program",
        fake.to_str().unwrap(),
        "--env",
        "FAKE_BORG_EXIT=1",
        "--",
        "/srv/repo",
    ]);

    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["exit_class"], json!("Warning"));
}

#[cfg(unix)]
#[test]
fn run_reads_yaml_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("run.yaml");
    let yaml = format!(
        "program: {}\nenv:\n  FAKE_BORG_STDOUT: '{{\"repository\": {{\"id\": \"abc\"}}}}'\n",
        fake_borg().display()
    );
    fs::write(&config_path, yaml).unwrap();

    let output = borg_command(&[
        "run",
        "info",
        "--config",
        config_path.to_str().unwrap(),
        "--",
        "/srv/repo",
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout_json(&output)["stdout_records"],
        json!([{"repository": {"id": "abc"}}])
    );
}

#[test]
fn run_rejects_malformed_env_pair() {
    let output = borg_command(&["run", "list", "--env", "NOVALUE", "--", "/srv/repo"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("expected KEY=VALUE"));
}

#[test]
fn run_missing_config_file_fails() {
    let output = borg_command(&[
        "run",
        "list",
        "--config",
        "/nonexistent/run.yaml",
        "--",
        "/srv/repo",
    ]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load run config"));
}
