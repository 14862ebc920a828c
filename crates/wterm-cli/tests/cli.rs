use std::path::Path;

use assert_cmd::Command;

fn wterm() -> Command {
    Command::cargo_bin("wterm").unwrap()
}

fn write_config(dir: &Path, content: &str) -> String {
    let path = dir.join("config.toml");
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn help_lists_subcommands() {
    let output = wterm().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("connect"));
    assert!(stdout.contains("hosts"));
}

#[test]
fn hosts_prints_the_host_book() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        r#"
[[hosts]]
id = 3
name = "web-01"
host = "10.0.0.5"
type = "1"
user = "deploy"
"#,
    );

    let output = wterm().args(["--config", &config, "hosts"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("web-01"));
    assert!(stdout.contains("10.0.0.5:22"));
    assert!(stdout.contains("key"));
    assert!(stdout.contains("1 host(s) configured."));
}

#[test]
fn hosts_with_missing_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("absent.toml");

    let output = wterm()
        .args(["--config", config.to_str().unwrap(), "hosts"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No hosts configured"));
}

#[test]
fn broken_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "[[hosts]]\nid = \"not a number\"\n");

    let output = wterm().args(["--config", &config, "hosts"]).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to parse config"));
}

#[test]
fn connect_to_unknown_host_fails_before_dialing() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");

    let output = wterm()
        .args(["--config", &config, "connect", "nowhere"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown host 'nowhere'"));
}

#[test]
fn connect_rejects_bad_url_scheme() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");

    let output = wterm()
        .args(["--config", &config, "--url", "ftp://bridge", "connect", "7"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unsupported URL scheme"));
}
