//! Integration tests for the overcast binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const STACK: &str = r#"
networks:
  lan:
    cidr: 10.2.0.0/24
securitygroups:
  ssh:
    - { cidr: 0.0.0.0/0, from_port: 22, to_port: 22, protocol: tcp }
nodes:
  web:
    image: trusty
    flavor: m1.small
    disk: 20
    nics:
      - { network: lan, secgroups: [ssh] }
      - network: public
"#;

const DEFINITION: &str = r#"
demo:
  - provision:
      stack: stack.yaml
  - shell:
      cmd: uptime
      type: remote
      node: web
"#;

fn setup_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("stack.yaml"), STACK).unwrap();
    fs::write(temp.path().join(".overcast.yaml"), DEFINITION).unwrap();
    temp
}

fn overcast() -> Command {
    let mut cmd = Command::new(cargo_bin("overcast"));
    for var in [
        "OVERCAST_CFG",
        "OVERCAST_PREFIX",
        "OVERCAST_MAPPINGS",
        "OVERCAST_KEY",
        "RUST_LOG",
        "OS_AUTH_URL",
        "OS_USERNAME",
        "OS_PASSWORD",
        "OS_PROJECT_NAME",
        "OS_TENANT_NAME",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn cli_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    overcast()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("list-refs"));
    Ok(())
}

#[test]
fn cli_shows_version() -> Result<(), Box<dyn std::error::Error>> {
    overcast()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn cli_requires_a_subcommand() {
    overcast().assert().failure();
}

#[test]
fn list_refs_prints_weak_references() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project();
    overcast()
        .current_dir(temp.path())
        .args(["list-refs", "stack.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Images:\n  trusty"))
        .stdout(predicate::str::contains("Flavors:\n  m1.small"))
        .stdout(predicate::str::contains("Networks:\n  public"));
    Ok(())
}

#[test]
fn list_refs_template_goes_to_stdout_only() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project();
    let output = overcast()
        .current_dir(temp.path())
        .args(["list-refs", "--tmpl", "stack.yaml"])
        .output()?;

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.starts_with("# Overcast resource mappings"));
    assert!(stdout.contains("\"trusty\": \"<missing value>\""));
    assert!(!stdout.contains("lan"));
    Ok(())
}

#[test]
fn list_refs_missing_stack_exits_2() {
    let temp = TempDir::new().unwrap();
    overcast()
        .current_dir(temp.path())
        .args(["list-refs", "nope.yaml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Stack file not found"));
}

#[test]
fn deploy_dry_run_uses_default_definition() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project();
    overcast()
        .current_dir(temp.path())
        .args(["deploy", "--dry-run", "--prefix", "ci", "demo"])
        .assert()
        .success()
        .stderr(predicate::str::contains("provision stack.yaml"))
        .stderr(predicate::str::contains("shell uptime (skipped)"))
        .stderr(predicate::str::contains("Deployed demo"));
    Ok(())
}

#[test]
fn deploy_unknown_deployment_fails() {
    let temp = setup_project();
    overcast()
        .current_dir(temp.path())
        .args(["deploy", "--dry-run", "prod"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown deployment 'prod'"));
}

#[test]
fn deploy_without_definition_exits_2() {
    let temp = TempDir::new().unwrap();
    overcast()
        .current_dir(temp.path())
        .args(["deploy", "demo"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No deployment definition"));
}

#[test]
fn deploy_rejects_placeholder_mappings_before_connecting() {
    let temp = setup_project();
    fs::write(
        temp.path().join(".overcast.mappings.yaml"),
        "images:\n  trusty: \"<missing value>\"\n",
    )
    .unwrap();

    // No OS_* credentials are set; validation must fail first.
    overcast()
        .current_dir(temp.path())
        .args(["deploy", "demo"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("trusty"));
}

#[test]
fn deploy_without_credentials_fails() {
    let temp = setup_project();
    overcast()
        .current_dir(temp.path())
        .args(["deploy", "demo"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("is not set"));
}

#[test]
fn completions_for_bash() {
    overcast()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("overcast"));
}
