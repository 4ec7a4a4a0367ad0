//! CLI integration tests

use std::io::Write;
use std::process::Command;

fn advisor(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "advisor-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = advisor(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("OCI Resource Advisor"), "Should show app name");
    assert!(stdout.contains("run"), "Should show run command");
    assert!(stdout.contains("compartments"), "Should show compartments command");
    assert!(stdout.contains("summary"), "Should show summary command");
    assert!(stdout.contains("profiles"), "Should show profiles command");
    assert!(stdout.contains("--dump-metrics"), "Should show metrics flag");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = advisor(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("oci-advisor"), "Should show binary name");
}

/// Test run subcommand help
#[test]
fn test_run_help() {
    let output = advisor(&["run", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Run help should succeed");
    assert!(stdout.contains("--profile"), "Should show profile option");
    assert!(stdout.contains("old-snapshot"), "Should list heuristics");
}

/// Test that run requires at least one profile
#[test]
fn test_run_requires_profile() {
    let output = advisor(&["run", "idle-compute"]);
    assert!(!output.status.success(), "Run without profile should fail");
}

/// Test that an unknown heuristic is rejected
#[test]
fn test_unknown_heuristic() {
    let output = advisor(&["run", "cpu-magic", "--profile", "prod"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Unknown heuristic should fail");
    assert!(stderr.contains("unknown heuristic"), "Should explain the error");
}

/// Test an offline run against a snapshot
#[test]
fn test_run_against_snapshot() {
    let dir = tempfile::tempdir().unwrap();

    let config_path = dir.path().join("config.toml");
    let mut config = std::fs::File::create(&config_path).unwrap();
    write!(
        config,
        r#"
[[profiles]]
id = "prod"
tenancy_id = "t-prod"
user_id = "ocid1.user"
key_fingerprint = "aa:bb"
region = "eu-frankfurt-1"
"#
    )
    .unwrap();

    let snapshot_path = dir.path().join("snapshot.json");
    std::fs::write(
        &snapshot_path,
        r#"{
  "tenancies": {
    "t-prod": {
      "compartments": [{"id": "c1", "name": "prod", "lifecycleState": "ACTIVE"}],
      "loadBalancerHealths": {"c1": [{"loadBalancerId": "lb-1", "status": "CRITICAL"}]},
      "loadBalancers": {"c1": [{"id": "lb-1", "displayName": "front"}]}
    }
  }
}"#,
    )
    .unwrap();

    let output = advisor(&[
        "--config",
        config_path.to_str().unwrap(),
        "--snapshot",
        snapshot_path.to_str().unwrap(),
        "--format",
        "json",
        "run",
        "unused-load-balancer",
        "--profile",
        "prod",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Snapshot run should succeed");
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["recommendations"][0]["resourceId"], "lb-1");
    assert_eq!(report["failures"].as_array().unwrap().len(), 0);
}
