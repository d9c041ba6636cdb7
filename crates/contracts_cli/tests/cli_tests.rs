use assert_cmd::Command;
use predicates::prelude::*;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to get the path to test fixtures
fn fixture_path(name: &str) -> String {
    format!("tests/fixtures/{}", name)
}

/// Helper to create a Command for the dce binary
#[allow(deprecated)]
fn dce() -> Command {
    Command::cargo_bin("dce").expect("Failed to find dce binary")
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

/// Writes the users fixture into a SQLite database.
fn users_db(dir: &Path) -> PathBuf {
    let path = dir.join("users.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE users (user_id INTEGER, email TEXT, status TEXT, age INTEGER);
         INSERT INTO users VALUES
           (1, 'a@example.com', 'active', 34),
           (2, 'b@example.com', 'inactive', 27),
           (3, NULL, 'active', 41),
           (4, 'd@example.com', 'active', 19),
           (5, 'e@example.com', 'pending', 52);",
    )
    .unwrap();
    path
}

// ============================================================================
// check command tests
// ============================================================================

#[test]
fn test_check_valid_contract() {
    dce()
        .arg("check")
        .arg(fixture_path("users_contract.yml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Contract is valid"))
        .stdout(predicate::str::contains("users"))
        .stdout(predicate::str::contains("data-team"))
        .stdout(predicate::str::contains("email_present (not_null) on email"))
        .stdout(predicate::str::contains("unique_2 (unique)"))
        .stdout(predicate::str::contains("min_rows_5 (min_rows)"));
}

#[test]
fn test_check_toml_and_json_contracts() {
    dce()
        .arg("check")
        .arg(fixture_path("contract.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("users_toml"))
        .stdout(predicate::str::contains("pushdown=off"))
        .stdout(predicate::str::contains("status_values"));

    dce()
        .arg("check")
        .arg(fixture_path("contract.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("users_json"));
}

#[test]
fn test_check_json_output() {
    let output = dce()
        .args(["check", "--format", "json"])
        .arg(fixture_path("users_contract.yml"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["valid"], true);
    assert_eq!(json["version"], "1.2.0");
    assert_eq!(json["rules"].as_array().unwrap().len(), 5);
    assert_eq!(json["rules"][3]["id"], "adult");
    assert_eq!(json["rules"][3]["columns"][0], "age");
}

#[test]
fn test_check_unknown_rule_kind() {
    dce()
        .arg("check")
        .arg(fixture_path("unknown_kind.yml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("Unknown rule kind 'no_such_rule'"));
}

#[test]
fn test_check_missing_parameter() {
    dce()
        .arg("check")
        .arg(fixture_path("missing_param.yml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Missing required parameter 'column' for rule 'bounded'",
        ));
}

#[test]
fn test_check_malformed_and_missing_files() {
    dce()
        .arg("check")
        .arg(fixture_path("malformed.yml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse contract file"));

    dce()
        .arg("check")
        .arg("nonexistent.yml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

// ============================================================================
// rules command tests
// ============================================================================

#[test]
fn test_rules_lists_builtin_kinds() {
    dce()
        .arg("rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("not_null"))
        .stdout(predicate::str::contains("allowed_values"))
        .stdout(predicate::str::contains("aggregate"))
        .stdout(predicate::str::contains("regex"));
}

#[test]
fn test_rules_json_output() {
    let output = dce().args(["rules", "--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    let kinds: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["kind"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec![
            "aggregate",
            "allowed_values",
            "max_rows",
            "min_rows",
            "not_null",
            "pattern",
            "range",
            "unique"
        ]
    );
}

// ============================================================================
// validate command tests
// ============================================================================

#[test]
fn test_validate_failing_contract_exits_one() {
    dce()
        .arg("validate")
        .arg(fixture_path("users_contract.yml"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Validation FAILED"))
        .stdout(predicate::str::contains("email_present (not_null)"))
        .stdout(predicate::str::contains("known_status (allowed_values)"))
        .stdout(predicate::str::contains("5 total, 3 passed, 2 failed"));
}

#[test]
fn test_validate_passing_contract() {
    dce()
        .arg("validate")
        .arg(fixture_path("passing_contract.yml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Validation PASSED"))
        .stdout(predicate::str::contains("5 total, 5 passed, 0 failed"));
}

#[test]
fn test_validate_json_output() {
    let output = dce()
        .args(["validate", "--format", "json"])
        .arg(fixture_path("users_contract.yml"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let json = stdout_json(&output);
    assert_eq!(json["summary"]["total_rules"], 5);
    assert_eq!(json["summary"]["rules_failed"], 2);
    assert_eq!(json["summary"]["passed"], false);
    assert_eq!(json["results"][0]["rule_id"], "email_present");
    assert_eq!(json["results"][0]["failing_count"], 1);
    assert_eq!(json["results"][0]["sample"][0]["row"], 2);
    assert_eq!(json["results"][2]["sample"][0]["values"]["status"], "pending");
    assert_eq!(json["stats"]["projection"]["loaded_count"], 4);
}

#[test]
fn test_validate_missing_column_is_reported_per_rule() {
    let output = dce()
        .args(["validate", "--format", "json"])
        .arg(fixture_path("missing_column.yml"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let json = stdout_json(&output);
    assert_eq!(json["results"][0]["failing_count"], serde_json::Value::Null);
    assert_eq!(json["results"][0]["error"]["kind"], "missing_column");
    assert_eq!(json["results"][1]["passed"], true);
}

#[test]
fn test_validate_sqlite_dataset_override() {
    let dir = TempDir::new().unwrap();
    let db = users_db(dir.path());
    let address = format!("sqlite://{}?table=users", db.display());

    let output = dce()
        .args(["validate", "--format", "json", "--stats", "full", "--dataset"])
        .arg(&address)
        .arg(fixture_path("users_contract.yml"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let json = stdout_json(&output);
    assert_eq!(json["summary"]["rules_failed"], 2);
    assert_eq!(json["stats"]["execution"][0]["route"], "pushdown");
    assert_eq!(json["stats"]["execution"][4]["route"], "local");
    assert_eq!(json["stats"]["projection"]["loaded_count"], 0);
}

#[test]
fn test_validate_pushdown_off_matches_auto() {
    let dir = TempDir::new().unwrap();
    let db = users_db(dir.path());
    let address = format!("sqlite://{}?table=users", db.display());

    let run = |mode: &str| {
        let output = dce()
            .args(["validate", "--format", "json", "--sample-size", "0", "--pushdown", mode])
            .args(["--dataset", &address])
            .arg(fixture_path("users_contract.yml"))
            .output()
            .unwrap();
        stdout_json(&output)["results"].clone()
    };

    assert_eq!(run("off"), run("auto"));
}

#[test]
fn test_validate_force_on_file_source_fails() {
    dce()
        .args(["validate", "--pushdown", "force"])
        .arg(fixture_path("users_contract.yml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("force"));
}

#[test]
fn test_validate_missing_dataset() {
    dce()
        .args(["validate", "--dataset", "/nonexistent/users.csv"])
        .arg(fixture_path("users_contract.yml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Dataset not found"));
}

#[test]
fn test_validate_unknown_scheme() {
    dce()
        .args(["validate", "--dataset", "ftp://host/users.csv"])
        .arg(fixture_path("users_contract.yml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No connector registered for scheme 'ftp'"));
}

#[test]
fn test_validate_with_invalid_options() {
    dce()
        .args(["validate", "--pushdown", "sometimes"])
        .arg(fixture_path("users_contract.yml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown pushdown mode"));

    dce()
        .args(["validate", "--format", "xml"])
        .arg(fixture_path("users_contract.yml"))
        .assert()
        .failure();

    dce()
        .args(["validate", "--sample-size", "many"])
        .arg(fixture_path("users_contract.yml"))
        .assert()
        .failure();
}

// ============================================================================
// explain command tests
// ============================================================================

#[test]
fn test_explain_sqlite_plan() {
    let dir = TempDir::new().unwrap();
    let db = users_db(dir.path());
    let address = format!("sqlite://{}?table=users", db.display());

    dce()
        .args(["explain", "--dataset", &address])
        .arg(fixture_path("users_contract.yml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("EXECUTION PLAN: users"))
        .stdout(predicate::str::contains("Dialect:   sqlite"))
        .stdout(predicate::str::contains("whole-dataset rule"))
        .stdout(predicate::str::contains("SELECT"));
}

#[test]
fn test_explain_json_for_local_file() {
    let output = dce()
        .args(["explain", "--format", "json"])
        .arg(fixture_path("users_contract.yml"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["dialect"], serde_json::Value::Null);
    assert_eq!(json["queries"].as_array().unwrap().len(), 0);
    assert_eq!(json["rules"][0]["route"], "local");
    assert_eq!(json["rules"][0]["note"], "source is not SQL-backed");
    assert_eq!(json["available"].as_array().unwrap().len(), 4);
}

// ============================================================================
// general
// ============================================================================

#[test]
fn test_cli_help() {
    dce()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("rules"))
        .stdout(predicate::str::contains("explain"));
}

#[test]
fn test_cli_version() {
    dce()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_validate_help() {
    dce()
        .args(["validate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dataset"))
        .stdout(predicate::str::contains("--pushdown"))
        .stdout(predicate::str::contains("--format"));
}
