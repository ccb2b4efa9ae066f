use assert_cmd::Command;
use predicates::prelude::*;

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("exec-dashboard").unwrap();
    for var in [
        "EXEC_DASHBOARD_BASE_URL",
        "EXEC_DASHBOARD_EXECUTED_BY",
        "EXEC_DASHBOARD_SCRIPT_NAME",
        "EXEC_DASHBOARD_USER_ID",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn help_lists_headless_flags() {
    bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--base-url"))
        .stdout(predicate::str::contains("--download"))
        .stdout(predicate::str::contains("--poll-interval"));
}

#[test]
fn version_is_printed() {
    bin()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn text_listing_prints_most_recent_first() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("POST", "/list-scripts")
        .match_body(mockito::Matcher::Json(
            serde_json::json!({"scriptNames": ["AgentsValidation"]}),
        ))
        .with_status(200)
        .with_body(
            r#"[
                {"id": 1, "executed_by": "Ops", "status": "Pass", "modified_at": "2025-01-01T00:00:00Z"},
                {"id": 2, "executed_by": "Ops", "status": "Running", "modified_at": "2025-02-01T00:00:00Z"}
            ]"#,
        )
        .create();

    let out = bin()
        .args(["--text", "--base-url", &server.url()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let out = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("2 "));
    assert!(lines[2].starts_with("1 "));
}

#[test]
fn failed_listing_exits_with_error() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("POST", "/list-scripts")
        .with_status(500)
        .create();

    bin()
        .args(["--json", "--base-url", &server.url()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to list executions"));
}

#[test]
fn zero_poll_interval_is_refused() {
    bin()
        .args(["--text", "--poll-interval", "0s"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("greater than zero"));
}
