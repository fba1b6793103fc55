use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use httpmock::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn cargo_bin() -> Command {
    Command::cargo_bin("specpit").expect("binary exists")
}

fn write_suite(temp: &assert_fs::TempDir, name: &str, base_url: &str, expected: u16) {
    temp.child(name)
        .write_str(&format!(
            r#"{{
  "name": "ping",
  "baseUrl": "{base_url}",
  "headers": {{"monitor": "false"}},
  "sequences": [
    {{"name": "health", "scenarios": [
      {{"name": "ping", "path": "/ping", "expect": {{"status": {expected}, "bodyContains": "ok"}},
        "capture": {{"flag": "ok"}}}}
    ]}}
  ]
}}"#
        ))
        .unwrap();
}

#[test]
fn displays_help() {
    let mut cmd = cargo_bin();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Scenario-first HTTP contract runner"));
}

#[test]
fn displays_version() {
    let mut cmd = cargo_bin();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn errors_when_suite_missing() {
    let mut cmd = cargo_bin();
    cmd.args(["run", "missing.suite.json"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("missing.suite.json"));
}

#[test]
fn passing_suite_exits_zero_and_writes_report() {
    let temp = assert_fs::TempDir::new().unwrap();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/ping").header("monitor", "false");
        then.status(200)
            .header("content-type", "application/json")
            .body("{\"ok\":true}");
    });

    write_suite(&temp, "ping.suite.json", &server.base_url(), 200);

    let mut cmd = cargo_bin();
    cmd.current_dir(temp.path());
    cmd.args(["run", "ping.suite.json", "--report", "reports/run.json"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("ping"))
        .stdout(predicate::str::contains("1 passed"));

    temp.child("reports/run.json")
        .assert(predicate::str::contains("\"passed\": 1"));
    mock.assert();
}

#[test]
fn failing_suite_exits_nonzero() {
    let temp = assert_fs::TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/ping");
        then.status(503).body("{\"ok\":false}");
    });

    write_suite(&temp, "ping.suite.json", "http://unused.invalid", 200);

    let mut cmd = cargo_bin();
    cmd.current_dir(temp.path());
    cmd.args([
        "run",
        "ping.suite.json",
        "--base-url",
        &server.base_url(),
        "--no-preflight",
        "--timeout",
        "5000",
    ]);

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("unexpected status: got 503 want 200"));
}

#[test]
fn malformed_suite_aborts_before_sending() {
    let temp = assert_fs::TempDir::new().unwrap();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.any_request();
        then.status(200);
    });

    temp.child("broken.suite.json")
        .write_str(&format!(
            r#"{{"name": "broken", "baseUrl": "{}", "sequences": [
                {{"name": "a", "scenarios": [
                  {{"name": "ok", "path": "/ok", "expect": {{"status": 200}}}},
                  {{"name": "bad", "path": "/bad", "requires": ["nothing"], "expect": {{"status": 200}}}}
                ]}}
            ]}}"#,
            server.base_url()
        ))
        .unwrap();

    let mut cmd = cargo_bin();
    cmd.current_dir(temp.path());
    cmd.args(["run", "broken.suite.json"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("requires capture"));
    mock.assert_hits(0);
}
