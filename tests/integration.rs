//! End-to-end tests for scenarist
//!
//! These drive the real binary as the worker process:
//! 1. Scripts are sent to `scenarist worker` through the executor
//! 2. Fixture files are run as suites against a local HTTP server
//! 3. The CLI is run as a subprocess and its exit code and report checked

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use scenarist::common::config::Reporter;
use scenarist::executor::{Executor, WorkerCommand};
use scenarist::http::codec;
use scenarist::http::{HttpRequest, HttpResponse};
use scenarist::ipc::Job;
use scenarist::testing::Suite;
use scenarist::{Error, ErrorKind};
use serde_json::json;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};

fn scenarist_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_scenarist"))
}

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn executor(timeout_ms: u64) -> Executor {
    Executor::new(
        WorkerCommand::new(scenarist_bin(), vec!["worker".to_string()]),
        Duration::from_millis(timeout_ms),
    )
}

/// Copy the named fixture files into `dir`
fn copy_fixtures(dir: &Path, names: &[&str]) {
    for name in names {
        fs::copy(fixtures_dir().join(name), dir.join(name)).expect("Failed to copy fixture");
    }
}

async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

// === Test HTTP server ===

fn respond(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![("Content-Type".to_string(), content_type.to_string())],
        body: body.into(),
    }
}

fn query_param<'a>(request: &'a HttpRequest, key: &str) -> Option<&'a str> {
    let (_, query) = request.target.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

/// `/ok` answers 200, `/echo` returns the request body, `/trigger?port=N`
/// calls back `GET /` on port N, anything else is a 404
fn route(request: &HttpRequest) -> HttpResponse {
    match request.path() {
        "/ok" => respond(200, "text/plain", "ok"),
        "/echo" => respond(
            200,
            request.header("content-type").unwrap_or("text/plain"),
            request.body.clone(),
        ),
        "/trigger" => {
            let Some(port) = query_param(request, "port").map(str::to_string) else {
                return respond(400, "text/plain", "missing port");
            };
            tokio::spawn(async move {
                let _ = reqwest::get(format!("http://127.0.0.1:{}/", port)).await;
            });
            respond(200, "text/plain", "triggered")
        }
        _ => respond(404, "text/plain", "not found"),
    }
}

async fn handle_connection(stream: TcpStream) {
    let (reader, mut writer) = stream.into_split();
    if let Ok(request) = codec::read_request(&mut BufReader::new(reader)).await {
        let _ = codec::write_response(&mut writer, &route(&request)).await;
    }
}

/// Start the server, returning its base URL
async fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(handle_connection(stream));
        }
    });
    base
}

// === Executor ===

#[tokio::test]
async fn test_worker_returns_value() {
    let value = executor(5000)
        .execute(Job::source("return: {\"a\": [1, 2]}"), None)
        .await
        .unwrap();
    assert_eq!(value, json!({"a": [1, 2]}));
}

#[tokio::test]
async fn test_worker_thrown_error_keeps_message() {
    let err = executor(5000)
        .execute(Job::source("throw: out of coffee"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Remote { .. }));
    assert_eq!(err.kind(), ErrorKind::Generic);
    assert_eq!(err.to_string(), "out of coffee");
}

#[tokio::test]
async fn test_worker_callback_steps() {
    let script = r#"
style: callback
result: stack
steps:
  - action: wait
    ms: 10
  - action: render
    template: "x"
"#;
    let value = executor(5000).execute(Job::source(script), None).await.unwrap();
    assert_eq!(value, json!(["wait 10 ms", "render template inline"]));
}

#[tokio::test]
async fn test_worker_failure_is_the_same_in_every_style() {
    let steps = "steps:\n  - action: wait\n    ms: 5\n  - action: expect_content_to_include\n    text: ok\n";
    let mut failures = Vec::new();
    for style in ["future", "callback"] {
        let script = format!("style: {style}\n{steps}");
        let err = executor(5000)
            .execute(Job::source(script), None)
            .await
            .unwrap_err();
        failures.push((err.kind(), err.to_string()));
    }

    assert_eq!(failures[0].0, ErrorKind::Assertion);
    assert!(failures[0].1.starts_with("when wait 5 ms: "), "{}", failures[0].1);
    assert_eq!(failures[0], failures[1]);
}

#[tokio::test]
async fn test_worker_syntax_error() {
    let err = executor(5000)
        .execute(Job::source("steps: [\n  - action: wait\n"), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
}

#[tokio::test]
async fn test_worker_panic_is_contained() {
    let err = executor(5000)
        .execute(Job::source("panic: kaboom"), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Panic);
    assert!(err.to_string().contains("kaboom"));

    // The next job gets a fresh worker
    let value = executor(5000).execute(Job::source("return: 2"), None).await.unwrap();
    assert_eq!(value, json!(2));
}

#[tokio::test]
async fn test_worker_timeout() {
    let script = "steps:\n  - action: wait\n    ms: 10000\n";
    let start = std::time::Instant::now();
    let err = executor(5000)
        .execute(Job::source(script), Some(Duration::from_millis(300)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(err.to_string(), "Timeout of 300ms exceeded");
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_worker_runs_file_in_workdir() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("greeting.txt"), "hello").unwrap();
    fs::write(
        dir.path().join("script.yaml"),
        "steps:\n  - action: load\n    path: greeting.txt\n  - action: expect_content_to_include\n    text: ell\n",
    )
    .unwrap();

    let job = Job::file("script.yaml").in_dir(dir.path());
    let value = executor(5000).execute(job, None).await.unwrap();
    assert_eq!(value, json!("hello"));
}

// === Suites ===

#[tokio::test(flavor = "multi_thread")]
async fn test_csv_request_suite() {
    let base = start_server().await;
    let dir = tempfile::tempdir().unwrap();
    let spec = dir.path().join("home-request.csv");
    fs::write(
        &spec,
        format!(
            "name;host;url;code\nhome page;{base};/ok;200\nmissing page;{base};/missing;200\n"
        ),
    )
    .unwrap();

    let suite = Suite::load(&spec).unwrap();
    assert_eq!(suite.tests.len(), 2);
    let report = suite.run(&executor(5000), Reporter::Json).await;

    assert_eq!(report.tests, 2);
    assert_eq!(report.passes, 1);
    assert_eq!(report.failures, 1);
    assert!(report.cases[0].passed);

    let error = report.cases[1].error.as_deref().unwrap();
    assert!(error.contains("expected 404 to equal 200"), "{}", error);
    assert!(error.starts_with("when request "), "{}", error);
    assert_eq!(report.cases[1].kind, Some(ErrorKind::Assertion));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_yaml_suite_with_body_and_xsd() {
    let base = start_server().await;
    let dir = tempfile::tempdir().unwrap();
    copy_fixtures(
        dir.path(),
        &["status.xml", "status.xsd", "status-types.xsd", "valid-case.yaml"],
    );
    let spec = dir.path().join("status.yaml");
    fs::write(
        &spec,
        format!(
            r#"scenario: request
host: {base}
url: /echo
method: POST
code: 200
contentType: application/xml
body: status.xml
xsd: status.xsd
message: hello
tests:
  - !include valid-case.yaml
  - name: negative code
    statusCode: -5
"#
        ),
    )
    .unwrap();

    let report = Suite::load(&spec)
        .unwrap()
        .run(&executor(5000), Reporter::Json)
        .await;
    assert_eq!(report.cases[0].name, "valid status");
    assert!(report.cases[0].passed, "{:?}", report.cases[0].error);

    assert!(!report.cases[1].passed);
    let error = report.cases[1].error.as_deref().unwrap();
    assert!(error.contains("Invalid XML"), "{}", error);
    assert!(error.contains("'-5'"), "{}", error);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_request_and_listen_suite() {
    let base = start_server().await;
    let port = free_port().await;
    let dir = tempfile::tempdir().unwrap();
    let spec = dir.path().join("callback.yaml");
    fs::write(
        &spec,
        format!(
            "scenario: request_and_listen\ntests:\n  - name: calls back\n    host: {base}\n    url: /trigger?port={port}\n    code: 200\n    listeningPort: {port}\n"
        ),
    )
    .unwrap();

    let report = Suite::load(&spec)
        .unwrap()
        .run(&executor(5000), Reporter::Json)
        .await;
    assert!(report.success(), "{:?}", report.cases);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_listen_port_reused_after_failure() {
    let base = start_server().await;
    let port = free_port().await;
    // The server calls back with GET, the first listener expects POST
    let script = |method: &str| {
        format!(
            "steps:\n  - action: listen\n    port: {port}\n    url: /\n    method: {method}\n    timeout_ms: 3000\n    trigger:\n      - action: request\n        url: {base}/trigger?port={port}\n"
        )
    };

    let err = executor(5000)
        .execute(Job::source(script("POST")), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Assertion);
    assert!(err
        .to_string()
        .contains("Unexpected method: expected 'GET' to equal 'POST'"));

    executor(5000)
        .execute(Job::source(script("GET")), None)
        .await
        .unwrap();
}

// === CLI ===

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_run_json_report_and_exit_code() {
    let base = start_server().await;
    let dir = tempfile::tempdir().unwrap();
    let spec = dir.path().join("smoke-request.csv");
    fs::write(&spec, format!("host;url;code\n{base};/ok;200\n{base};/nope;200\n")).unwrap();

    let output = tokio::process::Command::new(scenarist_bin())
        .args(["run", "--reporter", "json", "--timeout", "5000"])
        .arg(&spec)
        .current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .env("RUST_LOG", "off")
        .output()
        .await
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["tests"], 2);
    assert_eq!(report["passes"], 1);
    assert_eq!(report["failures"], 1);
    assert_eq!(report["cases"][0]["name"], "test 1");
}

#[test]
fn test_cli_lists_scenarios() {
    let output = std::process::Command::new(scenarist_bin())
        .args(["scenarios", "--json"])
        .env("RUST_LOG", "off")
        .output()
        .unwrap();
    assert!(output.status.success());
    let list: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<_> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["request", "request_and_listen"]);
}

#[test]
fn test_cli_unknown_scenario_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let spec = dir.path().join("tests.csv");
    fs::write(&spec, "scenario;host;url;code\nteleport;http://x;/;200\n").unwrap();

    let output = std::process::Command::new(scenarist_bin())
        .arg("run")
        .arg(&spec)
        .current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("teleport is not a known scenario"), "{}", stderr);
}
