//! CLI Integration Tests
//!
//! Runs the binary end-to-end, piping protocol traffic through stdin.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// Get the binary to test, isolated from any user or project config.
fn calendar_mcp(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("calendar-mcp").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env_remove("CALENDAR_MCP_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

/// Run `serve` over `input` and parse every stdout line as JSON.
fn serve(input: impl Into<Vec<u8>>) -> Vec<Value> {
    let home = TempDir::new().unwrap();
    let output = calendar_mcp(&home).write_stdin(input).output().unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn header_frame(body: &str) -> String {
    format!("Content-Length: {}\r\n\r\n{}", body.len(), body)
}

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    calendar_mcp(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Calendar tools for AI assistants"));
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    calendar_mcp(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// ============================================================================
// Serve Tests
// ============================================================================

#[test]
fn test_serve_is_default_and_exits_on_eof() {
    let home = TempDir::new().unwrap();
    calendar_mcp(&home).write_stdin("").assert().success().stdout(predicate::str::is_empty());
}

#[test]
fn test_serve_initialize_over_lines() {
    let responses = serve("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n");
    assert_eq!(responses.len(), 1);

    let result = &responses[0]["result"];
    assert_eq!(responses[0]["id"], 1);
    assert_eq!(result["protocolVersion"], "2025-03-26");
    assert_eq!(result["serverInfo"]["name"], "calendar-mcp");
    assert!(result["capabilities"]["tools"].is_object());
}

#[test]
fn test_serve_mixed_framing() {
    let mut input = header_frame(r#"{"jsonrpc":"2.0","id":"a","method":"initialize"}"#);
    input.push_str("{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n");
    input.push_str(&header_frame(r#"{"jsonrpc":"2.0","id":"b","method":"tools/list"}"#));
    input.push_str("{\"jsonrpc\":\"2.0\",\"id\":\"c\",\"method\":\"resources/list\"}\n");

    let responses = serve(input);
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["id"], "a");
    assert_eq!(responses[1]["id"], "b");
    assert_eq!(responses[1]["result"]["tools"].as_array().unwrap().len(), 7);
    assert_eq!(responses[2]["id"], "c");
    assert_eq!(responses[2]["error"]["code"], -32601);
}

#[test]
fn test_serve_parse_error() {
    let responses = serve("{not json}\n");
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[0]["error"]["code"], -32700);
}

#[test]
fn test_serve_tool_call_round_trip() {
    let create = r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"calendar_create_event","arguments":{"title":"Standup","startDate":"2024-05-06 09:00","endDate":"2024-05-06 09:15","recurrenceFrequency":"daily","recurrenceCount":5}}}"#;
    let list = r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"calendar_list_events","arguments":{"startDate":"2024-05-01","endDate":"2024-05-31"}}}"#;

    let responses = serve(format!("{create}\n{list}\n"));
    assert_eq!(responses.len(), 2);

    let created = responses[0]["result"]["content"][0]["text"].as_str().unwrap();
    assert!(created.starts_with("Event 'Standup' created successfully in calendar 'Personal' (recurring)"));

    let listed = responses[1]["result"]["content"][0]["text"].as_str().unwrap();
    assert!(listed.starts_with("Found 5 event(s):"));
}

#[test]
fn test_serve_unknown_tool() {
    let responses = serve(
        "{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"tools/call\",\"params\":{\"name\":\"nope\"}}\n",
    );
    assert_eq!(responses[0]["error"]["code"], -32601);
    assert_eq!(responses[0]["error"]["message"], "Tool not found");
}

#[test]
fn test_serve_logs_stay_off_stdout() {
    let home = TempDir::new().unwrap();
    let output = calendar_mcp(&home)
        .arg("--verbose")
        .write_stdin("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n")
        .output()
        .unwrap();

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.starts_with('{'));
    assert!(!output.stderr.is_empty());
}

#[test]
fn test_serve_with_denied_access() {
    let home = TempDir::new().unwrap();
    let mut file = tempfile::NamedTempFile::new_in(home.path()).unwrap();
    writeln!(file, "[calendar]\naccess = \"denied\"").unwrap();

    let output = calendar_mcp(&home)
        .arg("--config")
        .arg(file.path())
        .write_stdin(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/call\",\"params\":{\"name\":\"calendar_list_calendars\"}}\n",
        )
        .output()
        .unwrap();

    let response: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        response["result"]["content"][0]["text"],
        "Calendar access denied. Please grant permission in the server configuration."
    );
}

// ============================================================================
// Tools / Config / Completions
// ============================================================================

#[test]
fn test_tools_text() {
    let home = TempDir::new().unwrap();
    calendar_mcp(&home)
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("7 tool(s)"))
        .stdout(predicate::str::contains("calendar_search_events"))
        .stdout(predicate::str::contains("Required: title, startDate, endDate"));
}

#[test]
fn test_tools_json() {
    let home = TempDir::new().unwrap();
    let output = calendar_mcp(&home).args(["tools", "--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let tools: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(tools.as_array().unwrap().len(), 7);
    assert_eq!(tools[0]["name"], "calendar_list_events");
    assert_eq!(tools[0]["inputSchema"]["type"], "object");
}

#[test]
fn test_tools_unsupported_format() {
    let home = TempDir::new().unwrap();
    calendar_mcp(&home)
        .args(["tools", "--format", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported format"));
}

#[test]
fn test_config_shows_defaults() {
    let home = TempDir::new().unwrap();
    calendar_mcp(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("read_chunk_size = 4096"))
        .stdout(predicate::str::contains("id = \"holidays\""));
}

#[test]
fn test_config_path_without_file() {
    let home = TempDir::new().unwrap();
    calendar_mcp(&home)
        .args(["config", "--path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(built-in defaults)"));
}

#[test]
fn test_config_path_finds_local_file() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join(".calendar-mcp.toml"), "[logging]\nlevel = \"warn\"\n").unwrap();

    calendar_mcp(&home)
        .args(["config", "--path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".calendar-mcp.toml"));
}

#[test]
fn test_invalid_config_fails() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join(".calendar-mcp.toml"), "[transport]\nread_chunk_size = 0\n")
        .unwrap();

    calendar_mcp(&home)
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("read_chunk_size"));
}

#[test]
fn test_completions() {
    let home = TempDir::new().unwrap();
    calendar_mcp(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("calendar-mcp"));
}
