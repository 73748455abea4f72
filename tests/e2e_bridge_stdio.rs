//! End-to-end test of the compiled bridge binary over its stdio boundary.
//!
//! Drives the real executable with newline-delimited JSON-RPC, using `cat`
//! as the pooled language server so no Ada toolchain is required.

use std::process::Stdio;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

async fn next_response(
    lines: &mut tokio::io::Lines<BufReader<tokio::process::ChildStdout>>,
) -> Value {
    let line = tokio::time::timeout(Duration::from_secs(30), lines.next_line())
        .await
        .expect("timed out waiting for a response")
        .expect("stdout read failed")
        .expect("bridge closed stdout early");
    serde_json::from_str(&line).expect("response was not valid JSON")
}

#[tokio::test]
async fn handshake_tool_listing_and_calls() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("demo.gpr"), "project Demo is end Demo;\n").unwrap();
    let source = dir.path().join("m.adb");
    std::fs::write(&source, "procedure M is begin null; end M;\n").unwrap();

    let mut bridge = Command::new(env!("CARGO_BIN_EXE_adabridge"))
        .env("LS_PATH", "cat")
        .env("ADA_PROJECT_ROOT", dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .expect("failed to spawn bridge binary");

    let mut stdin = bridge.stdin.take().unwrap();
    let mut lines = BufReader::new(bridge.stdout.take().unwrap()).lines();

    let mut send = async |message: Value| {
        let mut line = serde_json::to_string(&message).unwrap();
        line.push('\n');
        stdin.write_all(line.as_bytes()).await.unwrap();
        stdin.flush().await.unwrap();
    };

    // Handshake
    send(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}})).await;
    let response = next_response(&mut lines).await;
    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["serverInfo"]["name"], "adabridge");

    // Tool listing
    send(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;
    let response = next_response(&mut lines).await;
    let tools = response["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 15);
    assert!(tools.iter().any(|tool| tool["name"] == "ada_goto_definition"));

    // Diagnostics over the (empty) push store
    send(json!({
        "jsonrpc": "2.0",
        "id": 3,
        "method": "tools/call",
        "params": {"name": "ada_diagnostics", "arguments": {"severity": "all"}},
    }))
    .await;
    let response = next_response(&mut lines).await;
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    let payload: Value = serde_json::from_str(text).unwrap();
    assert_eq!(payload["totalCount"], 0);

    // Rename validation short-circuits without touching the server
    send(json!({
        "jsonrpc": "2.0",
        "id": 4,
        "method": "tools/call",
        "params": {
            "name": "ada_rename_symbol",
            "arguments": {
                "file": source.display().to_string(),
                "line": 1,
                "column": 11,
                "new_name": "X__Y",
            },
        },
    }))
    .await;
    let response = next_response(&mut lines).await;
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    let payload: Value = serde_json::from_str(text).unwrap();
    assert_eq!(payload["success"], false);
    assert_eq!(payload["error"], "Invalid Ada identifier: 'X__Y'");

    // Closing stdin shuts the bridge down cleanly
    drop(send);
    drop(stdin);
    let status = tokio::time::timeout(Duration::from_secs(30), bridge.wait())
        .await
        .expect("bridge did not exit after stdin closed")
        .unwrap();
    assert!(status.success());
}
