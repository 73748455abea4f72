//! Tool translators.
//!
//! Each translator maps one externally exposed operation onto one or more
//! language-server requests: paths become URIs, 1-based user coordinates
//! become 0-based wire coordinates, and the union-shaped server responses
//! are normalized into the tool's fixed JSON payload. Server failures come
//! back as structured error payloads, never as panics.

pub mod diagnostics;
pub mod hierarchy;
pub mod navigation;
pub mod refactoring;
pub mod symbols;

use std::path::Path;

use crate::als::types::Location;
use crate::utils::position::from_wire_position;
use crate::utils::uri::uri_to_display_path;

/// Read one line of a file for a location preview, trimmed of trailing
/// whitespace. Unreadable files produce an empty preview rather than an
/// error.
pub(crate) async fn line_preview(path: &Path, line_0based: u32) -> String {
    let Ok(text) = tokio::fs::read_to_string(path).await else {
        return String::new();
    };
    text.lines()
        .nth(line_0based as usize)
        .map(|line| line.trim_end().to_string())
        .unwrap_or_default()
}

/// Render a normalized location as `(file, line, column, preview)`.
pub(crate) async fn location_fields(location: &Location) -> (String, u32, u32, String) {
    let file = uri_to_display_path(&location.uri);
    let (line, column) =
        from_wire_position(location.range.start.line, location.range.start.character);
    let preview = line_preview(Path::new(&file), location.range.start.line).await;
    (file, line, column, preview)
}

/// Shared harness for translator tests: a client wired to a scripted
/// in-process server over duplex streams.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use serde_json::{Value, json};
    use tokio::io::BufReader;

    use crate::als::client::AlsClient;
    use crate::als::framing;

    /// What the scripted server answers for one request.
    pub(crate) enum Reply {
        Result(Value),
        Error(i64, &'static str),
    }

    /// Spawn a fake language server that answers every request through
    /// `respond` and records each incoming method name (requests and
    /// notifications alike).
    pub(crate) fn scripted_client<F>(mut respond: F) -> (Arc<AlsClient>, Arc<Mutex<Vec<String>>>)
    where
        F: FnMut(&str, &Value) -> Reply + Send + 'static,
    {
        let (client_io, server_io) = tokio::io::duplex(256 * 1024);
        let (client_read, client_write) = tokio::io::split(client_io);
        let (server_read, mut server_write) = tokio::io::split(server_io);
        let client = AlsClient::from_streams(client_write, client_read, Duration::from_secs(5));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_server = Arc::clone(&seen);
        tokio::spawn(async move {
            let mut reader = BufReader::new(server_read);
            while let Ok(Some(message)) = framing::read_message(&mut reader).await {
                let method = message
                    .get("method")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                if !method.is_empty() {
                    seen_by_server.lock().unwrap().push(method.clone());
                }

                let Some(id) = message.get("id").cloned() else {
                    continue; // notification
                };
                let params = message.get("params").cloned().unwrap_or(Value::Null);
                let reply = match respond(&method, &params) {
                    Reply::Result(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
                    Reply::Error(code, text) => json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": {"code": code, "message": text},
                    }),
                };
                if framing::write_message(&mut server_write, &reply).await.is_err() {
                    break;
                }
            }
        });

        (client, seen)
    }

    /// A project directory holding one spec and one body file.
    pub(crate) fn sample_project() -> (tempfile::TempDir, std::path::PathBuf, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let spec = dir.path().join("utils.ads");
        let body = dir.path().join("utils.adb");
        std::fs::write(
            &spec,
            "package Utils is\n   function Add (A, B : Integer) return Integer;\nend Utils;\n",
        )
        .unwrap();
        std::fs::write(
            &body,
            "package body Utils is\n   function Add (A, B : Integer) return Integer is\n   begin\n      return A + B;\n   end Add;\nend Utils;\n",
        )
        .unwrap();
        (dir, spec, body)
    }
}
