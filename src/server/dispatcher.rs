//! Newline-delimited JSON-RPC dispatcher.
//!
//! Reads one request per line from the inbound stream, routes `tools/call`
//! invocations to the translators through the instance pool, and writes
//! one response per line. Translator payloads are serialized into the
//! `content` envelope; failures become structured error payloads so the
//! bridge process never dies on a tool fault.

use std::path::Path;
use std::sync::Arc;

use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::als::pool::AlsPool;
use crate::server::catalog::tool_descriptors;
use crate::tools::{diagnostics, hierarchy, navigation, refactoring, symbols};

/// Protocol version echoed to the client on initialize.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Tool-dispatch loop over a newline-delimited JSON-RPC stream.
pub struct Dispatcher {
    pool: Arc<AlsPool>,
}

impl Dispatcher {
    pub fn new(pool: Arc<AlsPool>) -> Self {
        Self { pool }
    }

    /// Serve requests until the inbound stream closes.
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<Value>(line) {
                Ok(message) => self.handle_message(message).await,
                Err(e) => Some(json!({
                    "jsonrpc": "2.0",
                    "id": Value::Null,
                    "error": {"code": -32700, "message": format!("Parse error: {e}")},
                })),
            };

            if let Some(response) = response {
                let mut text = serde_json::to_string(&response)?;
                text.push('\n');
                writer.write_all(text.as_bytes()).await?;
                writer.flush().await?;
            }
        }
        Ok(())
    }

    /// Handle one request; notifications produce no response.
    async fn handle_message(&self, message: Value) -> Option<Value> {
        let method = message
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let params = message.get("params").cloned().unwrap_or_else(|| json!({}));

        let Some(id) = message.get("id").cloned().filter(|id| !id.is_null()) else {
            log::debug!(target: "adabridge::server", "notification: {method}");
            return None;
        };

        log::debug!(target: "adabridge::server", "request id={id} method={method}");
        let outcome = match method.as_str() {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                },
                "capabilities": {"tools": {}},
            })),
            "tools/list" => Ok(json!({"tools": tool_descriptors()})),
            "tools/call" => self.handle_tool_call(&params).await,
            "ping" => Ok(json!({})),
            other => Err((-32601, format!("Method not found: {other}"))),
        };

        Some(match outcome {
            Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
            Err((code, message)) => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": code, "message": message},
            }),
        })
    }

    async fn handle_tool_call(&self, params: &Value) -> Result<Value, (i64, String)> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| (-32602, "missing tool name".to_string()))?;
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let payload = self.dispatch_tool(name, &arguments).await;
        let text = serde_json::to_string_pretty(&payload)
            .unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"));
        Ok(json!({"content": [{"type": "text", "text": text}]}))
    }

    /// Route one tool invocation. Argument validation happens before the
    /// pool is consulted, so malformed calls never spawn a server.
    async fn dispatch_tool(&self, name: &str, args: &Value) -> Value {
        macro_rules! require {
            ($expr:expr, $name:literal) => {
                match $expr {
                    Some(value) => value,
                    None => {
                        return json!({"error": format!("missing required argument: {}", $name)});
                    }
                }
            };
        }

        let file = args.get("file").and_then(Value::as_str);
        let line = args.get("line").and_then(Value::as_u64).map(|v| v as u32);
        let column = args.get("column").and_then(Value::as_u64).map(|v| v as u32);

        // Tool names that do not exist are reported without pool contact
        let known = tool_descriptors()
            .iter()
            .any(|tool| tool["name"] == name);
        if !known {
            return json!({"error": format!("Unknown tool: {name}")});
        }

        // Validate required arguments per tool before acquiring a client
        match name {
            "ada_goto_definition" | "ada_type_definition" | "ada_implementation" | "ada_hover"
            | "ada_signature_help" | "ada_call_hierarchy" | "ada_completions" => {
                require!(file, "file");
                require!(line, "line");
                require!(column, "column");
            }
            "ada_get_spec" | "ada_document_symbols" | "ada_format_file" => {
                require!(file, "file");
            }
            "ada_find_references" => {
                require!(file, "file");
                require!(line, "line");
                require!(column, "column");
            }
            "ada_workspace_symbols" => {
                require!(args.get("query").and_then(Value::as_str), "query");
            }
            "ada_code_actions" => {
                require!(file, "file");
                require!(args.get("start_line").and_then(Value::as_u64), "start_line");
                require!(args.get("start_column").and_then(Value::as_u64), "start_column");
            }
            "ada_rename_symbol" => {
                require!(file, "file");
                require!(line, "line");
                require!(column, "column");
                require!(args.get("new_name").and_then(Value::as_str), "new_name");
            }
            _ => {}
        }

        let client = match self.pool.get(file.map(Path::new)).await {
            Ok(client) => client,
            Err(e) => {
                log::error!(target: "adabridge::server", "pool lookup failed: {e}");
                return json!({"error": format!("Failed to connect to language server: {e}")});
            }
        };

        match name {
            "ada_goto_definition" => {
                navigation::handle_goto_definition(
                    &client,
                    file.unwrap_or_default(),
                    line.unwrap_or(1),
                    column.unwrap_or(1),
                )
                .await
            }
            "ada_type_definition" => {
                navigation::handle_type_definition(
                    &client,
                    file.unwrap_or_default(),
                    line.unwrap_or(1),
                    column.unwrap_or(1),
                )
                .await
            }
            "ada_implementation" => {
                navigation::handle_implementation(
                    &client,
                    file.unwrap_or_default(),
                    line.unwrap_or(1),
                    column.unwrap_or(1),
                )
                .await
            }
            "ada_get_spec" => {
                navigation::handle_get_spec(&client, file.unwrap_or_default(), line, column).await
            }
            "ada_hover" => {
                navigation::handle_hover(
                    &client,
                    file.unwrap_or_default(),
                    line.unwrap_or(1),
                    column.unwrap_or(1),
                )
                .await
            }
            "ada_find_references" => {
                let include_declaration = args
                    .get("include_declaration")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                navigation::handle_find_references(
                    &client,
                    file.unwrap_or_default(),
                    line.unwrap_or(1),
                    column.unwrap_or(1),
                    include_declaration,
                )
                .await
            }
            "ada_document_symbols" => {
                symbols::handle_document_symbols(&client, file.unwrap_or_default()).await
            }
            "ada_workspace_symbols" => {
                let query = args.get("query").and_then(Value::as_str).unwrap_or_default();
                let kind = args.get("kind").and_then(Value::as_str).unwrap_or("all");
                let limit = args.get("limit").and_then(Value::as_u64).unwrap_or(50) as usize;
                symbols::handle_workspace_symbols(&client, query, kind, limit).await
            }
            "ada_diagnostics" => {
                let severity = args.get("severity").and_then(Value::as_str).unwrap_or("all");
                diagnostics::handle_diagnostics(&client, file, severity).await
            }
            "ada_call_hierarchy" => {
                let direction = args
                    .get("direction")
                    .and_then(Value::as_str)
                    .unwrap_or("outgoing");
                hierarchy::handle_call_hierarchy(
                    &client,
                    file.unwrap_or_default(),
                    line.unwrap_or(1),
                    column.unwrap_or(1),
                    direction,
                )
                .await
            }
            "ada_completions" => {
                let trigger = args.get("trigger_character").and_then(Value::as_str);
                let limit = args.get("limit").and_then(Value::as_u64).unwrap_or(50) as usize;
                refactoring::handle_completions(
                    &client,
                    file.unwrap_or_default(),
                    line.unwrap_or(1),
                    column.unwrap_or(1),
                    trigger,
                    limit,
                )
                .await
            }
            "ada_signature_help" => {
                refactoring::handle_signature_help(
                    &client,
                    file.unwrap_or_default(),
                    line.unwrap_or(1),
                    column.unwrap_or(1),
                )
                .await
            }
            "ada_code_actions" => {
                let start_line = args.get("start_line").and_then(Value::as_u64).unwrap_or(1) as u32;
                let start_column =
                    args.get("start_column").and_then(Value::as_u64).unwrap_or(1) as u32;
                let end_line = args.get("end_line").and_then(Value::as_u64).map(|v| v as u32);
                let end_column = args.get("end_column").and_then(Value::as_u64).map(|v| v as u32);
                refactoring::handle_code_actions(
                    &client,
                    file.unwrap_or_default(),
                    start_line,
                    start_column,
                    end_line,
                    end_column,
                )
                .await
            }
            "ada_rename_symbol" => {
                let new_name = args.get("new_name").and_then(Value::as_str).unwrap_or_default();
                let preview = args.get("preview").and_then(Value::as_bool).unwrap_or(true);
                refactoring::handle_rename_symbol(
                    &client,
                    file.unwrap_or_default(),
                    line.unwrap_or(1),
                    column.unwrap_or(1),
                    new_name,
                    preview,
                )
                .await
            }
            "ada_format_file" => {
                let tab_size = args.get("tab_size").and_then(Value::as_u64).unwrap_or(3) as u32;
                let insert_spaces = args
                    .get("insert_spaces")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                refactoring::handle_format_file(
                    &client,
                    file.unwrap_or_default(),
                    tab_size,
                    insert_spaces,
                )
                .await
            }
            other => json!({"error": format!("Unknown tool: {other}")}),
        }
    }
}
