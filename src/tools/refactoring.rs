//! Code-intelligence and refactoring tools: completions, signature help,
//! code actions, symbol renaming, and whole-file formatting.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use crate::als::client::AlsClient;
use crate::als::types::{CompletionResponse, completion_kind_name};
use crate::error::BridgeError;
use crate::utils::position::{from_wire_position_value, to_wire_position};
use crate::utils::uri::{path_to_uri, uri_to_display_path};

/// Request code completions at a location.
pub async fn handle_completions(
    client: &AlsClient,
    file: &str,
    line: u32,
    column: u32,
    trigger_character: Option<&str>,
    limit: usize,
) -> Value {
    let uri = match path_to_uri(file) {
        Ok(uri) => uri,
        Err(e) => {
            return json!({"completions": [], "count": 0, "is_incomplete": false, "error": e.tool_message()});
        }
    };
    client.ensure_file_open(Path::new(file)).await;

    let context = match trigger_character {
        // 2 = TriggerCharacter, 1 = Invoked
        Some(character) => json!({"triggerKind": 2, "triggerCharacter": character}),
        None => json!({"triggerKind": 1}),
    };
    let params = json!({
        "textDocument": {"uri": uri},
        "position": to_wire_position(line, column),
        "context": context,
    });

    let result = match client.send_request("textDocument/completion", params).await {
        Ok(result) => result,
        Err(e) => {
            log::error!(target: "adabridge::tools", "completion failed: {e}");
            return json!({"completions": [], "count": 0, "is_incomplete": false, "error": e.tool_message()});
        }
    };

    let (items, is_incomplete) = serde_json::from_value::<CompletionResponse>(result)
        .map(CompletionResponse::into_parts)
        .unwrap_or_default();

    let completions: Vec<Value> = items
        .iter()
        .take(limit)
        .map(|item| {
            let label = item.get("label").and_then(Value::as_str).unwrap_or("");
            json!({
                "label": label,
                "kind": completion_kind_name(item.get("kind").and_then(Value::as_u64).unwrap_or(1)),
                "detail": item.get("detail").and_then(Value::as_str).unwrap_or(""),
                "documentation": extract_documentation(item.get("documentation")),
                "insert_text": item.get("insertText").and_then(Value::as_str).unwrap_or(label),
                "sort_text": item.get("sortText").and_then(Value::as_str).unwrap_or(""),
            })
        })
        .collect();

    json!({
        "count": completions.len(),
        "completions": completions,
        "is_incomplete": is_incomplete,
    })
}

/// Request parameter help for the call surrounding a location.
pub async fn handle_signature_help(client: &AlsClient, file: &str, line: u32, column: u32) -> Value {
    let not_found = || {
        json!({
            "found": false,
            "signatures": [],
            "active_signature": 0,
            "active_parameter": 0,
        })
    };

    let uri = match path_to_uri(file) {
        Ok(uri) => uri,
        Err(e) => {
            let mut payload = not_found();
            payload["error"] = json!(e.tool_message());
            return payload;
        }
    };
    client.ensure_file_open(Path::new(file)).await;

    let params = json!({
        "textDocument": {"uri": uri},
        "position": to_wire_position(line, column),
    });
    let result = match client.send_request("textDocument/signatureHelp", params).await {
        Ok(result) => result,
        Err(e) => {
            log::error!(target: "adabridge::tools", "signatureHelp failed: {e}");
            let mut payload = not_found();
            payload["error"] = json!(e.tool_message());
            return payload;
        }
    };

    let signatures_raw = result
        .get("signatures")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if signatures_raw.is_empty() {
        return not_found();
    }

    let signatures: Vec<Value> = signatures_raw
        .iter()
        .map(|signature| {
            let parameters: Vec<Value> = signature
                .get("parameters")
                .and_then(Value::as_array)
                .map(|params| {
                    params
                        .iter()
                        .map(|parameter| {
                            json!({
                                "label": parameter.get("label").cloned().unwrap_or(json!("")),
                                "documentation": extract_documentation(parameter.get("documentation")),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();
            json!({
                "label": signature.get("label").and_then(Value::as_str).unwrap_or(""),
                "documentation": extract_documentation(signature.get("documentation")),
                "parameters": parameters,
            })
        })
        .collect();

    json!({
        "found": true,
        "signatures": signatures,
        "active_signature": result.get("activeSignature").and_then(Value::as_u64).unwrap_or(0),
        "active_parameter": result.get("activeParameter").and_then(Value::as_u64).unwrap_or(0),
    })
}

/// List code actions available over a range.
pub async fn handle_code_actions(
    client: &AlsClient,
    file: &str,
    start_line: u32,
    start_column: u32,
    end_line: Option<u32>,
    end_column: Option<u32>,
) -> Value {
    let uri = match path_to_uri(file) {
        Ok(uri) => uri,
        Err(e) => return json!({"actions": [], "count": 0, "error": e.tool_message()}),
    };
    client.ensure_file_open(Path::new(file)).await;

    let params = json!({
        "textDocument": {"uri": uri},
        "range": {
            "start": to_wire_position(start_line, start_column),
            "end": to_wire_position(
                end_line.unwrap_or(start_line),
                end_column.unwrap_or(start_column),
            ),
        },
        "context": {"diagnostics": [], "only": Value::Null},
    });

    let result = match client.send_request("textDocument/codeAction", params).await {
        Ok(result) => result,
        Err(e) => {
            log::error!(target: "adabridge::tools", "codeAction failed: {e}");
            return json!({"actions": [], "count": 0, "error": e.tool_message()});
        }
    };

    let actions: Vec<Value> = result
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter(|action| action.get("title").is_some())
                .map(|action| {
                    let edit = action.get("edit");
                    let files_affected = edit
                        .map(|edit| {
                            let changes = edit
                                .get("changes")
                                .and_then(Value::as_object)
                                .map(|changes| changes.len())
                                .unwrap_or(0);
                            let document_changes = edit
                                .get("documentChanges")
                                .and_then(Value::as_array)
                                .map(|changes| changes.len())
                                .unwrap_or(0);
                            changes.max(document_changes)
                        })
                        .unwrap_or(0);

                    let mut entry = json!({
                        "title": action.get("title").and_then(Value::as_str).unwrap_or(""),
                        "kind": action.get("kind").and_then(Value::as_str).unwrap_or(""),
                        "is_preferred": action.get("isPreferred").and_then(Value::as_bool).unwrap_or(false),
                        "has_edit": edit.is_some(),
                        "files_affected": files_affected,
                    });
                    if let Some(command) = action.get("command") {
                        entry["command"] = json!(
                            command
                                .get("title")
                                .or_else(|| command.get("command"))
                                .and_then(Value::as_str)
                                .unwrap_or("")
                        );
                    }
                    entry
                })
                .collect()
        })
        .unwrap_or_default();

    json!({"count": actions.len(), "actions": actions})
}

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("identifier pattern"));

/// Ada identifier rules: letter first, then letters/digits/underscores,
/// no doubled underscore, no trailing underscore.
fn is_valid_ada_identifier(name: &str) -> bool {
    !name.is_empty()
        && IDENTIFIER.is_match(name)
        && !name.contains("__")
        && !name.ends_with('_')
}

/// Rename the symbol at a location across the project.
///
/// The new name is validated before any server contact; invalid names are
/// rejected locally. With `preview` (the default) the edit list is
/// returned without being applied.
pub async fn handle_rename_symbol(
    client: &AlsClient,
    file: &str,
    line: u32,
    column: u32,
    new_name: &str,
    preview: bool,
) -> Value {
    let failure = |error: String| {
        json!({
            "success": false,
            "error": error,
            "changes": [],
            "total_changes": 0,
        })
    };

    if !is_valid_ada_identifier(new_name) {
        return failure(format!("Invalid Ada identifier: '{new_name}'"));
    }

    let uri = match path_to_uri(file) {
        Ok(uri) => uri,
        Err(e) => return failure(e.tool_message()),
    };
    client.ensure_file_open(Path::new(file)).await;

    let position_params = json!({
        "textDocument": {"uri": uri},
        "position": to_wire_position(line, column),
    });
    let prepared = match client
        .send_request("textDocument/prepareRename", position_params.clone())
        .await
    {
        Ok(result) => result,
        Err(e) => return failure(rename_error_message(e)),
    };
    if prepared.is_null() {
        return failure("Cannot rename symbol at this location".to_string());
    }
    let old_name = prepared
        .get("placeholder")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let mut rename_params = position_params;
    rename_params["newName"] = json!(new_name);
    let result = match client.send_request("textDocument/rename", rename_params).await {
        Ok(result) => result,
        Err(e) => return failure(rename_error_message(e)),
    };
    if result.is_null() {
        return failure("Rename operation failed".to_string());
    }

    // A WorkspaceEdit carries `changes`, `documentChanges`, or both
    let mut changes = Vec::new();
    if let Some(by_uri) = result.get("changes").and_then(Value::as_object) {
        for (uri, edits) in by_uri {
            push_edits(&mut changes, uri, edits, &old_name, new_name);
        }
    }
    if let Some(document_changes) = result.get("documentChanges").and_then(Value::as_array) {
        for change in document_changes {
            let Some(uri) = change
                .pointer("/textDocument/uri")
                .and_then(Value::as_str)
            else {
                continue;
            };
            let edits = change.get("edits").cloned().unwrap_or(json!([]));
            push_edits(&mut changes, uri, &edits, &old_name, new_name);
        }
    }

    let files_affected: HashSet<String> = changes
        .iter()
        .filter_map(|change| change.get("file").and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    json!({
        "success": true,
        "old_name": old_name,
        "new_name": new_name,
        "total_changes": changes.len(),
        "files_affected": files_affected.len(),
        "changes": changes,
        "applied": !preview,
    })
}

fn rename_error_message(error: BridgeError) -> String {
    log::error!(target: "adabridge::tools", "rename failed: {error}");
    error.tool_message()
}

fn push_edits(changes: &mut Vec<Value>, uri: &str, edits: &Value, old_name: &str, new_name: &str) {
    let Some(edits) = edits.as_array() else { return };
    let file = uri_to_display_path(uri);
    for edit in edits {
        let start = edit.pointer("/range/start").cloned().unwrap_or(Value::Null);
        let (line, column) = from_wire_position_value(&start);
        changes.push(json!({
            "file": file,
            "line": line,
            "column": column,
            "old_text": old_name,
            "new_text": new_name,
        }));
    }
}

/// Reformat a whole file, returning the server's text edits.
pub async fn handle_format_file(
    client: &AlsClient,
    file: &str,
    tab_size: u32,
    insert_spaces: bool,
) -> Value {
    let uri = match path_to_uri(file) {
        Ok(uri) => uri,
        Err(e) => {
            return json!({"formatted": false, "file": file, "changes": 0, "edits": [], "error": e.tool_message()});
        }
    };
    client.ensure_file_open(Path::new(file)).await;

    let params = json!({
        "textDocument": {"uri": uri},
        "options": {"tabSize": tab_size, "insertSpaces": insert_spaces},
    });
    let result = match client.send_request("textDocument/formatting", params).await {
        Ok(result) => result,
        Err(e) => {
            log::error!(target: "adabridge::tools", "formatting failed: {e}");
            return json!({"formatted": false, "file": file, "changes": 0, "edits": [], "error": e.tool_message()});
        }
    };

    if result.is_null() {
        return json!({"formatted": false, "file": file, "changes": 0, "edits": []});
    }

    // An empty edit list means the file was already formatted
    let edits: Vec<Value> = result
        .as_array()
        .map(|edits| {
            edits
                .iter()
                .map(|edit| {
                    let (start_line, start_column) = from_wire_position_value(
                        edit.pointer("/range/start").unwrap_or(&Value::Null),
                    );
                    let (end_line, end_column) = from_wire_position_value(
                        edit.pointer("/range/end").unwrap_or(&Value::Null),
                    );
                    json!({
                        "start_line": start_line,
                        "start_column": start_column,
                        "end_line": end_line,
                        "end_column": end_column,
                        "new_text": edit.get("newText").and_then(Value::as_str).unwrap_or(""),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    json!({
        "formatted": true,
        "file": file,
        "changes": edits.len(),
        "edits": edits,
    })
}

fn extract_documentation(documentation: Option<&Value>) -> String {
    match documentation {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Object(markup)) => markup
            .get("value")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}
