//! Symbol tools: file outlines and workspace-wide symbol search.

use std::path::Path;

use serde_json::{Value, json};

use crate::als::client::AlsClient;
use crate::als::types::symbol_kind_name;
use crate::utils::position::from_wire_position_value;
use crate::utils::uri::{path_to_uri, uri_to_display_path};

/// Get all symbols defined in a file as a hierarchical outline.
pub async fn handle_document_symbols(client: &AlsClient, file: &str) -> Value {
    let uri = match path_to_uri(file) {
        Ok(uri) => uri,
        Err(e) => return json!({"symbols": [], "error": e.tool_message()}),
    };
    client.ensure_file_open(Path::new(file)).await;

    let result = match client
        .send_request("textDocument/documentSymbol", json!({"textDocument": {"uri": uri}}))
        .await
    {
        Ok(result) => result,
        Err(e) => {
            log::error!(target: "adabridge::tools", "documentSymbol failed: {e}");
            return json!({"symbols": [], "error": e.tool_message()});
        }
    };

    // The server answers with DocumentSymbol[] (hierarchical) or
    // SymbolInformation[] (flat, location-bearing); both are accepted
    let symbols: Vec<Value> = result
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    if item.get("location").is_some() {
                        convert_symbol_information(item)
                    } else {
                        convert_document_symbol(item)
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    json!({"symbols": symbols})
}

/// Search for symbols by name across the whole workspace.
pub async fn handle_workspace_symbols(
    client: &AlsClient,
    query: &str,
    kind: &str,
    limit: usize,
) -> Value {
    let result = match client
        .send_request("workspace/symbol", json!({"query": query}))
        .await
    {
        Ok(result) => result,
        Err(e) => {
            log::error!(target: "adabridge::tools", "workspace/symbol failed: {e}");
            return json!({"symbols": [], "error": e.tool_message()});
        }
    };

    let items = result.as_array().cloned().unwrap_or_default();
    let kind_filter = kind_filter(kind);

    let mut symbols = Vec::new();
    for item in &items {
        let symbol_kind = item.get("kind").and_then(Value::as_u64).unwrap_or(0);
        if let Some(allowed) = &kind_filter
            && !allowed.contains(&symbol_kind)
        {
            continue;
        }
        symbols.push(convert_symbol_information(item));
        if symbols.len() >= limit {
            break;
        }
    }

    json!({
        "count": symbols.len(),
        "symbols": symbols,
        "truncated": items.len() > limit,
    })
}

/// SymbolKind values admitted by a kind filter string; `None` means no
/// filtering. Ada procedures and functions both surface as
/// FUNCTION/METHOD, and types cover the record/enum/interface kinds.
fn kind_filter(kind: &str) -> Option<&'static [u64]> {
    const PACKAGE: &[u64] = &[4, 2, 3]; // package, module, namespace
    const SUBPROGRAM: &[u64] = &[12, 6]; // function, method
    const TYPE: &[u64] = &[5, 23, 10, 11]; // class, struct, enum, interface
    const VARIABLE: &[u64] = &[13, 14, 8]; // variable, constant, field
    const NONE: &[u64] = &[];

    match kind.to_ascii_lowercase().as_str() {
        "all" => None,
        "package" => Some(PACKAGE),
        "procedure" | "function" => Some(SUBPROGRAM),
        "type" => Some(TYPE),
        "variable" => Some(VARIABLE),
        _ => Some(NONE),
    }
}

/// Convert a hierarchical DocumentSymbol, recursing into children.
fn convert_document_symbol(item: &Value) -> Value {
    let range = item.get("range").cloned().unwrap_or(Value::Null);
    let selection = item.get("selectionRange").cloned().unwrap_or_else(|| range.clone());
    let (line, column) =
        from_wire_position_value(selection.get("start").unwrap_or(&Value::Null));

    let range_start = range
        .get("start")
        .and_then(|p| p.get("line"))
        .and_then(Value::as_u64)
        .unwrap_or(0)
        + 1;
    let range_end = range
        .get("end")
        .and_then(|p| p.get("line"))
        .and_then(Value::as_u64)
        .unwrap_or(0)
        + 1;

    let mut symbol = json!({
        "name": item.get("name").and_then(Value::as_str).unwrap_or(""),
        "kind": symbol_kind_name(item.get("kind").and_then(Value::as_u64).unwrap_or(0)),
        "line": line,
        "column": column,
        "range": {"start": range_start, "end": range_end},
    });

    if let Some(detail) = item.get("detail") {
        symbol["detail"] = detail.clone();
    }
    if let Some(children) = item.get("children").and_then(Value::as_array)
        && !children.is_empty()
    {
        symbol["children"] = Value::Array(
            children.iter().map(convert_document_symbol).collect(),
        );
    }
    symbol
}

/// Convert a flat SymbolInformation entry.
fn convert_symbol_information(item: &Value) -> Value {
    let location = item.get("location").cloned().unwrap_or(Value::Null);
    let uri = location.get("uri").and_then(Value::as_str).unwrap_or("");
    let (line, column) = from_wire_position_value(
        location
            .get("range")
            .and_then(|r| r.get("start"))
            .unwrap_or(&Value::Null),
    );

    json!({
        "name": item.get("name").and_then(Value::as_str).unwrap_or(""),
        "kind": symbol_kind_name(item.get("kind").and_then(Value::as_u64).unwrap_or(0)),
        "file": if uri.is_empty() { String::new() } else { uri_to_display_path(uri) },
        "line": line,
        "column": column,
        "containerName": item.get("containerName").and_then(Value::as_str).unwrap_or(""),
    })
}
