//! Call-hierarchy tool: who calls this subprogram, and what does it call.

use std::path::Path;

use serde_json::{Value, json};

use crate::als::client::AlsClient;
use crate::utils::position::to_wire_position;
use crate::utils::uri::{path_to_uri, uri_to_display_path};

/// Query the call hierarchy around the symbol at a location.
///
/// `direction` selects `outgoing` (default), `incoming`, or `both`. The
/// symbol is first resolved with `prepareCallHierarchy`; the returned item
/// is then fed verbatim into the directional requests.
pub async fn handle_call_hierarchy(
    client: &AlsClient,
    file: &str,
    line: u32,
    column: u32,
    direction: &str,
) -> Value {
    let uri = match path_to_uri(file) {
        Ok(uri) => uri,
        Err(e) => return not_found_with_error(&e.tool_message()),
    };
    client.ensure_file_open(Path::new(file)).await;

    let params = json!({
        "textDocument": {"uri": uri},
        "position": to_wire_position(line, column),
    });
    let prepared = match client
        .send_request("textDocument/prepareCallHierarchy", params)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            log::error!(target: "adabridge::tools", "prepareCallHierarchy failed: {e}");
            return not_found_with_error(&e.tool_message());
        }
    };

    let item = match &prepared {
        Value::Array(items) => items.first().cloned(),
        Value::Null => None,
        other => Some(other.clone()),
    };
    let Some(item) = item else {
        return json!({"found": false, "outgoing_calls": [], "incoming_calls": []});
    };

    let mut outgoing = Vec::new();
    let mut incoming = Vec::new();

    if matches!(direction, "outgoing" | "both") {
        match client
            .send_request("callHierarchy/outgoingCalls", json!({"item": item}))
            .await
        {
            Ok(result) => outgoing = collect_calls(&result, "to"),
            Err(e) => {
                log::warn!(target: "adabridge::tools", "outgoingCalls failed: {e}");
            }
        }
    }
    if matches!(direction, "incoming" | "both") {
        match client
            .send_request("callHierarchy/incomingCalls", json!({"item": item}))
            .await
        {
            Ok(result) => incoming = collect_calls(&result, "from"),
            Err(e) => {
                log::warn!(target: "adabridge::tools", "incomingCalls failed: {e}");
            }
        }
    }

    json!({
        "found": true,
        "symbol": item.get("name").and_then(Value::as_str).unwrap_or(""),
        "outgoing_count": outgoing.len(),
        "incoming_count": incoming.len(),
        "outgoing_calls": outgoing,
        "incoming_calls": incoming,
    })
}

fn not_found_with_error(error: &str) -> Value {
    json!({
        "found": false,
        "outgoing_calls": [],
        "incoming_calls": [],
        "error": error,
    })
}

/// Flatten one directional call list; `endpoint` is `"to"` for outgoing
/// calls and `"from"` for incoming ones.
fn collect_calls(result: &Value, endpoint: &str) -> Vec<Value> {
    let Some(calls) = result.as_array() else {
        return Vec::new();
    };
    calls
        .iter()
        .filter_map(|call| call.get(endpoint))
        .map(|target| {
            let start_line = target
                .pointer("/range/start/line")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let start_character = target
                .pointer("/range/start/character")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            json!({
                "name": target.get("name").and_then(Value::as_str).unwrap_or(""),
                "kind": target.get("kind").and_then(Value::as_u64).unwrap_or(0),
                "file": target
                    .get("uri")
                    .and_then(Value::as_str)
                    .map(uri_to_display_path)
                    .unwrap_or_default(),
                "line": start_line + 1,
                "column": start_character + 1,
            })
        })
        .collect()
}
