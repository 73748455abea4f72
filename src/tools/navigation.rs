//! Navigation tools: definitions, declarations, hover, and references.

use std::path::{Path, PathBuf};

use serde_json::{Value, json};

use crate::als::client::AlsClient;
use crate::als::types::{HoverContents, all_locations, first_location};
use crate::tools::location_fields;
use crate::utils::position::to_wire_position;
use crate::utils::uri::{path_to_uri, uri_to_display_path};

/// Navigate to the definition of the symbol at a location.
pub async fn handle_goto_definition(client: &AlsClient, file: &str, line: u32, column: u32) -> Value {
    navigate(client, "textDocument/definition", file, line, column).await
}

/// Navigate to the definition of the symbol's type.
pub async fn handle_type_definition(client: &AlsClient, file: &str, line: u32, column: u32) -> Value {
    navigate(client, "textDocument/typeDefinition", file, line, column).await
}

/// Navigate from a declaration to its body.
pub async fn handle_implementation(client: &AlsClient, file: &str, line: u32, column: u32) -> Value {
    navigate(client, "textDocument/implementation", file, line, column).await
}

/// Shared shape of the three definition-style lookups: same request
/// parameters, same first-location result handling.
async fn navigate(client: &AlsClient, method: &str, file: &str, line: u32, column: u32) -> Value {
    let uri = match path_to_uri(file) {
        Ok(uri) => uri,
        Err(e) => return json!({"found": false, "error": e.tool_message()}),
    };
    client.ensure_file_open(Path::new(file)).await;

    let params = json!({
        "textDocument": {"uri": uri},
        "position": to_wire_position(line, column),
    });
    let result = match client.send_request(method, params).await {
        Ok(result) => result,
        Err(e) => {
            log::error!(target: "adabridge::tools", "{method} failed: {e}");
            return json!({"found": false, "error": e.tool_message()});
        }
    };

    let Some(location) = first_location(&result) else {
        return json!({"found": false});
    };
    let (file, line, column, preview) = location_fields(&location).await;
    json!({
        "found": true,
        "file": file,
        "line": line,
        "column": column,
        "preview": preview,
    })
}

/// Get type information and documentation for the symbol at a location.
pub async fn handle_hover(client: &AlsClient, file: &str, line: u32, column: u32) -> Value {
    let uri = match path_to_uri(file) {
        Ok(uri) => uri,
        Err(e) => return json!({"found": false, "error": e.tool_message()}),
    };
    client.ensure_file_open(Path::new(file)).await;

    let params = json!({
        "textDocument": {"uri": uri},
        "position": to_wire_position(line, column),
    });
    let result = match client.send_request("textDocument/hover", params).await {
        Ok(result) => result,
        Err(e) => {
            log::error!(target: "adabridge::tools", "hover failed: {e}");
            return json!({"found": false, "error": e.tool_message()});
        }
    };

    if result.is_null() {
        return json!({"found": false});
    }

    let contents = result
        .get("contents")
        .cloned()
        .and_then(|contents| serde_json::from_value::<HoverContents>(contents).ok())
        .map(HoverContents::flatten)
        .unwrap_or_default();

    json!({"found": true, "contents": contents})
}

/// Find all references to the symbol at a location.
pub async fn handle_find_references(
    client: &AlsClient,
    file: &str,
    line: u32,
    column: u32,
    include_declaration: bool,
) -> Value {
    let uri = match path_to_uri(file) {
        Ok(uri) => uri,
        Err(e) => return json!({"references": [], "count": 0, "error": e.tool_message()}),
    };
    client.ensure_file_open(Path::new(file)).await;

    let params = json!({
        "textDocument": {"uri": uri},
        "position": to_wire_position(line, column),
        "context": {"includeDeclaration": include_declaration},
    });
    let result = match client.send_request("textDocument/references", params).await {
        Ok(result) => result,
        Err(e) => {
            log::error!(target: "adabridge::tools", "references failed: {e}");
            return json!({"references": [], "count": 0, "error": e.tool_message()});
        }
    };

    let mut references = Vec::new();
    for location in all_locations(&result) {
        let (file, line, column, preview) = location_fields(&location).await;
        references.push(json!({
            "file": file,
            "line": line,
            "column": column,
            "preview": preview,
        }));
    }

    json!({
        "count": references.len(),
        "references": references,
    })
}

/// Find the declaration (spec) for the symbol at a location.
///
/// When the server has no answer, or no position was given, fall back
/// to swapping the file extension between body and spec on disk.
pub async fn handle_get_spec(
    client: &AlsClient,
    file: &str,
    line: Option<u32>,
    column: Option<u32>,
) -> Value {
    if let (Some(line), Some(column)) = (line, column) {
        let uri = match path_to_uri(file) {
            Ok(uri) => uri,
            Err(e) => return spec_not_found(&e.tool_message()),
        };
        client.ensure_file_open(Path::new(file)).await;

        let params = json!({
            "textDocument": {"uri": uri},
            "position": to_wire_position(line, column),
        });
        match client.send_request("textDocument/declaration", params).await {
            Ok(result) => {
                if let Some(location) = first_location(&result) {
                    let (spec_file, line, column, preview) = location_fields(&location).await;
                    return json!({
                        "found": true,
                        "spec_file": spec_file,
                        "line": line,
                        "column": column,
                        "preview": preview,
                    });
                }
            }
            Err(e) => {
                log::warn!(target: "adabridge::tools", "declaration lookup failed, trying disk fallback: {e}");
            }
        }
    }

    // Disk fallback: body <-> spec by extension swap
    if let Some(counterpart) = sibling_unit(Path::new(file))
        && counterpart.exists()
    {
        let preview = first_code_line(&counterpart).await;
        return json!({
            "found": true,
            "spec_file": counterpart.display().to_string(),
            "line": 1,
            "column": 1,
            "preview": preview,
        });
    }

    spec_not_found("No spec file found")
}

fn spec_not_found(error: &str) -> Value {
    json!({
        "found": false,
        "spec_file": Value::Null,
        "line": Value::Null,
        "column": Value::Null,
        "preview": "",
        "error": error,
    })
}

/// The other half of an Ada compilation unit: `.adb` ↔ `.ads`.
fn sibling_unit(path: &Path) -> Option<PathBuf> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let swapped = match extension.as_str() {
        "adb" => "ads",
        "ads" => "adb",
        _ => return None,
    };
    Some(path.with_extension(swapped))
}

/// First non-comment, non-blank line of a source file.
async fn first_code_line(path: &Path) -> String {
    let Ok(text) = tokio::fs::read_to_string(path).await else {
        return String::new();
    };
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("--"))
        .map(str::to_string)
        .unwrap_or_default()
}
