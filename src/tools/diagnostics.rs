//! Diagnostics tool.
//!
//! Reads the client's push-populated diagnostics store; no server request
//! is involved. The store holds the last `publishDiagnostics` payload per
//! URI, so this is always the server's current view.

use serde_json::{Value, json};

use crate::als::client::AlsClient;
use crate::als::types::DiagnosticSeverity;
use crate::utils::uri::{path_to_uri, uri_to_display_path};

/// Get cached compiler diagnostics, filtered by file and severity.
pub async fn handle_diagnostics(client: &AlsClient, file: Option<&str>, severity: &str) -> Value {
    let uri_filter = match file {
        Some(file) => match path_to_uri(file) {
            Ok(uri) => Some(uri),
            Err(e) => {
                return json!({
                    "diagnostics": [],
                    "errorCount": 0,
                    "warningCount": 0,
                    "hintCount": 0,
                    "totalCount": 0,
                    "error": e.tool_message(),
                });
            }
        },
        None => None,
    };

    let snapshot = client.get_diagnostics(uri_filter.as_deref(), None);
    let severity_filter = severity_filter(severity);

    let mut diagnostics = Vec::new();
    let mut error_count = 0u64;
    let mut warning_count = 0u64;
    let mut hint_count = 0u64;

    for (uri, entries) in &snapshot {
        let file_path = uri_to_display_path(uri);
        for diagnostic in entries {
            if let Some(allowed) = &severity_filter
                && !allowed.contains(&diagnostic.severity)
            {
                continue;
            }

            match diagnostic.severity {
                DiagnosticSeverity::Error => error_count += 1,
                DiagnosticSeverity::Warning => warning_count += 1,
                DiagnosticSeverity::Information | DiagnosticSeverity::Hint => hint_count += 1,
            }

            diagnostics.push(json!({
                "file": file_path,
                "line": diagnostic.range.start.line + 1,
                "column": diagnostic.range.start.character + 1,
                "endLine": diagnostic.range.end.line + 1,
                "endColumn": diagnostic.range.end.character + 1,
                "severity": diagnostic.severity.as_str(),
                "message": diagnostic.message,
                "code": diagnostic.code.clone().unwrap_or(Value::Null),
                "source": diagnostic.source.clone().unwrap_or_else(|| "ada".to_string()),
            }));
        }
    }

    json!({
        "diagnostics": diagnostics,
        "errorCount": error_count,
        "warningCount": warning_count,
        "hintCount": hint_count,
        "totalCount": diagnostics.len(),
    })
}

/// Severities admitted by a filter string; `None` means no filtering.
///
/// `hint` includes informational diagnostics. An unknown filter string
/// matches nothing rather than failing the call.
fn severity_filter(severity: &str) -> Option<Vec<DiagnosticSeverity>> {
    match severity.to_ascii_lowercase().as_str() {
        "all" => None,
        "error" => Some(vec![DiagnosticSeverity::Error]),
        "warning" => Some(vec![DiagnosticSeverity::Warning]),
        "hint" => Some(vec![DiagnosticSeverity::Hint, DiagnosticSeverity::Information]),
        "info" => Some(vec![DiagnosticSeverity::Information]),
        _ => Some(Vec::new()),
    }
}
