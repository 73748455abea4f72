//! Wire types for language-server responses.
//!
//! The server returns several union-shaped values (`Location | LocationLink`,
//! `string | MarkupContent | MarkedString[]`, `CompletionList |
//! CompletionItem[]`). Each union is modelled as an untagged enum with a
//! normalization step so the tool-facing shape is always monomorphic.

use serde::Deserialize;
use serde_json::Value;

/// 0-based wire position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct WirePosition {
    pub line: u32,
    #[serde(default)]
    pub character: u32,
}

/// Wire range with start and end positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct WireRange {
    pub start: WirePosition,
    #[serde(default)]
    pub end: WirePosition,
}

/// Normalized location: URI plus range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub uri: String,
    pub range: WireRange,
}

/// A location as the server sends it: either a plain `Location` or a
/// `LocationLink` with target fields. Both normalize to [`Location`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LocationItem {
    Link {
        #[serde(rename = "targetUri")]
        target_uri: String,
        #[serde(rename = "targetSelectionRange")]
        target_selection_range: Option<WireRange>,
        #[serde(rename = "targetRange")]
        target_range: Option<WireRange>,
    },
    Plain {
        uri: String,
        range: WireRange,
    },
}

impl LocationItem {
    /// Collapse into a [`Location`], preferring the selection range of a
    /// link over its full target range.
    pub fn into_location(self) -> Location {
        match self {
            LocationItem::Plain { uri, range } => Location { uri, range },
            LocationItem::Link {
                target_uri,
                target_selection_range,
                target_range,
            } => Location {
                uri: target_uri,
                range: target_selection_range
                    .or(target_range)
                    .unwrap_or_default(),
            },
        }
    }
}

/// Extract the first location from a definition-style response.
///
/// The server may answer with `null`, a single location, or an array; all
/// three are accepted, and `LocationLink` entries are normalized.
pub fn first_location(result: &Value) -> Option<Location> {
    let candidate = match result {
        Value::Null => return None,
        Value::Array(items) => items.first()?,
        other => other,
    };
    serde_json::from_value::<LocationItem>(candidate.clone())
        .ok()
        .map(LocationItem::into_location)
}

/// Parse every location in a references-style response.
pub fn all_locations(result: &Value) -> Vec<Location> {
    match result {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                serde_json::from_value::<LocationItem>(item.clone())
                    .ok()
                    .map(LocationItem::into_location)
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Diagnostic severity, stored as received (unknown values collapse to
/// `Error`, matching how absent severities are treated).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "u8")]
pub enum DiagnosticSeverity {
    #[default]
    Error,
    Warning,
    Information,
    Hint,
}

impl From<u8> for DiagnosticSeverity {
    fn from(value: u8) -> Self {
        match value {
            2 => DiagnosticSeverity::Warning,
            3 => DiagnosticSeverity::Information,
            4 => DiagnosticSeverity::Hint,
            _ => DiagnosticSeverity::Error,
        }
    }
}

impl DiagnosticSeverity {
    /// Human-readable name used in tool payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Information => "info",
            DiagnosticSeverity::Hint => "hint",
        }
    }
}

/// One diagnostic as pushed via `textDocument/publishDiagnostics`.
#[derive(Debug, Clone, Deserialize)]
pub struct Diagnostic {
    pub range: WireRange,
    pub message: String,
    #[serde(default)]
    pub severity: DiagnosticSeverity,
    /// Servers send numbers or strings here, so keep the raw value
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub source: Option<String>,
}

/// `publishDiagnostics` notification parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishDiagnosticsParams {
    pub uri: String,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

/// A `MarkupContent` or object-form `MarkedString`; only the text matters.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkedValue {
    pub value: String,
}

/// One element of a `MarkedString[]` hover payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HoverPart {
    Plain(String),
    Marked(MarkedValue),
}

impl HoverPart {
    fn into_text(self) -> String {
        match self {
            HoverPart::Plain(text) => text,
            HoverPart::Marked(marked) => marked.value,
        }
    }
}

/// Hover `contents` in any of its three wire shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HoverContents {
    Plain(String),
    Marked(MarkedValue),
    Many(Vec<HoverPart>),
}

impl HoverContents {
    /// Flatten to plain text, joining array parts with newlines.
    pub fn flatten(self) -> String {
        match self {
            HoverContents::Plain(text) => text,
            HoverContents::Marked(marked) => marked.value,
            HoverContents::Many(parts) => parts
                .into_iter()
                .map(HoverPart::into_text)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A completion response: either a `CompletionList` or a bare item array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CompletionResponse {
    List {
        #[serde(rename = "isIncomplete", default)]
        is_incomplete: bool,
        items: Vec<Value>,
    },
    Items(Vec<Value>),
}

impl CompletionResponse {
    /// Normalize to `(items, is_incomplete)`.
    pub fn into_parts(self) -> (Vec<Value>, bool) {
        match self {
            CompletionResponse::List {
                is_incomplete,
                items,
            } => (items, is_incomplete),
            CompletionResponse::Items(items) => (items, false),
        }
    }
}

/// Map an LSP `CompletionItemKind` number to its human name.
pub fn completion_kind_name(kind: u64) -> &'static str {
    match kind {
        1 => "Text",
        2 => "Method",
        3 => "Function",
        4 => "Constructor",
        5 => "Field",
        6 => "Variable",
        7 => "Class",
        8 => "Interface",
        9 => "Module",
        10 => "Property",
        11 => "Unit",
        12 => "Value",
        13 => "Enum",
        14 => "Keyword",
        15 => "Snippet",
        16 => "Color",
        17 => "File",
        18 => "Reference",
        19 => "Folder",
        20 => "EnumMember",
        21 => "Constant",
        22 => "Struct",
        23 => "Event",
        24 => "Operator",
        25 => "TypeParameter",
        _ => "Unknown",
    }
}

/// Map an LSP `SymbolKind` number to its human name.
pub fn symbol_kind_name(kind: u64) -> String {
    let name = match kind {
        1 => "file",
        2 => "module",
        3 => "namespace",
        4 => "package",
        5 => "class",
        6 => "method",
        7 => "property",
        8 => "field",
        9 => "constructor",
        10 => "enum",
        11 => "interface",
        12 => "function",
        13 => "variable",
        14 => "constant",
        15 => "string",
        16 => "number",
        17 => "boolean",
        18 => "array",
        19 => "object",
        20 => "key",
        21 => "null",
        22 => "enumMember",
        23 => "struct",
        24 => "event",
        25 => "operator",
        26 => "typeParameter",
        other => return format!("unknown({other})"),
    };
    name.to_string()
}
