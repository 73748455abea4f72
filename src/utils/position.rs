//! Coordinate conversion between user positions (1-based) and wire
//! positions (0-based).
//!
//! Tool inputs and outputs use 1-based line/column numbers; the language
//! server wire protocol counts from zero. Conversion always happens at the
//! tool boundary, never inside the client.

use serde_json::{Value, json};

/// Convert 1-based user coordinates to a 0-based wire position object.
///
/// Inputs below 1 are clamped to the first line/column rather than
/// underflowing.
pub fn to_wire_position(line: u32, column: u32) -> Value {
    json!({
        "line": line.saturating_sub(1),
        "character": column.saturating_sub(1),
    })
}

/// Convert a 0-based wire position back to 1-based (line, column).
pub fn from_wire_position(line: u32, character: u32) -> (u32, u32) {
    (line + 1, character + 1)
}

/// Extract a 1-based (line, column) pair from a wire position object.
///
/// Missing fields default to the first line/column, matching how the rest
/// of the bridge treats partially populated ranges.
pub fn from_wire_position_value(position: &Value) -> (u32, u32) {
    let line = position.get("line").and_then(Value::as_u64).unwrap_or(0) as u32;
    let character = position
        .get("character")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    from_wire_position(line, character)
}
