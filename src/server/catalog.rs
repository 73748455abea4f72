//! Registered tool descriptors.
//!
//! Each descriptor pairs a tool name with its JSON input schema. Positional
//! tools share the `file`/`line`/`column` trio in 1-based user coordinates.

use serde_json::{Value, json};

/// Schema fragment for the positional `file`/`line`/`column` arguments.
fn positional_properties() -> Value {
    json!({
        "file": {"type": "string", "description": "Absolute path to the Ada file"},
        "line": {"type": "integer", "description": "1-based line number"},
        "column": {"type": "integer", "description": "1-based column number"},
    })
}

fn positional_tool(name: &str, description: &str) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": {
            "type": "object",
            "properties": positional_properties(),
            "required": ["file", "line", "column"],
        },
    })
}

/// All tools the bridge registers with its client.
pub fn tool_descriptors() -> Vec<Value> {
    let mut tools = vec![
        positional_tool(
            "ada_goto_definition",
            "Navigate to the definition of an Ada symbol at a given location",
        ),
        positional_tool(
            "ada_type_definition",
            "Navigate to the type definition of a symbol (find where the type is defined, not just the variable)",
        ),
        positional_tool(
            "ada_implementation",
            "Navigate from a declaration to its implementation/body (e.g., from spec to body)",
        ),
        positional_tool(
            "ada_hover",
            "Get type information and documentation for an Ada symbol",
        ),
        positional_tool(
            "ada_signature_help",
            "Get parameter information for the enclosing subprogram call",
        ),
        positional_tool(
            "ada_call_hierarchy",
            "Show incoming and outgoing calls for the subprogram at a location",
        ),
    ];

    // ada_call_hierarchy additionally takes a direction
    if let Some(hierarchy) = tools.last_mut() {
        hierarchy["inputSchema"]["properties"]["direction"] = json!({
            "type": "string",
            "enum": ["outgoing", "incoming", "both"],
            "description": "Which call direction to report",
            "default": "outgoing",
        });
    }

    tools.extend([
        json!({
            "name": "ada_get_spec",
            "description": "Find the spec (declaration) for a symbol or the spec file for a body",
            "inputSchema": {
                "type": "object",
                "properties": positional_properties(),
                "required": ["file"],
            },
        }),
        json!({
            "name": "ada_find_references",
            "description": "Find all references to an Ada symbol across the project",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "file": {"type": "string", "description": "Absolute path to the Ada file"},
                    "line": {"type": "integer", "description": "1-based line number"},
                    "column": {"type": "integer", "description": "1-based column number"},
                    "include_declaration": {
                        "type": "boolean",
                        "description": "Include the declaration in results",
                        "default": true,
                    },
                },
                "required": ["file", "line", "column"],
            },
        }),
        json!({
            "name": "ada_document_symbols",
            "description": "Get all symbols defined in an Ada file (outline)",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "file": {"type": "string", "description": "Absolute path to the Ada file"},
                },
                "required": ["file"],
            },
        }),
        json!({
            "name": "ada_workspace_symbols",
            "description": "Search for symbols by name across the entire Ada workspace",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Symbol name or pattern to search for"},
                    "kind": {
                        "type": "string",
                        "enum": ["package", "procedure", "function", "type", "variable", "all"],
                        "description": "Filter by symbol kind",
                        "default": "all",
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results",
                        "default": 50,
                    },
                },
                "required": ["query"],
            },
        }),
        json!({
            "name": "ada_diagnostics",
            "description": "Get compiler errors and warnings for Ada files",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "file": {
                        "type": "string",
                        "description": "Absolute path to Ada file, or omit for all files",
                    },
                    "severity": {
                        "type": "string",
                        "enum": ["error", "warning", "hint", "all"],
                        "description": "Filter by severity level",
                        "default": "all",
                    },
                },
                "required": [],
            },
        }),
        json!({
            "name": "ada_completions",
            "description": "Get code completions at a location",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "file": {"type": "string", "description": "Absolute path to the Ada file"},
                    "line": {"type": "integer", "description": "1-based line number"},
                    "column": {"type": "integer", "description": "1-based column number"},
                    "trigger_character": {
                        "type": "string",
                        "description": "Character that triggered completion (e.g. '.')",
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of completions",
                        "default": 50,
                    },
                },
                "required": ["file", "line", "column"],
            },
        }),
        json!({
            "name": "ada_code_actions",
            "description": "List quick fixes and refactorings available over a range",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "file": {"type": "string", "description": "Absolute path to the Ada file"},
                    "start_line": {"type": "integer", "description": "1-based start line"},
                    "start_column": {"type": "integer", "description": "1-based start column"},
                    "end_line": {"type": "integer", "description": "1-based end line (defaults to start_line)"},
                    "end_column": {"type": "integer", "description": "1-based end column (defaults to start_column)"},
                },
                "required": ["file", "start_line", "start_column"],
            },
        }),
        json!({
            "name": "ada_rename_symbol",
            "description": "Rename an Ada symbol across the project",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "file": {"type": "string", "description": "Absolute path to the Ada file"},
                    "line": {"type": "integer", "description": "1-based line number"},
                    "column": {"type": "integer", "description": "1-based column number"},
                    "new_name": {"type": "string", "description": "New name for the symbol"},
                    "preview": {
                        "type": "boolean",
                        "description": "Only report changes without applying them",
                        "default": true,
                    },
                },
                "required": ["file", "line", "column", "new_name"],
            },
        }),
        json!({
            "name": "ada_format_file",
            "description": "Reformat a whole Ada source file",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "file": {"type": "string", "description": "Absolute path to the Ada file"},
                    "tab_size": {"type": "integer", "description": "Indentation width", "default": 3},
                    "insert_spaces": {
                        "type": "boolean",
                        "description": "Use spaces instead of tabs",
                        "default": true,
                    },
                },
                "required": ["file"],
            },
        }),
    ]);

    tools
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_all_operations() {
        let tools = tool_descriptors();
        let names: Vec<&str> = tools
            .iter()
            .map(|tool| tool["name"].as_str().unwrap())
            .collect();

        for expected in [
            "ada_goto_definition",
            "ada_type_definition",
            "ada_implementation",
            "ada_get_spec",
            "ada_hover",
            "ada_find_references",
            "ada_document_symbols",
            "ada_workspace_symbols",
            "ada_diagnostics",
            "ada_call_hierarchy",
            "ada_completions",
            "ada_signature_help",
            "ada_code_actions",
            "ada_rename_symbol",
            "ada_format_file",
        ] {
            assert!(names.contains(&expected), "missing tool {expected}");
        }
        assert_eq!(names.len(), 15);
    }

    #[test]
    fn every_tool_has_schema_and_description() {
        for tool in tool_descriptors() {
            let name = tool["name"].as_str().unwrap();
            assert!(
                tool["description"].as_str().is_some_and(|d| !d.is_empty()),
                "{name} lacks a description"
            );
            assert_eq!(tool["inputSchema"]["type"], "object", "{name} schema");
        }
    }

    #[test]
    fn positional_tools_require_the_coordinate_trio() {
        let tools = tool_descriptors();
        let goto = tools
            .iter()
            .find(|tool| tool["name"] == "ada_goto_definition")
            .unwrap();
        assert_eq!(
            goto["inputSchema"]["required"],
            json!(["file", "line", "column"])
        );
    }

    #[test]
    fn get_spec_requires_only_the_file() {
        let tools = tool_descriptors();
        let spec = tools.iter().find(|tool| tool["name"] == "ada_get_spec").unwrap();
        assert_eq!(spec["inputSchema"]["required"], json!(["file"]));
    }
}
