//! Tool declarations advertised to the model service.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Static description of a tool: its name, what it does, and a JSON Schema for
/// its parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDescription {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Names listed under the schema's `required` key.
    pub fn required(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// The catalog matching [`crate::builtin_toolkit`].
pub fn default_catalog() -> Vec<ToolDescription> {
    vec![
        ToolDescription::new(
            "calculate",
            "Execute simple math expressions.",
            json!({
                "type": "object",
                "properties": {
                    "expression": {
                        "type": "string",
                        "description": "The math expression to evaluate (e.g., '2 + 2')."
                    }
                },
                "required": ["expression"]
            }),
        ),
        ToolDescription::new(
            "read_file",
            "Read the contents of a file.",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "The path to the file to read."}
                },
                "required": ["path"]
            }),
        ),
        ToolDescription::new(
            "write_file",
            "Write content to a file.",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "The path to the file to write."},
                    "content": {"type": "string", "description": "The content to write to the file."}
                },
                "required": ["path", "content"]
            }),
        ),
    ]
}
