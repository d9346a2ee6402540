//! Tool descriptors (spec §3 Tool Descriptor, §4.3 Tool Builder).

use crate::path::Path;
use serde::{Deserialize, Serialize};

/// Presentation hints for a tool, consumed by a UI or an LM tool-picker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// Icon identifier, implementation-defined.
    pub icon: Option<String>,
    /// Display title, falls back to `ToolDescriptor::name` when absent.
    pub title: Option<String>,
    /// Tool key of a logical parent grouping, if any.
    pub parent: Option<String>,
    /// When true, UI-bearing output from this tool should not be rendered.
    #[serde(default)]
    pub hide_ui: bool,
}

/// A callable view of an agent subtree, derived from the node it is
/// attached to.
///
/// `id` is the stable identifier downstream code references by string;
/// `tool_key` is derived purely from `absolute_path` (spec §4.3) and is
/// used as the map key in [`agentAsTool`](crate) style registries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Stable, caller-chosen identifier. Unique within a registry.
    pub id: String,
    /// Human-facing tool name.
    pub name: String,
    /// Description surfaced to an LM tool loop.
    pub description: String,
    /// JSON Schema for the tool's input.
    pub input_schema: serde_json::Value,
    /// JSON Schema for the tool's output, if the agent declares one.
    pub output_schema: Option<serde_json::Value>,
    /// Presentation metadata.
    #[serde(default)]
    pub metadata: ToolMetadata,
    /// Where this tool lives in the route trie.
    pub absolute_path: Path,
    /// Slug derived from `absolute_path` (spec §4.3).
    pub tool_key: String,
}

impl ToolDescriptor {
    /// Build a descriptor for the agent registered at `path`. `tool_key` is
    /// derived automatically; pass a distinct `id` if several descriptors
    /// could otherwise collide.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
        absolute_path: Path,
    ) -> Self {
        let tool_key = absolute_path.tool_key();
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            input_schema,
            output_schema: None,
            metadata: ToolMetadata::default(),
            absolute_path,
            tool_key,
        }
    }

    /// Attach an output schema.
    pub fn with_output_schema(mut self, schema: serde_json::Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Attach presentation metadata.
    pub fn with_metadata(mut self, metadata: ToolMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_key_derives_from_path() {
        let desc = ToolDescriptor::new(
            "sum-tool",
            "sum",
            "adds two numbers",
            serde_json::json!({"type": "object"}),
            Path::new("/math/sum"),
        );
        assert_eq!(desc.tool_key, "math_sum");
    }
}
