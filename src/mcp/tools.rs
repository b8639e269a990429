//! MCP tool catalogue and execution seam.
//!
//! The registry holds the static set of tools advertised by `tools/list`.
//! The actual work behind a `tools/call` is delegated to a [`ToolExecutor`].

use std::collections::HashMap;
use std::fmt::Write as _;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::protocol::{ToolDescriptor, ToolInputSchema};

/// Performs the work behind a tool call.
///
/// Failures the caller should read (permission denied, bad arguments,
/// missing records) are returned as text, not as errors.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Run `tool` with the given arguments and return its text output.
    async fn invoke(&self, tool: &str, arguments: &Map<String, Value>) -> String;
}

/// Tool registry errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A tool with this name is already registered.
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),
}

/// Catalogue of tools, in registration order.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    /// Tool name to position in `tools`
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of descriptors.
    pub fn from_tools(tools: impl IntoIterator<Item = ToolDescriptor>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    /// Register a tool. Names must be unique.
    pub fn register(&mut self, tool: ToolDescriptor) -> Result<(), RegistryError> {
        if self.index.contains_key(&tool.name) {
            return Err(RegistryError::DuplicateTool(tool.name));
        }
        self.index.insert(tool.name.clone(), self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All descriptors, cloned, for a `tools/list` result.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.clone()
    }

    /// Get count of tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Builder for a tool's JSON Schema input description.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: ToolInputSchema,
}

impl SchemaBuilder {
    /// Start an empty object schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property of a primitive type (`string`, `integer`, `boolean`).
    pub fn property(self, name: &str, kind: &str, description: &str) -> Self {
        self.raw(name, json!({ "type": kind, "description": description }))
    }

    /// Add a string property restricted to the given values.
    pub fn one_of(self, name: &str, values: &[&str], description: &str) -> Self {
        self.raw(name, json!({ "type": "string", "enum": values, "description": description }))
    }

    /// Add an array property whose items have the given type.
    pub fn array(self, name: &str, item_kind: &str, description: &str) -> Self {
        self.raw(
            name,
            json!({ "type": "array", "items": { "type": item_kind }, "description": description }),
        )
    }

    /// Add a property with a hand-written schema fragment.
    pub fn raw(mut self, name: &str, schema: Value) -> Self {
        self.schema.properties.insert(name.to_string(), schema);
        self
    }

    /// Mark properties as required.
    pub fn required(mut self, names: &[&str]) -> Self {
        self.schema.required.extend(names.iter().map(|n| (*n).to_string()));
        self
    }

    /// Finish the schema.
    pub fn build(self) -> ToolInputSchema {
        self.schema
    }
}

/// Format a tool for display.
pub fn format_tool(tool: &ToolDescriptor) -> String {
    let mut output = format!("{}\n  {}", tool.name, tool.description);

    let props = &tool.input_schema.properties;
    if !props.is_empty() {
        output.push_str("\n  Parameters:");
        for (name, schema) in props {
            let type_str = schema.get("type").and_then(|v| v.as_str()).unwrap_or("any");
            let desc = schema.get("description").and_then(|v| v.as_str()).unwrap_or("");
            let _ = write!(output, "\n    - {} ({}): {}", name, type_str, desc);
        }
    }

    let required = &tool.input_schema.required;
    if !required.is_empty() {
        let _ = write!(output, "\n  Required: {}", required.join(", "));
    }

    output
}
