//! Name-indexed tool registry.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{Result, ToolError};
use crate::spec::ToolDefinition;
use crate::tool::Tool;

/// Tools available to an agent, in registration order.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    name_index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Names must be unique.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.name_index.contains_key(&name) {
            return Err(ToolError::AlreadyExists(name));
        }

        debug!("Registered tool: {name}");
        self.name_index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Result<Self> {
        self.register(tool)?;
        Ok(self)
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.name_index
            .get(name)
            .and_then(|&i| self.tools.get(i))
            .cloned()
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> Vec<&ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Definitions in OpenAI function-tool format.
    pub fn openai_tools(&self) -> Vec<Value> {
        self.tools.iter().map(|t| t.definition().to_openai()).collect()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
