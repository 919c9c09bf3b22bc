//! The tool trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, ToolError};
use crate::spec::ToolDefinition;

/// A capability the model can call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Interface advertised to the model.
    fn definition(&self) -> &ToolDefinition;

    /// Run with already-parsed JSON arguments, returning text for the model.
    async fn invoke(&self, args: Value) -> Result<String>;

    /// Name the model calls the tool by.
    fn name(&self) -> &str {
        &self.definition().name
    }
}

/// Check `args` against `definition`, mapping failures to [`ToolError::InvalidInput`].
pub fn check_args(definition: &ToolDefinition, args: &Value) -> Result<()> {
    definition
        .validate_inputs(args)
        .map_err(ToolError::InvalidInput)
}

/// Required string argument.
pub fn string_arg<'a>(args: &'a Value, name: &str) -> Result<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidInput(format!("missing string argument: {name}")))
}
