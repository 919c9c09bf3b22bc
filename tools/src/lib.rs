//! # Tools
//!
//! Function tools the model can call, and a small agent that routes a
//! prompt to one of them.
//!
//! ```text
//! prompt ──► ToolAgent ──► model (tools advertised)
//!                             │
//!                 ┌───────────┴───────────┐
//!             direct answer          tool call
//!                                         │
//!                               ToolRegistry::get ──► Tool::invoke
//!                                         │
//!                               model (tool result) ──► answer
//! ```
//!
//! Built-in tools: `generate_image`, `edit_image`, `get_current_time`.

pub mod agent;
pub mod builtin;
pub mod error;
pub mod registry;
pub mod spec;
pub mod tool;

pub use agent::{DEFAULT_AGENT_MODEL, INVALID_ARGUMENTS, NO_RESPONSE, SYSTEM_PROMPT, ToolAgent};
pub use builtin::{CurrentTimeTool, EditImageTool, GenerateImageTool};
pub use error::{Result, ToolError};
pub use registry::ToolRegistry;
pub use spec::{DataType, ToolDefinition, ToolInput};
pub use tool::{Tool, check_args, string_arg};
